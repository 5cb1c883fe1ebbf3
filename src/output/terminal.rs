// Colored terminal output for profiles, follow lists, feeds and votes.
//
// main.rs delegates all display work here.

use chrono::{TimeZone, Utc};
use colored::Colorize;

use super::truncate_chars;
use crate::feed::FeedEntry;
use crate::site::models::Profile;
use crate::social::{FetchStatus, FollowedSite};
use crate::votes::VoteTally;

/// Display a site's profile.
pub fn display_profile(url: &str, profile: &Profile) {
    let name = profile.name.as_deref().unwrap_or("(no name)");
    println!("{}  {}", name.bold(), url.dimmed());
    if let Some(bio) = &profile.bio {
        println!("  {bio}");
    }
    if let Some(avatar) = &profile.avatar {
        println!("  {} {}", "avatar:".dimmed(), avatar);
    }
    println!("  {} {}", "following:".dimmed(), profile.follows.len());
    for follow in &profile.follows {
        match &follow.name {
            Some(name) => println!("    {} {}", name, follow.url.dimmed()),
            None => println!("    {}", follow.url),
        }
    }
}

/// Display followed sites (or friends) with their fetch status.
pub fn display_sites(title: &str, sites: &[FollowedSite]) {
    println!("\n{}", format!("=== {} ({}) ===", title, sites.len()).bold());
    if sites.is_empty() {
        println!("  (none)");
        return;
    }
    for followed in sites {
        let name = followed.profile.name.as_deref().unwrap_or("?");
        let status = match followed.status {
            FetchStatus::Downloaded => "".normal(),
            FetchStatus::TimedOut => " [timed out]".yellow(),
            FetchStatus::Failed => " [unreachable]".red(),
        };
        println!("  {:<24} {}{}", name, followed.url().dimmed(), status);
    }
}

/// Display a page of feed entries.
pub fn display_feed(entries: &[FeedEntry]) {
    if entries.is_empty() {
        println!("No broadcasts yet. Post one with `nexus post <text>`.");
        return;
    }

    for entry in entries {
        println!(
            "{}  {}",
            entry.author_name().bold(),
            format_timestamp(entry.timestamp).dimmed()
        );
        match (&entry.content, &entry.error) {
            (Some(content), _) => {
                if let Some(text) = &content.text {
                    println!("  {}", truncate_chars(text, 280));
                }
                for (label, value) in [
                    ("image", &content.image),
                    ("video", &content.video),
                    ("audio", &content.audio),
                ] {
                    if let Some(value) = value {
                        println!("  {} {}", format!("[{label}]").cyan(), value);
                    }
                }
                if let Some(parent) = &content.thread_parent {
                    println!("  {} {}", "in reply to".dimmed(), parent.dimmed());
                }
            }
            (None, Some(error)) => println!("  {} {}", "unavailable:".red(), error),
            (None, None) => {}
        }
        println!("  {}", entry.url.dimmed());
        println!();
    }
}

/// Display a vote tally.
pub fn display_tally(subject: &str, tally: &VoteTally) {
    println!("{}", subject.bold());
    println!(
        "  {} {}   {} {}   {} {}",
        "up".green(),
        tally.up,
        "down".red(),
        tally.down,
        "score".dimmed(),
        tally.value
    );
    for voter in &tally.up_voters {
        println!("    + {}", voter.dimmed());
    }
}

/// Render a millisecond timestamp as UTC, falling back to the raw number.
pub fn format_timestamp(ts: i64) -> String {
    match Utc.timestamp_millis_opt(ts).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => ts.to_string(),
    }
}
