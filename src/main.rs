use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use nexus::config::Config;
use nexus::feed::{self, FeedQuery, NewBroadcast};
use nexus::output::terminal;
use nexus::site::cache::ReadOptions;
use nexus::site::models::ProfileUpdate;
use nexus::site::url::normalize_url;
use nexus::site::{Site, SiteRegistry};
use nexus::social::follows;
use nexus::store::local::LocalOpener;
use nexus::votes;

/// Nexus: a social feed over independently replicated personal sites.
///
/// Your site holds your profile, the sites you follow, and your broadcasts.
/// Feeds are assembled by reading every followed site directly.
#[derive(Parser)]
#[command(name = "nexus", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create your site and (optionally) name it
    Init {
        /// URL of the new site (e.g. dat://alice)
        url: String,

        /// Display name for the profile
        #[arg(long)]
        name: Option<String>,
    },

    /// Show a profile (yours by default)
    Profile {
        /// Site to show instead of your own
        url: Option<String>,
    },

    /// Update fields of your profile
    SetProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },

    /// Follow a site
    Follow {
        url: String,

        /// Name to remember the site by
        #[arg(long)]
        name: Option<String>,
    },

    /// Stop following a site
    Unfollow { url: String },

    /// List the sites you follow, with their current profiles
    Following,

    /// List the sites you follow that follow you back
    Friends,

    /// Check whether you and a site follow each other
    IsFriend { url: String },

    /// Publish a broadcast
    Post {
        /// Text of the broadcast
        text: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        video: Option<String>,
        #[arg(long)]
        audio: Option<String>,
        /// URL of the first post in the thread being replied to
        #[arg(long)]
        thread_root: Option<String>,
        /// URL of the post being replied to
        #[arg(long)]
        thread_parent: Option<String>,
    },

    /// Your home feed: your broadcasts plus everyone you follow
    Feed {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Broadcasts of a single site (yours by default)
    Broadcasts {
        url: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Vote on a subject: 1 (up), -1 (down) or 0 (withdraw)
    Vote {
        subject: String,
        #[arg(allow_hyphen_values = true)]
        value: i8,
    },

    /// Tally votes on a subject from you and everyone you follow
    Votes { subject: String },

    /// Show the status of your site
    Status,
}

#[derive(Args)]
struct PageArgs {
    /// Only broadcasts strictly after this timestamp (ms)
    #[arg(long)]
    after: Option<i64>,

    /// Only broadcasts strictly before this timestamp (ms)
    #[arg(long)]
    before: Option<i64>,

    /// Page size (default: NEXUS_FEED_LIMIT or 20)
    #[arg(long)]
    limit: Option<usize>,

    /// Entries to skip
    #[arg(long, default_value = "0")]
    offset: usize,

    /// Oldest first instead of newest first
    #[arg(long)]
    oldest_first: bool,

    /// List entries without fetching their contents
    #[arg(long)]
    meta_only: bool,

    /// Only broadcasts of this @type
    #[arg(long = "type")]
    kind: Option<String>,
}

impl PageArgs {
    fn query(self, config: &Config) -> FeedQuery {
        FeedQuery {
            after: self.after,
            before: self.before,
            limit: self.limit.unwrap_or(config.feed_limit),
            offset: self.offset,
            reverse: !self.oldest_first,
            meta_only: self.meta_only,
            kind: self.kind,
            timeout: config.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nexus=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let registry = SiteRegistry::new(Arc::new(LocalOpener::new(&config.data_dir)), config.timeout);

    match cli.command {
        Commands::Init { url, name } => {
            info!(url = %url, "Initializing site");
            let site = registry.site(&url)?;
            let profile = site
                .set_profile(ProfileUpdate {
                    name,
                    ..Default::default()
                })
                .await?;
            println!("Site ready: {}", site.url());
            println!("Stored under: {}", config.data_dir.display());
            terminal::display_profile(site.url(), &profile);
            println!("\nAdd this to your .env file:");
            println!("  NEXUS_SITE_URL={}", site.url());
        }

        Commands::Profile { url } => {
            let site = match url {
                Some(url) => registry.site(&url)?,
                None => my_site(&config, &registry)?,
            };
            let profile = site
                .get_profile(ReadOptions::fresh(config.timeout))
                .await?;
            terminal::display_profile(site.url(), &profile);
        }

        Commands::SetProfile { name, bio, avatar } => {
            let site = my_site(&config, &registry)?;
            let profile = site
                .set_profile(ProfileUpdate {
                    name,
                    bio,
                    avatar,
                    follows: None,
                })
                .await?;
            terminal::display_profile(site.url(), &profile);
        }

        Commands::Follow { url, name } => {
            let site = my_site(&config, &registry)?;
            follows::follow(&site, &url, name.as_deref()).await?;
            println!("Following {}", normalize_url(&url)?.bold());
        }

        Commands::Unfollow { url } => {
            let site = my_site(&config, &registry)?;
            follows::unfollow(&site, &url).await?;
            println!("No longer following {}", url.bold());
        }

        Commands::Following => {
            let site = my_site(&config, &registry)?;
            let following = follows::list_following(&registry, &site, config.timeout).await?;
            terminal::display_sites("Following", &following);
        }

        Commands::Friends => {
            let site = my_site(&config, &registry)?;
            let friends = follows::list_friends(&registry, &site, config.timeout).await?;
            terminal::display_sites("Friends", &friends);
        }

        Commands::IsFriend { url } => {
            let site = my_site(&config, &registry)?;
            if follows::is_friends_with(&registry, &site, &url, config.timeout).await? {
                println!("{} and you follow each other.", url.bold());
            } else if follows::is_following(&site, &url).await? {
                println!("You follow {}, but it doesn't follow you back.", url.bold());
            } else {
                println!("You don't follow {}.", url.bold());
            }
        }

        Commands::Post {
            text,
            image,
            video,
            audio,
            thread_root,
            thread_parent,
        } => {
            let site = my_site(&config, &registry)?;
            let url = feed::broadcast(
                &site,
                NewBroadcast {
                    text,
                    image,
                    video,
                    audio,
                    thread_root,
                    thread_parent,
                },
            )
            .await?;
            println!("Published {}", url.bold());
        }

        Commands::Feed { page } => {
            let site = my_site(&config, &registry)?;
            let entries = feed::home_feed(&registry, &site, &page.query(&config)).await;
            terminal::display_feed(&entries);
        }

        Commands::Broadcasts { url, page } => {
            let site = match url {
                Some(url) => registry.site(&url)?,
                None => my_site(&config, &registry)?,
            };
            let entries = feed::list_broadcasts(&site, &page.query(&config)).await;
            terminal::display_feed(&entries);
        }

        Commands::Vote { subject, value } => {
            let site = my_site(&config, &registry)?;
            let url = votes::vote(&site, &subject, value).await?;
            println!("Vote recorded at {}", url.dimmed());
        }

        Commands::Votes { subject } => {
            let site = my_site(&config, &registry)?;
            let profile = site
                .get_profile(ReadOptions::default())
                .await?;
            let mut voters = vec![site.clone()];
            voters.extend(registry.resolve(&profile.follows));
            let tally = votes::count_votes(&voters, &subject, config.timeout).await;
            terminal::display_tally(&subject, &tally);
        }

        Commands::Status => {
            let site = my_site(&config, &registry)?;
            nexus::status::show(&site, &config.data_dir.display().to_string(), config.timeout)
                .await?;
        }
    }

    Ok(())
}

/// The user's own site, as configured by NEXUS_SITE_URL.
fn my_site(config: &Config, registry: &SiteRegistry) -> Result<Arc<Site>> {
    config.require_site()?;
    registry.site(&config.site_url)
}
