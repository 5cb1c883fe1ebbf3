// Site status display — profile summary, follow count, broadcast count.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::error::StoreError;
use crate::feed::models::BROADCASTS_DIR;
use crate::site::cache::ReadOptions;
use crate::site::records::parse_record_name;
use crate::site::Site;
use crate::votes::VOTES_DIR;

/// Counts shown by `nexus status`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteStatus {
    pub name: Option<String>,
    pub follows: usize,
    pub broadcasts: usize,
    pub votes: usize,
}

/// Gather the status of the user's own site.
pub async fn collect(site: &Arc<Site>, timeout: Option<Duration>) -> Result<SiteStatus> {
    let profile = site.get_profile(ReadOptions::fresh(timeout)).await?;
    Ok(SiteStatus {
        name: profile.name,
        follows: profile.follows.len(),
        broadcasts: count_records(site, BROADCASTS_DIR, timeout).await?,
        votes: count_records(site, VOTES_DIR, timeout).await?,
    })
}

/// Display system status to the terminal.
pub async fn show(site: &Arc<Site>, data_dir: &str, timeout: Option<Duration>) -> Result<()> {
    let status = collect(site, timeout).await?;

    println!("Site: {}", site.url());
    println!("Data directory: {}", data_dir);
    match status.name {
        Some(name) => println!("Profile: {}", name),
        None => {
            println!("Profile: not set");
            println!("  Run `nexus set-profile --name <name>` to set it");
        }
    }
    println!("Following: {} sites", status.follows);
    if status.broadcasts == 0 {
        println!("Broadcasts: none yet");
        println!("  Run `nexus post <text>` to publish one");
    } else {
        println!("Broadcasts: {}", status.broadcasts);
    }
    println!("Votes cast: {}", status.votes);

    Ok(())
}

async fn count_records(site: &Site, dir: &str, timeout: Option<Duration>) -> Result<usize> {
    match site.handle().readdir(dir, timeout).await {
        Ok(names) => Ok(names
            .iter()
            .filter(|name| parse_record_name(name).is_some())
            .count()),
        Err(StoreError::NotFound(_)) => Ok(0),
        Err(e) => Err(e.into()),
    }
}
