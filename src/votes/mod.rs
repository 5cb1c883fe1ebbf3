// Votes — up/down votes sites cast on a subject (usually a broadcast URL).
//
// A vote is a record in the voter's own store at /votes/<createdAt>.json.
// Tallying fans out across a set of sites. Each voter counts once per
// subject: only their most recent vote on it is kept, and a 0 vote
// withdraws an earlier one.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::site::records::{append_record, parse_record_name};
use crate::site::Site;

pub const VOTES_DIR: &str = "/votes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub subject: String,
    pub vote: i8,
    pub created_at: i64,
}

/// Totals for one subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoteTally {
    pub up: u32,
    pub down: u32,
    /// up − down
    pub value: i64,
    pub up_voters: Vec<String>,
}

/// Cast (or with 0, withdraw) `site`'s vote on `subject`. Returns the URL
/// of the vote record.
pub async fn vote(site: &Site, subject: &str, value: i8) -> Result<String> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(StoreError::Validation("a vote needs a subject".to_string()).into());
    }
    if !(-1..=1).contains(&value) {
        return Err(StoreError::Validation(format!("vote must be -1, 0 or 1, got {value}")).into());
    }

    let (url, _) = append_record(site, VOTES_DIR, |ts| Vote {
        subject: subject.to_string(),
        vote: value,
        created_at: ts,
    })
    .await?;
    info!(site = %site.url(), subject, value, "Vote recorded");
    Ok(url)
}

/// Tally the votes `sites` have cast on `subject`. Sites that can't be read
/// are left out of the count.
pub async fn count_votes(
    sites: &[Arc<Site>],
    subject: &str,
    timeout: Option<Duration>,
) -> VoteTally {
    let subject = subject.trim();
    let latest = join_all(
        sites
            .iter()
            .map(|site| latest_vote(site, subject, timeout)),
    )
    .await;

    let mut tally = VoteTally::default();
    let mut counted: HashSet<&str> = HashSet::new();
    for (site, vote) in sites.iter().zip(latest) {
        // The same site listed twice still votes once.
        if !counted.insert(site.url()) {
            continue;
        }
        match vote {
            Some(1) => {
                tally.up += 1;
                tally.value += 1;
                tally.up_voters.push(site.url().to_string());
            }
            Some(-1) => {
                tally.down += 1;
                tally.value -= 1;
            }
            _ => {}
        }
    }
    tally
}

/// The value of `site`'s most recent vote on `subject`, if any.
async fn latest_vote(site: &Site, subject: &str, timeout: Option<Duration>) -> Option<i8> {
    let handle = site.handle();
    let names = match handle.readdir(VOTES_DIR, timeout).await {
        Ok(names) => names,
        Err(StoreError::NotFound(_)) => return None,
        Err(e) => {
            warn!(site = %site.url(), error = %e, "Failed to list votes, skipping site");
            return None;
        }
    };

    let paths: Vec<String> = names
        .iter()
        .filter(|name| parse_record_name(name).is_some())
        .map(|name| format!("{VOTES_DIR}/{name}"))
        .collect();

    let reads = join_all(
        paths
            .iter()
            .map(|path| async move { (path, handle.read_file(path, timeout).await) }),
    )
    .await;

    // An unreadable file may hold the voter's newest vote, so counting the
    // rest could resurrect one they already replaced.
    let mut votes = Vec::with_capacity(reads.len());
    for (path, read) in reads {
        match read {
            Ok(bytes) => match serde_json::from_slice::<Vote>(&bytes) {
                Ok(vote) => votes.push(vote),
                Err(e) => {
                    debug!(site = %site.url(), path = %path, error = %e, "Skipping malformed vote");
                }
            },
            Err(e) => {
                warn!(site = %site.url(), path = %path, error = %e, "Failed to read vote, leaving voter out");
                return None;
            }
        }
    }

    votes
        .into_iter()
        .filter(|v| v.subject == subject)
        .max_by_key(|v| v.created_at)
        .map(|v| v.vote)
}
