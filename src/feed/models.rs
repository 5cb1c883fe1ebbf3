// Feed types — queries, broadcast documents and feed entries.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::site::models::Profile;
use crate::site::Site;

/// Page size used when a query doesn't set one.
pub const DEFAULT_FEED_LIMIT: usize = 20;

/// Where each site keeps its broadcasts.
pub const BROADCASTS_DIR: &str = "/broadcasts";

/// Pagination and filtering for a feed read.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    /// Exclusive lower bound on the timestamp.
    pub after: Option<i64>,
    /// Exclusive upper bound on the timestamp.
    pub before: Option<i64>,
    pub limit: usize,
    /// Entries to skip after sorting, before `limit` applies.
    pub offset: usize,
    /// Newest first.
    pub reverse: bool,
    /// Stop after listing; don't fetch broadcast contents.
    pub meta_only: bool,
    /// Keep only broadcasts whose `@type` matches (case-insensitive).
    /// Applied after pagination, so a page can come back short.
    pub kind: Option<String>,
    /// Budget for each individual store call.
    pub timeout: Option<Duration>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            after: None,
            before: None,
            limit: DEFAULT_FEED_LIMIT,
            offset: 0,
            reverse: false,
            meta_only: false,
            kind: None,
            timeout: None,
        }
    }
}

impl FeedQuery {
    /// Both bounds are exclusive.
    pub fn in_range(&self, ts: i64) -> bool {
        self.after.is_none_or(|after| ts > after) && self.before.is_none_or(|before| ts < before)
    }

    pub fn effective_limit(&self) -> usize {
        if self.limit == 0 {
            DEFAULT_FEED_LIMIT
        } else {
            self.limit
        }
    }
}

/// A post as stored in `/broadcasts/<createdAt>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// One broadcast in a feed.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    /// File name within the broadcasts directory.
    pub name: String,
    pub timestamp: i64,
    pub site: Arc<Site>,
    pub site_profile: Profile,
    pub url: String,
    /// `None` for meta-only reads and for entries that failed to load.
    pub content: Option<Broadcast>,
    /// Why the content is missing, when it failed to load.
    pub error: Option<String>,
}

impl FeedEntry {
    pub fn path(&self) -> String {
        format!("{BROADCASTS_DIR}/{}", self.name)
    }

    pub fn author_name(&self) -> &str {
        self.site_profile.name.as_deref().unwrap_or(self.site.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_exclusive() {
        let query = FeedQuery {
            after: Some(1000),
            before: Some(2000),
            ..Default::default()
        };
        assert!(!query.in_range(1000));
        assert!(query.in_range(1001));
        assert!(query.in_range(1999));
        assert!(!query.in_range(2000));
        assert!(FeedQuery::default().in_range(0));
    }

    #[test]
    fn zero_limit_falls_back_to_default() {
        let query = FeedQuery {
            limit: 0,
            ..Default::default()
        };
        assert_eq!(query.effective_limit(), DEFAULT_FEED_LIMIT);
    }

    #[test]
    fn broadcast_uses_schema_field_names() {
        let post = Broadcast {
            context: Some("http://schema.org".into()),
            kind: Some("Comment".into()),
            text: Some("hi".into()),
            thread_root: Some("dat://bob/broadcasts/1.json".into()),
            created_at: Some(42),
            ..Default::default()
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["@type"], "Comment");
        assert_eq!(json["threadRoot"], "dat://bob/broadcasts/1.json");
        assert_eq!(json["createdAt"], 42);
        assert!(json.get("image").is_none());
    }
}
