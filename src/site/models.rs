// Profile document — the one file every site publishes about itself.
//
// Stored as JSON at /profile.json. Fields the crate doesn't know about are
// kept in `extra` so a read-modify-write never drops another client's data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::url::normalize_url;

/// Well-known location of a site's profile.
pub const PROFILE_PATH: &str = "/profile.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Followed sites, in the order they were followed.
    #[serde(default)]
    pub follows: Vec<Follow>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A follow edge, recorded in the follower's own profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Follow {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
        }
    }

    pub fn named(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: Some(name.into()),
        }
    }
}

/// Fields to overwrite in a profile. `None` leaves the field as it was.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub follows: Option<Vec<Follow>>,
}

impl Profile {
    /// Index of the follow entry pointing at the same site as `url`.
    pub fn follow_index(&self, url: &str) -> Option<usize> {
        let target = normalize_url(url).ok()?;
        self.follows
            .iter()
            .position(|f| normalize_url(&f.url).is_ok_and(|u| u == target))
    }

    pub fn follows_site(&self, url: &str) -> bool {
        self.follow_index(url).is_some()
    }

    /// Apply an update in place. A replacement follow list is deduplicated
    /// by site, keeping the first entry for each.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = Some(name);
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }
        if let Some(avatar) = update.avatar {
            self.avatar = Some(avatar);
        }
        if let Some(follows) = update.follows {
            self.follows = dedup_follows(follows);
        }
    }
}

fn dedup_follows(follows: Vec<Follow>) -> Vec<Follow> {
    let mut seen = std::collections::HashSet::new();
    follows
        .into_iter()
        .filter(|f| match normalize_url(&f.url) {
            Ok(origin) => seen.insert(origin),
            // Keep entries we can't interpret rather than silently losing them.
            Err(_) => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_parses_to_default() {
        let profile: Profile = serde_json::from_str("{}").unwrap();
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let json = r#"{"name":"Alice","theme":"dark","follows":[{"url":"dat://bob"}]}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["theme"], "dark");
        assert_eq!(back["follows"][0]["url"], "dat://bob");
    }

    #[test]
    fn follow_lookup_is_by_site() {
        let profile = Profile {
            follows: vec![Follow::new("dat://bob/"), Follow::new("dat://carla")],
            ..Default::default()
        };
        assert_eq!(profile.follow_index("dat://carla/profile.json"), Some(1));
        assert!(profile.follows_site("dat://bob"));
        assert!(!profile.follows_site("dat://dave"));
    }

    #[test]
    fn replacement_follows_are_deduplicated() {
        let mut profile = Profile::default();
        profile.apply(ProfileUpdate {
            name: Some("Alice".into()),
            follows: Some(vec![
                Follow::named("dat://bob", "Bob"),
                Follow::new("dat://bob/other"),
                Follow::new("dat://carla"),
            ]),
            ..Default::default()
        });
        assert_eq!(profile.name.as_deref(), Some("Alice"));
        assert_eq!(profile.follows.len(), 2);
        assert_eq!(profile.follows[0].name.as_deref(), Some("Bob"));
    }
}
