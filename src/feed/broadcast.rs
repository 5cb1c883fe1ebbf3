// Broadcast writer — append a new post to a site's own store.

use anyhow::Result;
use tracing::info;

use super::models::{Broadcast, BROADCASTS_DIR};
use crate::error::StoreError;
use crate::site::records::append_record;
use crate::site::Site;

const SCHEMA_CONTEXT: &str = "http://schema.org";
const BROADCAST_TYPE: &str = "Comment";

/// Fields of a new broadcast. At least one of text, image, video or audio
/// must be present.
#[derive(Debug, Clone, Default)]
pub struct NewBroadcast {
    pub text: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub audio: Option<String>,
    /// First post of the thread this one replies into.
    pub thread_root: Option<String>,
    /// The post this one replies to directly.
    pub thread_parent: Option<String>,
}

impl NewBroadcast {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), StoreError> {
        let has_content = [&self.text, &self.image, &self.video, &self.audio]
            .into_iter()
            .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()));
        if !has_content {
            return Err(StoreError::Validation(
                "a broadcast needs text, an image, a video or audio".to_string(),
            ));
        }
        Ok(())
    }

    fn into_document(self, created_at: i64) -> Broadcast {
        Broadcast {
            context: Some(SCHEMA_CONTEXT.to_string()),
            kind: Some(BROADCAST_TYPE.to_string()),
            text: non_blank(self.text),
            image: non_blank(self.image),
            video: non_blank(self.video),
            audio: non_blank(self.audio),
            thread_root: non_blank(self.thread_root),
            thread_parent: non_blank(self.thread_parent),
            created_at: Some(created_at),
        }
    }
}

/// Write a new broadcast to `site` and return its URL.
pub async fn broadcast(site: &Site, post: NewBroadcast) -> Result<String> {
    post.validate()?;
    let (url, ts) = append_record(site, BROADCASTS_DIR, |ts| post.into_document(ts)).await?;
    info!(site = %site.url(), ts, "Broadcast published");
    Ok(url)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
