// Vote tests — casting, withdrawing and tallying across sites.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nexus::error::StoreError;
use nexus::site::{SiteRegistry, SiteSource};
use nexus::store::memory::{MemoryArchive, MemoryOpener};
use nexus::store::{Archive, EntryStat};
use nexus::votes::{count_votes, vote, VoteTally};

const POST: &str = "dat://alice/broadcasts/1500.json";

fn setup() -> (Arc<MemoryOpener>, SiteRegistry) {
    let opener = Arc::new(MemoryOpener::new());
    let registry = SiteRegistry::new(opener.clone(), Some(Duration::from_secs(2)));
    (opener, registry)
}

#[tokio::test]
async fn tally_counts_each_voter_once() {
    let (_opener, registry) = setup();
    let alice = registry.site("dat://alice").unwrap();
    let bob = registry.site("dat://bob").unwrap();
    let carla = registry.site("dat://carla").unwrap();

    vote(&alice, POST, 1).await.unwrap();
    vote(&bob, POST, 1).await.unwrap();
    vote(&carla, POST, -1).await.unwrap();
    vote(&carla, "dat://bob/broadcasts/9.json", 1).await.unwrap();

    let tally = count_votes(&[alice, bob, carla], POST, None).await;
    assert_eq!(
        tally,
        VoteTally {
            up: 2,
            down: 1,
            value: 1,
            up_voters: vec!["dat://alice".to_string(), "dat://bob".to_string()],
        }
    );
}

#[tokio::test]
async fn latest_vote_wins() {
    let (_opener, registry) = setup();
    let bob = registry.site("dat://bob").unwrap();

    vote(&bob, POST, 1).await.unwrap();
    vote(&bob, POST, -1).await.unwrap();
    let tally = count_votes(&[bob.clone()], POST, None).await;
    assert_eq!((tally.up, tally.down, tally.value), (0, 1, -1));

    vote(&bob, POST, 0).await.unwrap();
    let tally = count_votes(&[bob], POST, None).await;
    assert_eq!(tally, VoteTally::default());
}

#[tokio::test]
async fn duplicate_sites_vote_once() {
    let (_opener, registry) = setup();
    let bob = registry.site("dat://bob").unwrap();
    vote(&bob, POST, 1).await.unwrap();

    let tally = count_votes(&[bob.clone(), bob], POST, None).await;
    assert_eq!(tally.up, 1);
}

#[tokio::test]
async fn unreadable_voters_are_left_out() {
    let (opener, registry) = setup();
    let alice = registry.site("dat://alice").unwrap();
    let bob = registry.site("dat://bob").unwrap();
    let silent = registry.site("dat://silent").unwrap();
    vote(&alice, POST, 1).await.unwrap();
    vote(&bob, POST, 1).await.unwrap();
    opener.archive("dat://bob").unwrap().set_offline(true);

    let tally = count_votes(&[alice, bob, silent], POST, None).await;
    assert_eq!(tally.up, 1);
    assert_eq!(tally.up_voters, vec!["dat://alice".to_string()]);
}

#[tokio::test]
async fn malformed_vote_records_are_skipped() {
    let (opener, registry) = setup();
    let archive = opener.archive("dat://bob").unwrap();
    archive.insert_file("/votes/1.json", format!(r#"{{"subject":"{POST}","vote":1,"createdAt":1}}"#));
    archive.insert_file("/votes/2.json", "garbage");
    let bob = registry.site("dat://bob").unwrap();

    let tally = count_votes(&[bob], POST, None).await;
    assert_eq!(tally.up, 1);
}

#[tokio::test]
async fn out_of_range_votes_are_rejected() {
    let (opener, registry) = setup();
    let bob = registry.site("dat://bob").unwrap();

    assert!(vote(&bob, POST, 2).await.is_err());
    assert!(vote(&bob, POST, -2).await.is_err());
    assert!(vote(&bob, "  ", 1).await.is_err());
    assert_eq!(opener.archive("dat://bob").unwrap().version(), 0);
}

/// A store where one file can't be read.
struct UnreadableFile {
    inner: MemoryArchive,
    path: &'static str,
}

#[async_trait]
impl Archive for UnreadableFile {
    fn url(&self) -> &str {
        self.inner.url()
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        if path == self.path {
            return Err(StoreError::Io(format!("{path}: checksum mismatch")));
        }
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        self.inner.write_file(path, data).await
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.inner.readdir(path).await
    }

    async fn stat(&self, path: &str) -> Result<EntryStat, StoreError> {
        self.inner.stat(path).await
    }

    async fn mkdir(&self, path: &str) -> Result<(), StoreError> {
        self.inner.mkdir(path).await
    }

    async fn commit(&self) -> Result<(), StoreError> {
        self.inner.commit().await
    }
}

#[tokio::test]
async fn voter_with_an_unreadable_vote_is_left_out() {
    let (_opener, registry) = setup();
    let inner = MemoryArchive::new("dat://bob");
    inner.insert_file("/votes/1.json", format!(r#"{{"subject":"{POST}","vote":1,"createdAt":1}}"#));
    // Bob's newer downvote exists but can't be read.
    inner.insert_file("/votes/2.json", format!(r#"{{"subject":"{POST}","vote":-1,"createdAt":2}}"#));
    let bob = registry
        .open(SiteSource::Archive(Arc::new(UnreadableFile {
            inner,
            path: "/votes/2.json",
        })))
        .unwrap();
    let alice = registry.site("dat://alice").unwrap();
    vote(&alice, POST, 1).await.unwrap();

    let tally = count_votes(&[alice, bob], POST, None).await;
    assert_eq!(tally.up, 1);
    assert_eq!(tally.down, 0);
    assert_eq!(tally.up_voters, vec!["dat://alice".to_string()]);
}
