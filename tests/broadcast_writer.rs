// Broadcast writer tests — record naming, ordering and validation.

use std::sync::Arc;
use std::time::Duration;

use nexus::feed::{broadcast, get_broadcast, list_broadcasts, FeedQuery, NewBroadcast};
use nexus::site::SiteRegistry;
use nexus::store::memory::MemoryOpener;

const ME: &str = "dat://me";

fn setup() -> (Arc<MemoryOpener>, SiteRegistry) {
    let opener = Arc::new(MemoryOpener::new());
    let registry = SiteRegistry::new(opener.clone(), Some(Duration::from_secs(2)));
    (opener, registry)
}

#[tokio::test]
async fn back_to_back_broadcasts_get_distinct_names() {
    let (_opener, registry) = setup();
    let me = registry.site(ME).unwrap();

    // Push the counter past the wall clock so both posts land on the
    // "same millisecond" path.
    let primed = me.clock().next_after(i64::MAX / 2);

    let first = broadcast(&me, NewBroadcast::text("one")).await.unwrap();
    let second = broadcast(&me, NewBroadcast::text("two")).await.unwrap();
    assert_eq!(first, format!("{ME}/broadcasts/{}.json", primed + 1));
    assert_eq!(second, format!("{ME}/broadcasts/{}.json", primed + 2));
}

#[tokio::test]
async fn broadcasts_list_in_publish_order() {
    let (_opener, registry) = setup();
    let me = registry.site(ME).unwrap();

    for text in ["first", "second", "third"] {
        broadcast(&me, NewBroadcast::text(text)).await.unwrap();
    }

    let feed = list_broadcasts(&me, &FeedQuery::default()).await;
    let texts: Vec<&str> = feed
        .iter()
        .map(|e| e.content.as_ref().unwrap().text.as_deref().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
    assert!(feed.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[tokio::test]
async fn stored_document_carries_its_timestamp() {
    let (_opener, registry) = setup();
    let me = registry.site(ME).unwrap();

    let url = broadcast(
        &me,
        NewBroadcast {
            text: Some("nice".into()),
            thread_root: Some("dat://bob/broadcasts/1.json".into()),
            thread_parent: Some("dat://bob/broadcasts/1.json".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let entry = get_broadcast(&me, &url, None).await.unwrap();
    let content = entry.content.unwrap();
    assert_eq!(content.created_at, Some(entry.timestamp));
    assert_eq!(content.kind.as_deref(), Some("Comment"));
    assert_eq!(content.context.as_deref(), Some("http://schema.org"));
    assert_eq!(content.thread_root.as_deref(), Some("dat://bob/broadcasts/1.json"));
}

#[tokio::test]
async fn each_broadcast_is_committed() {
    let (opener, registry) = setup();
    let me = registry.site(ME).unwrap();
    let archive = opener.archive(ME).unwrap();
    let before = archive.version();

    broadcast(&me, NewBroadcast::text("hello")).await.unwrap();
    assert_eq!(archive.version(), before + 1);
}

#[tokio::test]
async fn invalid_broadcast_writes_nothing() {
    let (opener, registry) = setup();
    let me = registry.site(ME).unwrap();
    let archive = opener.archive(ME).unwrap();

    assert!(broadcast(&me, NewBroadcast::text("  ")).await.is_err());
    assert_eq!(archive.version(), 0);
    assert!(list_broadcasts(&me, &FeedQuery::default()).await.is_empty());
}

#[tokio::test]
async fn unwritable_store_reports_an_error() {
    let (opener, registry) = setup();
    let me = registry.site(ME).unwrap();
    opener.archive(ME).unwrap().set_offline(true);

    assert!(broadcast(&me, NewBroadcast::text("lost")).await.is_err());
}
