// Feeds — reading broadcasts across sites and writing new ones.
//
// aggregate.rs merges many sites' broadcasts into one sorted page;
// broadcast.rs appends a post to a site's own store.

pub mod aggregate;
pub mod broadcast;
pub mod models;

pub use aggregate::{get_broadcast, home_feed, list_broadcasts, list_feed};
pub use broadcast::{broadcast, NewBroadcast};
pub use models::{Broadcast, FeedEntry, FeedQuery, DEFAULT_FEED_LIMIT};
