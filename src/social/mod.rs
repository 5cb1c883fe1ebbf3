// Social graph — follow edges between sites and the friends derived from them.

pub mod follows;

pub use follows::{FetchStatus, FollowedSite};
