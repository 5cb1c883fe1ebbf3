// Nexus: social feed aggregation across independently replicated sites.
//
// This is the library root. Each module corresponds to a layer of the
// aggregator, leaf first: stores, sites (handle + cache + registry), the
// follow graph, feeds, votes, and the terminal-facing pieces.

pub mod config;
pub mod error;
pub mod feed;
pub mod output;
pub mod site;
pub mod social;
pub mod status;
pub mod store;
pub mod votes;
