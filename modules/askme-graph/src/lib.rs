pub mod client;
pub mod error;
pub mod feed;
pub mod migrate;
pub mod posts;
pub mod tags;
#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use error::StoreError;
pub use feed::FeedGraph;
pub use neo4rs::query;
pub use posts::PostGraph;
pub use tags::TagGraph;
