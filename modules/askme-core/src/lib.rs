pub mod feed;
pub mod posts;
pub mod tags;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod time_format;
pub mod traits;

pub use feed::{FeedQuery, FeedRanker, UserSignals};
pub use posts::PostService;
pub use tags::TagResolver;
