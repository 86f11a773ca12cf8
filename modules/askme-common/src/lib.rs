pub mod config;
pub mod error;
pub mod tag_key;
pub mod types;

pub use config::Config;
pub use error::AskmeError;
pub use tag_key::{to_tag_key, to_tag_label};
pub use types::*;
