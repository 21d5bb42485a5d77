pub mod config;
pub mod error;

pub use config::ConfabConfig;
pub use error::{ConfabError, Result};
