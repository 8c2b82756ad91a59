pub mod config;
pub mod error;
pub mod heuristics;
pub mod transcripts;
pub mod types;
pub mod windows;

pub use config::Config;
pub use error::ClipSignalError;
pub use types::*;
