//! Chandere: an imageboard poller and archiver
//!
//! This crate polls board and thread endpoints of Futaba-styled imageboards,
//! follows boards into their threads, deduplicates and filters posts across
//! polling cycles, and hands the survivors to a downloader or an archive.

pub mod config;
pub mod filter;
pub mod output;
pub mod poller;
pub mod site;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Chandere operations
#[derive(Debug, Error)]
pub enum ChandereError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid target: {0}")]
    Target(#[from] TargetError),

    #[error("No valid targets provided")]
    NoValidTargets,

    #[error("Output path {path} is not writable: {reason}")]
    UnwritableOutputPath { path: PathBuf, reason: String },

    #[error("Filter error: {0}")]
    Filter(#[from] filter::FilterError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while turning operator input into targets
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("cannot form a URI from '{0}'")]
    InvalidTarget(String),

    #[error("unknown imageboard '{0}'")]
    UnknownSite(String),
}

/// Result type alias for Chandere operations
pub type Result<T> = std::result::Result<T, ChandereError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, RunOptions};
pub use poller::{run, Poller};
pub use site::{SiteAdapter, SiteRegistry};
pub use state::{Target, TargetRegistry};
