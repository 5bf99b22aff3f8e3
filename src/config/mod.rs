//! Configuration module for Chandere
//!
//! This module handles the optional TOML configuration file and the
//! per-invocation run options assembled from the command line.
//!
//! # Example
//!
//! ```no_run
//! use chandere::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("chandere.toml")).unwrap();
//! println!("Polling every {}s", config.poller.interval);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, OutputFormat, OutputMode, PollerConfig, RunOptions, SiteEntry, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
