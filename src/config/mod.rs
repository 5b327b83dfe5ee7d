//! Configuration module for vlr-harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every table has defaults, so a file listing only `[[source]]` entries is valid.
//!
//! # Example
//!
//! ```no_run
//! use vlr_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Default retries: {}", config.harvest.max_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheConfig, Config, HarvestDefaults, HttpConfig, LimitsConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
