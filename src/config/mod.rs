//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; anything not set falls back to its default.
//!
//! # Example
//!
//! ```no_run
//! use avature_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Sampling {} listing pages", config.discovery.sample_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ChallengeConfig, Config, DiscoveryConfig, ExtractionConfig, HttpConfig, OutputConfig,
    RetryConfig, ThrottleConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_or_default, parse_config,
};
pub use validation::validate;
