//! Sweep Core - Foundation crate for the permit-sweep scanner.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other sweep crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Candidate identifiers and the bounded range they are drawn from
//!
//! # Example
//!
//! ```rust
//! use sweep_core::{AppConfig, CandidateRange};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let range = CandidateRange::from_config(&config.range)?;
//! let first = range.first().expect("default range is not empty");
//! assert_eq!(first.as_str(), "A100000");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, LookupConfig, OutputConfig, RangeConfig, SelectorConfig, StorageConfig,
    TokenSourceConfig, TokenSourceKind, ValidationConfig,
};
pub use error::{ConfigError, ConfigResult, SweepError};
pub use types::{Candidate, CandidateRange};
