//! Sweep Lookup - remote collaborators of the sweep pipeline.
//!
//! Defines the two operations the pipeline dispatches for each candidate,
//! [`SearchClient`] and [`DetailFetcher`], and an HTTP implementation of
//! both against a form-based directory service.
//!
//! # Modules
//!
//! - [`provider`] - Collaborator traits and the values they exchange
//! - [`http`] - reqwest-backed client implementing both traits
//! - [`parser`] - Selector-driven HTML extraction
//! - [`artifacts`] - Optional JSON and error-page dumps
//! - [`error`] - Lookup error type

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod artifacts;
pub mod error;
pub mod http;
pub mod parser;
pub mod provider;

// Re-export commonly used types
pub use artifacts::ArtifactWriter;
pub use error::{LookupError, Result};
pub use http::HttpLookupClient;
pub use parser::PageParser;
pub use provider::{
    AccessToken, DetailFetcher, Locator, RecordDetails, SearchClient, SearchOutcome,
};
