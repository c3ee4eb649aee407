//! Sweep Pipeline - resumable, token-gated enumeration.
//!
//! Walks a bounded candidate range one token at a time. Each token buys one
//! search; hits are fetched and stored, and every processed candidate is
//! checkpointed so an interrupted sweep resumes where it stopped.
//!
//! # Modules
//!
//! - [`sequencer`] - Next-candidate computation
//! - [`stats`] - Run counters and ETA
//! - [`token_source`] - stdin, file and TCP token transports
//! - [`coordinator`] - The single-flight state machine
//! - [`error`] - Pipeline error type
//!
//! # Example
//!
//! ```ignore
//! let (tx, mut rx) = token_queue(config.tokens.queue_capacity);
//! let source = TokenSource::open(&config.tokens).await?;
//! tokio::spawn(source.run(tx, cancel.clone()));
//!
//! let mut coordinator = Coordinator::from_config(db, &config, client.clone(), client).await?;
//! let outcome = coordinator.run(&mut rx, &cancel).await?;
//! coordinator.close().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod coordinator;
pub mod error;
pub mod sequencer;
pub mod stats;
pub mod token_source;

// Re-export commonly used types
pub use coordinator::{Coordinator, IterationOutcome, IterationReport, RunOutcome, State, Step};
pub use error::{PipelineError, Result};
pub use sequencer::{Next, Sequencer};
pub use stats::{eta, RunStats, StatsSnapshot};
pub use token_source::{forward_lines, token_queue, TokenSource};
