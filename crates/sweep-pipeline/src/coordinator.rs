//! The token-driven state machine at the heart of a sweep.
//!
//! Each token drives exactly one iteration: pick the next candidate, search
//! for it, fetch and store its details when found, then checkpoint it. The
//! coordinator takes `&mut self` for the whole iteration and pulls the next
//! token only after the checkpoint write has finished, so at most one
//! candidate is ever in flight.
//!
//! The very first token is spent on a lookup of a known-good candidate. If
//! that lookup does not produce a hit the run aborts before any checkpoint
//! is written.

use crate::error::{PipelineError, Result};
use crate::sequencer::{Next, Sequencer};
use crate::stats::RunStats;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use sweep_core::{AppConfig, Candidate, CandidateRange, ConfigError};
use sweep_db::{Database, DiscoveredRecord};
use sweep_lookup::{AccessToken, DetailFetcher, Locator, SearchClient, SearchOutcome};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Where the coordinator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Idle, waiting for the next token
    AwaitingToken,
    /// Spending the first token on the known-good lookup
    Validating,
    /// Searching for a candidate
    Dispatching,
    /// Acting on the search answer
    Classifying,
    /// Appending the processed candidate to the checkpoint log
    Checkpointing,
    /// The range is exhausted
    Completed,
    /// The known-good lookup failed
    AbortedFatal,
}

/// How one candidate turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The service has no record for the candidate
    NotFound,
    /// A record was fetched and stored
    Found {
        /// Key of the stored record
        permit_number: String,
    },
    /// Something prevented a definite answer; the candidate is not retried
    Failed {
        /// Error description
        reason: String,
    },
}

impl IterationOutcome {
    /// Whether the iteration stored a record.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

impl fmt::Display for IterationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::Found { permit_number } => write!(f, "found {permit_number}"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of one candidate iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    /// The candidate processed
    pub candidate: Candidate,
    /// How it turned out
    pub outcome: IterationOutcome,
    /// Whether the checkpoint row was written
    pub checkpoint_written: bool,
}

/// What a single token accomplished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The known-good lookup succeeded
    Validated,
    /// A candidate was processed
    Iteration(IterationReport),
    /// There was nothing left to process
    Completed,
}

/// Why [`Coordinator::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every candidate in the range has been processed
    Completed,
    /// Shutdown was requested
    Interrupted,
    /// The token queue closed
    TokenSourceClosed,
}

/// Drives a sweep one token at a time.
pub struct Coordinator {
    db: Database,
    search: Arc<dyn SearchClient>,
    details: Arc<dyn DetailFetcher>,
    sequencer: Sequencer,
    validation_id: Candidate,
    stats: RunStats,
    state: State,
    validated: bool,
    last: Option<Candidate>,
}

impl Coordinator {
    /// Create a coordinator that resumes after the newest checkpoint in `db`.
    ///
    /// # Errors
    /// Returns `PipelineError::Storage` if the checkpoint log cannot be read
    /// and `PipelineError::Config` if the stored checkpoint does not match
    /// the range format.
    pub async fn new(
        db: Database,
        range: CandidateRange,
        validation_id: Candidate,
        search: Arc<dyn SearchClient>,
        details: Arc<dyn DetailFetcher>,
    ) -> Result<Self> {
        let last = match db.last_checkpoint().await? {
            Some(id) => Some(
                range
                    .parse(&id)
                    .map_err(|e| ConfigError::invalid("checkpoint", e.to_string()))?,
            ),
            None => None,
        };

        let records = db.count_records().await?;
        let checkpoints = db.count_checkpoints().await?;
        match &last {
            Some(last) => tracing::info!(
                last = %last,
                records,
                checkpoints,
                "Resuming after last checkpoint"
            ),
            None => tracing::info!(start = %range.render(range.start()), "Starting a new sweep"),
        }

        Ok(Self {
            db,
            search,
            details,
            stats: RunStats::new(range.clone()),
            sequencer: Sequencer::new(range),
            validation_id,
            state: State::AwaitingToken,
            validated: false,
            last,
        })
    }

    /// Create a coordinator from the application configuration.
    pub async fn from_config(
        db: Database,
        config: &AppConfig,
        search: Arc<dyn SearchClient>,
        details: Arc<dyn DetailFetcher>,
    ) -> Result<Self> {
        let range = CandidateRange::from_config(&config.range)?;
        let validation_id = range
            .parse(&config.validation.known_good_id)
            .map_err(|e| ConfigError::invalid("validation.known_good_id", e.to_string()))?;
        Self::new(db, range, validation_id, search, details).await
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Candidate most recently dispatched or resumed from.
    #[must_use]
    pub fn last_candidate(&self) -> Option<&Candidate> {
        self.last.as_ref()
    }

    /// Counters for this run.
    #[must_use]
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// The store the coordinator writes to.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Consume tokens until the range is exhausted, the queue closes, or
    /// `cancel` fires.
    ///
    /// Cancellation is observed only between iterations, so an iteration
    /// that has started always finishes its checkpoint write.
    ///
    /// # Errors
    /// Returns `PipelineError::Validation` if the known-good lookup fails.
    pub async fn run(
        &mut self,
        tokens: &mut mpsc::Receiver<AccessToken>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        loop {
            if self.validated && self.is_exhausted() {
                self.state = State::Completed;
                tracing::info!("Candidate range exhausted");
                return Ok(RunOutcome::Completed);
            }

            let token = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!("Shutdown requested, stopping between iterations");
                    return Ok(RunOutcome::Interrupted);
                }
                token = tokens.recv() => token,
            };

            let Some(token) = token else {
                tracing::info!("Token source closed");
                return Ok(RunOutcome::TokenSourceClosed);
            };

            if self.handle_token(token).await? == Step::Completed {
                tracing::info!("Candidate range exhausted");
                return Ok(RunOutcome::Completed);
            }
        }
    }

    /// Spend one token.
    ///
    /// The first token performs validation; every later one processes a
    /// single candidate.
    ///
    /// # Errors
    /// Returns `PipelineError::Validation` when validation fails, and on any
    /// token after it has failed.
    pub async fn handle_token(&mut self, token: AccessToken) -> Result<Step> {
        match self.state {
            State::AbortedFatal => Err(PipelineError::Validation(
                "pipeline aborted after failed validation".to_string(),
            )),
            State::Completed => Ok(Step::Completed),
            _ if !self.validated => {
                self.validate(&token).await?;
                Ok(Step::Validated)
            }
            _ => Ok(self.iterate(&token).await),
        }
    }

    /// Close the store once pending writes have finished.
    pub async fn close(self) {
        self.db.close().await;
    }

    fn is_exhausted(&self) -> bool {
        self.sequencer.next(self.last.as_ref()) == Next::Done
    }

    async fn validate(&mut self, token: &AccessToken) -> Result<()> {
        self.state = State::Validating;
        let candidate = self.validation_id.clone();
        tracing::info!(candidate = %candidate, "Validating with known-good candidate");

        let failure = match self.search.search(&candidate, token).await {
            Ok(SearchOutcome::Found(locator)) => {
                tracing::info!(candidate = %candidate, locator = %locator, "Validation succeeded");
                self.validated = true;
                self.state = State::AwaitingToken;
                return Ok(());
            }
            Ok(SearchOutcome::NotFound) => {
                format!("known-good candidate {candidate} was not found")
            }
            Err(e) => format!("lookup of known-good candidate {candidate} failed: {e}"),
        };

        tracing::error!(candidate = %candidate, "{failure}");
        self.state = State::AbortedFatal;
        Err(PipelineError::Validation(failure))
    }

    async fn iterate(&mut self, token: &AccessToken) -> Step {
        self.state = State::Dispatching;
        let candidate = match self.sequencer.next(self.last.as_ref()) {
            Next::Candidate(candidate) => candidate,
            Next::Done => {
                self.state = State::Completed;
                return Step::Completed;
            }
        };

        self.last = Some(candidate.clone());
        self.stats.set_current_candidate(candidate.clone());

        let outcome = self.dispatch(&candidate, token).await;
        if outcome.is_success() {
            self.stats.record_success();
        } else {
            self.stats.record_failure();
        }

        self.state = State::Checkpointing;
        let checkpoint_written = match self.db.append_checkpoint(candidate.as_str()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(candidate = %candidate, error = %e, "Failed to write checkpoint");
                false
            }
        };

        self.state = State::AwaitingToken;
        Step::Iteration(IterationReport {
            candidate,
            outcome,
            checkpoint_written,
        })
    }

    async fn dispatch(&mut self, candidate: &Candidate, token: &AccessToken) -> IterationOutcome {
        let answer = self.search.search(candidate, token).await;

        self.state = State::Classifying;
        let locator = match answer {
            Ok(SearchOutcome::Found(locator)) => locator,
            Ok(SearchOutcome::NotFound) => {
                tracing::info!(candidate = %candidate, "No record found");
                return IterationOutcome::NotFound;
            }
            Err(e) => {
                tracing::warn!(
                    candidate = %candidate,
                    error = %e,
                    timeout = e.is_timeout(),
                    "Search failed"
                );
                return IterationOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match self.store_details(candidate, &locator).await {
            Ok(permit_number) => {
                tracing::info!(candidate = %candidate, permit_number = %permit_number, "Record stored");
                IterationOutcome::Found { permit_number }
            }
            Err(reason) => {
                tracing::warn!(candidate = %candidate, locator = %locator, "{reason}");
                IterationOutcome::Failed { reason }
            }
        }
    }

    async fn store_details(
        &self,
        candidate: &Candidate,
        locator: &Locator,
    ) -> std::result::Result<String, String> {
        let details = self
            .details
            .fetch(locator)
            .await
            .map_err(|e| format!("detail fetch failed: {e}"))?;

        if details.permit_number != candidate.as_str() {
            tracing::debug!(
                candidate = %candidate,
                permit_number = %details.permit_number,
                "Detail page reports a different permit number"
            );
        }

        let record = DiscoveredRecord {
            permit_number: details.permit_number,
            external_id: locator.external_id(),
            name: details.name,
            company: details.company,
            address: details.address,
            phone: details.phone,
            source_url: locator.to_string(),
            created_at: Utc::now(),
        };

        self.db
            .upsert_record(&record)
            .await
            .map_err(|e| format!("record upsert failed: {e}"))?;

        Ok(record.permit_number)
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state)
            .field("validated", &self.validated)
            .field("last", &self.last)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
