//! Candidate identifiers and the bounded range they are drawn from.
//!
//! A candidate is a number from a dense, ordered integer range rendered with
//! a fixed prefix (e.g. `A100000`). The rendered form is what gets submitted
//! to the lookup service and what is stored in the checkpoint log.

use crate::config::RangeConfig;
use crate::error::{ConfigError, ConfigResult, SweepError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A single identifier from the enumeration range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    number: u64,
    id: String,
}

impl Candidate {
    /// Numeric part of the identifier.
    #[must_use]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Rendered identifier, prefix included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.number.cmp(&other.number)
    }
}

/// Half-open range `[start, end)` of candidates sharing one rendering format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRange {
    prefix: String,
    start: u64,
    end: u64,
    width: usize,
}

impl CandidateRange {
    /// Build a range from explicit bounds.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if `end <= start`.
    pub fn new(prefix: impl Into<String>, start: u64, end: u64, width: usize) -> ConfigResult<Self> {
        if end <= start {
            return Err(ConfigError::invalid(
                "range.end",
                format!("must be greater than range.start ({start}), got {end}"),
            ));
        }

        Ok(Self {
            prefix: prefix.into(),
            start,
            end,
            width,
        })
    }

    /// Build a range from the `[range]` config section.
    pub fn from_config(config: &RangeConfig) -> ConfigResult<Self> {
        Self::new(config.prefix.clone(), config.start, config.end, config.width)
    }

    /// Render a number in this range's fixed form.
    #[must_use]
    pub fn render(&self, number: u64) -> Candidate {
        let width = self.width;
        Candidate {
            number,
            id: format!("{}{number:0width$}", self.prefix),
        }
    }

    /// The first candidate of the range, or `None` if the range is empty.
    #[must_use]
    pub fn first(&self) -> Option<Candidate> {
        self.contains(self.start).then(|| self.render(self.start))
    }

    /// Whether `number` lies in `[start, end)`.
    #[must_use]
    pub fn contains(&self, number: u64) -> bool {
        number >= self.start && number < self.end
    }

    /// Inclusive lower bound.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Exclusive upper bound.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of candidates between `candidate` and the upper bound.
    #[must_use]
    pub fn remaining_after(&self, candidate: &Candidate) -> u64 {
        self.end.saturating_sub(candidate.number)
    }

    /// Parse a rendered identifier back into a candidate.
    ///
    /// The prefix must match exactly and the remainder must be decimal
    /// digits. The number is not required to lie inside the range, so a
    /// checkpoint written under a wider range can still be read.
    ///
    /// # Errors
    /// Returns `SweepError::Validation` if the identifier does not match
    /// this range's format.
    pub fn parse(&self, id: &str) -> Result<Candidate, SweepError> {
        static DIGITS: OnceLock<Regex> = OnceLock::new();
        let digits = DIGITS.get_or_init(|| Regex::new(r"^[0-9]+$").expect("valid regex"));

        let rest = id.strip_prefix(self.prefix.as_str()).ok_or_else(|| {
            SweepError::Validation(format!(
                "candidate '{id}' does not start with prefix '{}'",
                self.prefix
            ))
        })?;

        if !digits.is_match(rest) {
            return Err(SweepError::Validation(format!(
                "candidate '{id}' has a non-numeric suffix '{rest}'"
            )));
        }

        let number = rest.parse::<u64>().map_err(|e| {
            SweepError::Validation(format!("candidate '{id}' is out of range: {e}"))
        })?;

        Ok(self.render(number))
    }
}
