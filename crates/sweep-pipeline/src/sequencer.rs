//! Candidate sequencing.

use sweep_core::{Candidate, CandidateRange};

/// What the sweep should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Dispatch this candidate
    Candidate(Candidate),
    /// The range is exhausted
    Done,
}

/// Maps the last processed candidate to the one after it.
#[derive(Debug, Clone)]
pub struct Sequencer {
    range: CandidateRange,
}

impl Sequencer {
    /// Create a sequencer over `range`.
    #[must_use]
    pub fn new(range: CandidateRange) -> Self {
        Self { range }
    }

    /// The range being walked.
    #[must_use]
    pub fn range(&self) -> &CandidateRange {
        &self.range
    }

    /// Successor of `last`, or the first candidate when nothing has been
    /// processed yet.
    ///
    /// A `last` below the range start (a checkpoint left by a run over a
    /// wider range) resumes at the range start.
    #[must_use]
    pub fn next(&self, last: Option<&Candidate>) -> Next {
        let Some(last) = last else {
            return self.range.first().map_or(Next::Done, Next::Candidate);
        };
        let Some(number) = last.number().checked_add(1) else {
            return Next::Done;
        };
        let number = number.max(self.range.start());

        if self.range.contains(number) {
            Next::Candidate(self.range.render(number))
        } else {
            Next::Done
        }
    }
}
