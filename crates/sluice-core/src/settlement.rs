//! Settlement model: the result format of a drained batch.
//!
//! This module is architecture-agnostic: it does not assume how tasks were
//! executed or bounded. It only defines the "shape" of results that a batch
//! can report once every task has reached a terminal state.

use serde::{Deserialize, Serialize};

/// A failed task, tagged with where it was submitted.
///
/// `index` is the task's 0-based position among *all* submissions in the
/// batch, not its position among failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure<E> {
    pub error: E,
    pub index: usize,
}

/// Partition of a batch's outcomes.
///
/// - `successful`: values of fulfilled tasks, in submission order.
/// - `failed`: failure descriptors, in submission order, each carrying the
///   overall submission index.
///
/// A task failure is data here, never an error of the settlement itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement<T, E> {
    pub successful: Vec<T>,
    pub failed: Vec<Failure<E>>,
}

impl<T, E> Settlement<T, E> {
    /// Settlement of a batch with no submissions.
    pub fn empty() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Partition terminal outcomes, preserving submission order on both
    /// sides. The iteration index becomes the failure's reported index.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Result<T, E>>) -> Self {
        let mut settlement = Self::empty();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(value) => settlement.successful.push(value),
                Err(error) => settlement.failed.push(Failure { error, index }),
            }
        }
        settlement
    }

    /// Total number of settled tasks.
    pub fn len(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successful.is_empty() && self.failed.is_empty()
    }
}
