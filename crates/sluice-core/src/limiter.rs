//! Bounded-concurrency task limiter.
//!
//! Tasks start the moment they are submitted; the limiter only throttles the
//! *submitter*. When the working set is at capacity, `submit` suspends until
//! one running task finishes, whichever that is.

use std::collections::HashSet;
use std::future::Future;
use std::panic;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::SluiceError;
use crate::settlement::Settlement;
use crate::status::LimiterCounts;

/// State shared between the limiter and its spawned task wrappers.
///
/// Design:
/// - `running` holds submission indices, not handles. The index is the
///   task's identity for the whole batch, so the working set is a plain set
///   of indices.
/// - `completions` is bumped under the `running` lock, and a suspended
///   `submit` subscribes under the same lock right after its capacity
///   check. The lock orders the two, so a completion can never slip between
///   the check and the subscription.
struct Shared {
    limit: usize,
    running: Mutex<HashSet<usize>>,
    completions: watch::Sender<u64>,
}

impl Shared {
    fn running(&self) -> MutexGuard<'_, HashSet<usize>> {
        // The critical sections around `running` cannot panic, so a
        // poisoned lock still holds a consistent set.
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a finished task from the working set and signal one
    /// completion.
    fn release(&self, index: usize) {
        let mut running = self.running();
        running.remove(&index);
        self.completions
            .send_modify(|count| *count = count.wrapping_add(1));
    }
}

/// Frees a task's working-set slot when its wrapper finishes.
///
/// Removal runs in `Drop` so it also happens on unwind: a panicking task
/// must not wedge capacity accounting, and removal must happen whether or
/// not anyone is currently waiting on it.
struct Slot {
    shared: Arc<Shared>,
    index: usize,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.shared.release(self.index);
    }
}

/// Bounded-concurrency task runner.
///
/// Submitted tasks are spawned immediately and recorded in submission
/// order; at most `limit` of them are in flight at once. [`Limiter::settle`]
/// waits for the whole batch and partitions the outcomes, after which the
/// limiter is back in its initial state and can be reused.
///
/// Both `submit` and `settle` take `&mut self`, so a settlement racing a
/// concurrent submission is unrepresentable.
///
/// # Example
/// ```
/// use sluice_core::Limiter;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut limiter = Limiter::<u32, String>::new(2).unwrap();
/// limiter.submit(async { Ok(21) }).await;
/// limiter.submit(async { Err("nope".to_string()) }).await;
///
/// let settlement = limiter.settle().await;
/// assert_eq!(settlement.successful, vec![21]);
/// assert_eq!(settlement.failed[0].index, 1);
/// # }
/// ```
pub struct Limiter<T, E> {
    shared: Arc<Shared>,
    record: Vec<JoinHandle<Result<T, E>>>,
}

impl<T, E> Limiter<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a limiter allowing at most `limit` tasks in flight.
    ///
    /// `limit` below 1 is invalid configuration: it would mean either no
    /// progress at all or an unbounded working set, so it is rejected here.
    pub fn new(limit: usize) -> Result<Self, SluiceError> {
        if limit < 1 {
            return Err(SluiceError::InvalidLimit(limit));
        }
        let (completions, _) = watch::channel(0u64);
        Ok(Self {
            shared: Arc::new(Shared {
                limit,
                running: Mutex::new(HashSet::new()),
                completions,
            }),
            record: Vec::new(),
        })
    }

    /// Submit one task. Must be called within a Tokio runtime.
    ///
    /// The task starts executing right away, even when this call then
    /// suspends: if the working set is at or over `limit` after
    /// registration, `submit` waits for exactly one completion (first to
    /// finish wins) before returning. It never waits for occupancy to drop
    /// strictly below the limit, and it never fails because the task it
    /// raced against did.
    pub async fn submit<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let index = self.record.len();

        // Register before spawning so the wrapper's removal can never run
        // ahead of the insert.
        let capacity_wait = {
            let mut running = self.shared.running();
            running.insert(index);
            if running.len() >= self.shared.limit {
                Some(self.shared.completions.subscribe())
            } else {
                None
            }
        };

        let slot = Slot {
            shared: Arc::clone(&self.shared),
            index,
        };
        self.record.push(tokio::spawn(async move {
            let _slot = slot;
            task.await
        }));
        trace!(index, "task submitted");

        if let Some(mut completions) = capacity_wait {
            debug!(
                index,
                limit = self.shared.limit,
                "at capacity, waiting for one completion"
            );
            // One completion is enough to proceed, whatever the resulting
            // occupancy. A failed task counts too: its error surfaces at
            // settlement, not here.
            let _ = completions.changed().await;
        }
    }

    /// Submit a task produced by a zero-argument factory.
    ///
    /// The factory is invoked immediately, exactly once, at submission
    /// time; it is not deferred until a capacity slot opens.
    pub async fn submit_with<F, Fut>(&mut self, factory: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.submit(factory()).await;
    }

    /// Wait until every submitted task reached a terminal state, then
    /// partition the outcomes in submission order.
    ///
    /// Drains the submission record and clears the working set, so the
    /// limiter afterwards behaves like a freshly created one. Task failures
    /// are data in the returned [`Settlement`]; this method itself never
    /// fails because of them. With no submissions it resolves trivially
    /// with an empty settlement.
    pub async fn settle(&mut self) -> Settlement<T, E> {
        debug!(submitted = self.record.len(), "settling batch");

        let mut outcomes = Vec::with_capacity(self.record.len());
        for handle in self.record.drain(..) {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                // Tasks are never aborted, so a join failure can only be a
                // panic; hand it back to the caller.
                Err(join_error) => panic::resume_unwind(join_error.into_panic()),
            }
        }
        self.shared.running().clear();

        let settlement = Settlement::from_outcomes(outcomes);
        debug!(
            successful = settlement.successful.len(),
            failed = settlement.failed.len(),
            "batch settled"
        );
        settlement
    }

    /// The configured concurrency cap.
    pub fn limit(&self) -> usize {
        self.shared.limit
    }

    /// Occupancy snapshot: tasks recorded this batch and tasks in flight.
    pub fn counts(&self) -> LimiterCounts {
        LimiterCounts {
            submitted: self.record.len(),
            in_flight: self.shared.running().len(),
        }
    }
}

impl<T, E> std::fmt::Debug for Limiter<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("limit", &self.shared.limit)
            .field("submitted", &self.record.len())
            .finish()
    }
}
