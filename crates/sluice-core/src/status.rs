use serde::{Deserialize, Serialize};

/// Snapshot of a limiter's occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterCounts {
    /// Tasks recorded since the last settlement.
    pub submitted: usize,
    /// Tasks currently executing (working-set size).
    pub in_flight: usize,
}
