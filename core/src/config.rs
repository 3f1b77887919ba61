//! Engine configuration.

/// Tunables for the capacity engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookingConfig {
    /// Smallest capacity a lesson may be created with or updated to
    pub min_capacity: u32,
    /// How many times a losing conditional update is retried against fresh
    /// state before failing with `ConcurrentModification`
    pub cas_retry_limit: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            min_capacity: 5,
            cas_retry_limit: 8,
        }
    }
}
