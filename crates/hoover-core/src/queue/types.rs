//! Types used by the work queue.

/// Queue row identifier.
pub type ItemId = i64;

/// Lifecycle of a queued row, stored as a string in the database.
///
/// Acknowledged rows are deleted, so there is no "done" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Waiting for delivery (possibly delayed by `available_at`).
    Ready,
    /// Claimed by a worker, not yet acked or requeued.
    InFlight,
    /// Dead-lettered: malformed, or out of deliveries.
    Dead,
}

impl ItemState {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemState::Ready => "ready",
            ItemState::InFlight => "in_flight",
            ItemState::Dead => "dead",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "ready" => ItemState::Ready,
            "in_flight" => ItemState::InFlight,
            _ => ItemState::Dead,
        }
    }
}

/// One claimed message.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: ItemId,
    /// Raw JSON payload; decoding is the consumer's job.
    pub payload: String,
    /// Delivery count including this one (1 on first delivery).
    pub deliveries: u32,
}

/// What `requeue` did with a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueOutcome {
    /// Back to ready after the given delay.
    Scheduled(std::time::Duration),
    /// Delivery budget spent; moved to dead.
    DeadLettered,
}

/// Row counts per state, used by `hoover status` and drain mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub ready: u64,
    pub in_flight: u64,
    pub dead: u64,
}

impl QueueStats {
    pub fn pending(&self) -> u64 {
        self.ready + self.in_flight
    }
}

/// Dead-lettered row as listed by `hoover dead`.
#[derive(Debug, Clone)]
pub struct DeadItem {
    pub id: ItemId,
    pub payload: String,
    pub deliveries: u32,
    pub last_error: Option<String>,
    pub updated_at: i64,
}
