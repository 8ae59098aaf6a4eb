use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out monotonically increasing tickets; only the newest one is current.
///
/// A request takes a ticket when it starts and checks it when its response
/// arrives. Starting a newer request supersedes every older ticket, so late
/// responses can be dropped instead of overwriting fresher state.
#[derive(Debug, Clone, Default)]
pub struct SupersedeGate {
    latest: Arc<AtomicU64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl SupersedeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding all earlier tickets.
    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Supersedes outstanding tickets without starting a new request.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }
}
