//! Action correlation.
//!
//! Tracks every action request between its arrival and the single result
//! that answers it. Entries are tagged with the [`ConnectionEpoch`] they
//! arrived in; opening a new connection drops everything from the previous
//! one.
//!
//! A target that accepted a request but never answers leaves its entry
//! pending until the next epoch. There is no per-action timeout.

// ============================================================================
// Imports
// ============================================================================

use futures_util::future::join_all;
use rustc_hash::FxHashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::Error;
use crate::identifiers::{ActionId, ConnectionEpoch, TargetId};
use crate::page::PageTargets;
use crate::protocol::{ActionName, ActionRequest, ActionResult};

// ============================================================================
// DeliveryTicket
// ============================================================================

/// Identifies one registration of an action id.
///
/// Delivery outcomes carry the ticket of the request they delivered, so an
/// outcome for a replaced request never touches the entry that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeliveryTicket {
    /// Epoch the request arrived in.
    pub epoch: ConnectionEpoch,
    /// Registration counter, unique for the table's lifetime.
    pub sequence: u64,
}

// ============================================================================
// PendingAction
// ============================================================================

/// An action waiting for its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    /// Registration this entry belongs to.
    pub ticket: DeliveryTicket,
    /// Requested action.
    pub name: ActionName,
    /// Arrival time.
    pub registered_at: Instant,
    /// `true` once at least one target accepted the request.
    pub delivered: bool,
}

// ============================================================================
// ActionCorrelation
// ============================================================================

/// Pending-action table keyed by action id.
#[derive(Debug, Default)]
pub struct ActionCorrelation {
    epoch: ConnectionEpoch,
    next_sequence: u64,
    pending: FxHashMap<ActionId, PendingAction>,
}

impl ActionCorrelation {
    /// Creates an empty table at the initial epoch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current epoch.
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> ConnectionEpoch {
        self.epoch
    }

    /// Starts a new epoch and drops every pending entry.
    pub fn begin_epoch(&mut self) -> ConnectionEpoch {
        let dropped = self.pending.len();
        self.pending.clear();
        self.epoch = self.epoch.next();

        if dropped > 0 {
            debug!(dropped, epoch = %self.epoch, "Dropped pending actions from previous connection");
        }

        self.epoch
    }

    /// Registers `request` in the current epoch.
    ///
    /// A pending entry with the same id is replaced; outcomes carrying its
    /// ticket are ignored from then on.
    pub fn register(&mut self, request: &ActionRequest) -> DeliveryTicket {
        let ticket = DeliveryTicket {
            epoch: self.epoch,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        let entry = PendingAction {
            ticket,
            name: request.name,
            registered_at: Instant::now(),
            delivered: false,
        };

        if self.pending.insert(request.id.clone(), entry).is_some() {
            warn!(id = %request.id, "Duplicate action id, previous request replaced");
        }
        ticket
    }

    /// Records that the registration behind `ticket` reached a target.
    ///
    /// Returns `false` if the entry is gone or was registered again.
    pub fn mark_delivered(&mut self, id: &ActionId, ticket: DeliveryTicket) -> bool {
        match self.pending.get_mut(id) {
            Some(entry) if entry.ticket == ticket => {
                entry.delivered = true;
                true
            }
            _ => false,
        }
    }

    /// Removes an undelivered entry and returns the failure result to send.
    ///
    /// Returns `None` if the entry is gone, was already delivered, or was
    /// registered again under a newer ticket.
    pub fn fail_undelivered(
        &mut self,
        id: &ActionId,
        ticket: DeliveryTicket,
        reason: impl Into<String>,
    ) -> Option<ActionResult> {
        let entry = self.pending.get(id)?;
        if entry.ticket != ticket || entry.delivered {
            return None;
        }

        self.pending.remove(id);
        Some(ActionResult::failure(id.clone(), reason))
    }

    /// Removes the entry for `id`. Returns `true` if it was pending.
    pub fn resolve(&mut self, id: &ActionId) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Returns the pending entry for `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &ActionId) -> Option<&PendingAction> {
        self.pending.get(id)
    }

    /// Returns the number of pending actions.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Result of forwarding a request to the page targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// At least one target accepted the request.
    Accepted {
        /// Targets that accepted.
        targets: Vec<TargetId>,
    },
    /// No target was available.
    NoTargets,
    /// Every forward failed.
    Rejected {
        /// Combined failure text.
        reason: String,
    },
}

impl DeliveryOutcome {
    /// Returns the delivery error for an undelivered request, or `None` if
    /// the request was accepted.
    #[must_use]
    pub fn error(&self, id: &ActionId, name: ActionName) -> Option<Error> {
        let reason = match self {
            Self::Accepted { .. } => return None,
            Self::NoTargets => format!("no page is available to run {name}"),
            Self::Rejected { reason } => format!("every page refused {name}: {reason}"),
        };
        Some(Error::action_delivery(id.clone(), reason))
    }
}

/// Forwards `request` to every available target.
pub async fn deliver(targets: &dyn PageTargets, request: &ActionRequest) -> DeliveryOutcome {
    let available = targets.available_targets().await;
    if available.is_empty() {
        debug!(id = %request.id, "No targets for action");
        return DeliveryOutcome::NoTargets;
    }

    let forwards = available.iter().map(|&target| async move {
        (target, targets.forward_action(target, request).await)
    });

    let mut accepted = Vec::new();
    let mut failures = Vec::new();

    for (target, result) in join_all(forwards).await {
        match result {
            Ok(()) => accepted.push(target),
            Err(e) => {
                debug!(id = %request.id, %target, error = %e, "Forward failed");
                failures.push(e.to_string());
            }
        }
    }

    if accepted.is_empty() {
        DeliveryOutcome::Rejected {
            reason: failures.join("; "),
        }
    } else {
        DeliveryOutcome::Accepted { targets: accepted }
    }
}

// ============================================================================
// Tests
// ============================================================================
