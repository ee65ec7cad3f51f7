// ── Request status board ──
//
// Every dispatched request gets its own `RequestId`. Its outcome is
// recorded exactly once and broadcast, so concurrent requests can never
// overwrite each other's loading, error or success state.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::model::Resource;

const OUTCOME_CHANNEL_SIZE: usize = 256;
const HISTORY_LIMIT: usize = 50;

/// Correlation id of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    /// `message` is `None` for silent loads.
    Succeeded { message: Option<String> },
    Failed { message: String, auth_expired: bool },
}

/// Final (or pending) record of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub id: RequestId,
    pub resource: Option<Resource>,
    pub label: String,
    pub state: RequestState,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.state, RequestState::Failed { .. })
    }

    /// Text for a toast, if this outcome warrants one.
    pub fn toast(&self) -> Option<&str> {
        match &self.state {
            RequestState::Succeeded { message } => message.as_deref(),
            RequestState::Failed { message, .. } => Some(message),
            RequestState::Pending => None,
        }
    }
}

/// Aggregate view for spinners and status lines. `error` and `success`
/// mirror the latest finished request; starting a request clears both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub is_loading: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl StatusFlags {
    fn settled(outcome: &Outcome, is_loading: bool) -> Self {
        let (error, success) = match &outcome.state {
            RequestState::Failed { message, .. } => (Some(message.clone()), None),
            RequestState::Succeeded { message } => (None, message.clone()),
            RequestState::Pending => (None, None),
        };
        Self {
            is_loading,
            error,
            success,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingRequest {
    resource: Option<Resource>,
    label: String,
}

pub struct StatusBoard {
    next: AtomicU64,
    pending: DashMap<RequestId, PendingRequest>,
    history: Mutex<VecDeque<Outcome>>,
    outcomes: broadcast::Sender<Outcome>,
    flags: watch::Sender<StatusFlags>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_SIZE);
        let (flags, _) = watch::channel(StatusFlags::default());
        Self {
            next: AtomicU64::new(1),
            pending: DashMap::new(),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_LIMIT)),
            outcomes,
            flags,
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    pub fn begin(&self, resource: Option<Resource>, label: impl Into<String>) -> RequestId {
        let id = RequestId(self.next.fetch_add(1, Ordering::Relaxed));
        let label = label.into();
        trace!(%id, %label, "request started");
        self.pending.insert(id, PendingRequest { resource, label });
        self.flags.send_replace(StatusFlags {
            is_loading: true,
            error: None,
            success: None,
        });
        id
    }

    /// Resolve a pending request as successful. Returns `false` if it
    /// had already been resolved.
    pub fn succeed(&self, id: RequestId, message: Option<String>) -> bool {
        self.finish(id, RequestState::Succeeded { message })
    }

    /// Resolve a pending request as failed. Returns `false` if it had
    /// already been resolved.
    pub fn fail(&self, id: RequestId, error: &CoreError) -> bool {
        let state = RequestState::Failed {
            message: error.user_message(),
            auth_expired: error.is_auth_expired(),
        };
        self.finish(id, state)
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Any request for `resource` still in flight.
    pub fn is_loading(&self, resource: Resource) -> bool {
        self.pending
            .iter()
            .any(|p| p.value().resource == Some(resource))
    }

    pub fn flags(&self) -> StatusFlags {
        self.flags.borrow().clone()
    }

    pub fn watch_flags(&self) -> watch::Receiver<StatusFlags> {
        self.flags.subscribe()
    }

    /// Dismiss the aggregate error/success (after a toast times out).
    pub fn clear_messages(&self) {
        self.flags.send_modify(|f| {
            f.error = None;
            f.success = None;
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outcome> {
        self.outcomes.subscribe()
    }

    /// Most recent outcomes, oldest first.
    pub fn history(&self) -> Vec<Outcome> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn outcome(&self, id: RequestId) -> Option<Outcome> {
        if let Some(p) = self.pending.get(&id) {
            return Some(Outcome {
                id,
                resource: p.resource,
                label: p.label.clone(),
                state: RequestState::Pending,
            });
        }
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|o| o.id == id)
            .cloned()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn finish(&self, id: RequestId, state: RequestState) -> bool {
        let Some((_, pending)) = self.pending.remove(&id) else {
            debug!(%id, "outcome for a request that is no longer pending");
            return false;
        };
        let outcome = Outcome {
            id,
            resource: pending.resource,
            label: pending.label,
            state,
        };
        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            if history.len() == HISTORY_LIMIT {
                history.pop_front();
            }
            history.push_back(outcome.clone());
        }
        self.flags
            .send_replace(StatusFlags::settled(&outcome, !self.pending.is_empty()));
        // No receivers is fine; the outcome is still in the history.
        let _ = self.outcomes.send(outcome);
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn each_request_resolves_once() {
        let board = StatusBoard::new();
        let mut rx = board.subscribe();
        let id = board.begin(Some(Resource::Vendors), "delete vendor");

        assert!(board.succeed(id, Some("Deleted".into())));
        assert!(!board.succeed(id, Some("Deleted again".into())));
        assert!(!board.fail(id, &CoreError::Timeout));

        let outcome = rx.try_recv().unwrap();
        assert_eq!(outcome.toast(), Some("Deleted"));
        assert!(rx.try_recv().is_err());
        assert_eq!(board.history().len(), 1);
    }

    #[test]
    fn concurrent_requests_do_not_clobber_each_other() {
        let board = StatusBoard::new();
        let load = board.begin(Some(Resource::Vendors), "load vendors");
        let save = board.begin(Some(Resource::Customers), "save customer");

        board.fail(
            save,
            &CoreError::Business {
                message: "Code taken".into(),
                status: 422,
            },
        );
        let flags = board.flags();
        assert!(flags.is_loading);
        assert_eq!(flags.error.as_deref(), Some("Code taken"));
        assert!(board.is_loading(Resource::Vendors));
        assert!(!board.is_loading(Resource::Customers));

        board.succeed(load, None);
        let flags = board.flags();
        assert!(!flags.is_loading);
        // The flags follow the latest finished request; the failure stays
        // on its own record.
        assert_eq!(flags, StatusFlags::default());
        assert_eq!(
            board.outcome(save).unwrap().state,
            RequestState::Failed {
                message: "Code taken".into(),
                auth_expired: false,
            }
        );
    }

    #[test]
    fn starting_a_request_clears_the_previous_error() {
        let board = StatusBoard::new();
        let first = board.begin(Some(Resource::Vendors), "load vendors");
        board.fail(first, &CoreError::Timeout);
        assert_eq!(board.flags().error, Some(CoreError::Timeout.user_message()));
        assert!(!board.flags().is_loading);

        let second = board.begin(Some(Resource::Vendors), "load vendors");
        assert_eq!(
            board.flags(),
            StatusFlags {
                is_loading: true,
                error: None,
                success: None,
            }
        );

        board.succeed(second, Some("Saved".into()));
        let flags = board.flags();
        assert!(!flags.is_loading);
        assert_eq!(flags.error, None);
        assert_eq!(flags.success.as_deref(), Some("Saved"));
    }

    #[test]
    fn history_is_bounded() {
        let board = StatusBoard::new();
        for _ in 0..(HISTORY_LIMIT + 5) {
            let id = board.begin(None, "ping");
            board.succeed(id, None);
        }
        assert_eq!(board.history().len(), HISTORY_LIMIT);
        assert_eq!(board.pending_count(), 0);
    }
}
