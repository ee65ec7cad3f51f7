//! Data bridge: connects [`BackOffice`] slot streams and request outcomes
//! to TUI actions.
//!
//! Runs as a background task, forwarding every slot change and every
//! finished request through the TUI's action channel until cancelled.

use futures::StreamExt;
use futures::stream::select_all;
use strum::IntoEnumIterator;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use backoffice_core::{BackOffice, RequestState, Resource};

use crate::action::Action;

pub async fn spawn_data_bridge(
    office: BackOffice,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut slots = select_all(Resource::iter().map(|resource| {
        office
            .subscribe(resource)
            .into_stream()
            .map(move |slot| (resource, slot))
            .boxed()
    }));
    let mut outcomes = office.outcomes();

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some((resource, slot)) = slots.next() => {
                debug!(%resource, items = slot.items.len(), "slot updated");
                let _ = action_tx.send(Action::SlotUpdated(resource, slot));
            }
            received = outcomes.recv() => match received {
                Ok(outcome) => {
                    if !matches!(outcome.state, RequestState::Pending) {
                        let _ = action_tx.send(Action::RequestFinished(outcome));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "outcome feed lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    debug!("data bridge shut down");
}
