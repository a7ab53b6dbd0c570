//! The pending-mutation queue.
//!
//! Live server state is `!Send`. Work that starts on another task (a
//! network reader admitting a player, a file watcher that finished loading
//! a new ban list) is wrapped in a closure and sent here; the owner loop
//! applies it to the state between ticks, in submission order.

use std::fmt;

use tokio::sync::mpsc;

/// A unit of deferred work.
pub enum Pending<S> {
    /// Run this closure against the owner's state.
    Apply(Box<dyn FnOnce(&mut S) + Send>),
    /// Stop the owner loop after everything queued before it has run.
    Shutdown,
}

impl<S> fmt::Debug for Pending<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply(_) => f.write_str("Pending::Apply(..)"),
            Self::Shutdown => f.write_str("Pending::Shutdown"),
        }
    }
}

/// The owner loop is gone; the work was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("owner loop has stopped")]
pub struct QueueClosed;

/// Creates a connected sender/queue pair.
pub fn mutation_queue<S>() -> (MutationSender<S>, MutationQueue<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MutationSender { tx }, MutationQueue { rx })
}

/// The `Send + Clone` half. Hand it to any task that needs to change live
/// state.
pub struct MutationSender<S> {
    tx: mpsc::UnboundedSender<Pending<S>>,
}

impl<S> MutationSender<S> {
    /// Queues `f` to run on the owner thread.
    pub fn submit<F>(&self, f: F) -> Result<(), QueueClosed>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.tx
            .send(Pending::Apply(Box::new(f)))
            .map_err(|_| QueueClosed)
    }

    /// Asks the owner loop to stop.
    pub fn request_shutdown(&self) -> Result<(), QueueClosed> {
        self.tx.send(Pending::Shutdown).map_err(|_| QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<S> Clone for MutationSender<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> fmt::Debug for MutationSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationSender")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// What one [`MutationQueue::drain`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainOutcome {
    pub applied: usize,
    pub shutdown_requested: bool,
}

/// The owner's half.
pub struct MutationQueue<S> {
    rx: mpsc::UnboundedReceiver<Pending<S>>,
}

impl<S> MutationQueue<S> {
    /// Applies everything queued so far, in order, without waiting.
    ///
    /// Stops at a shutdown request; anything queued after it stays in the
    /// queue and is dropped with it.
    pub fn drain(&mut self, state: &mut S) -> DrainOutcome {
        let mut outcome = DrainOutcome::default();
        while let Ok(pending) = self.rx.try_recv() {
            match pending {
                Pending::Apply(f) => {
                    f(state);
                    outcome.applied += 1;
                }
                Pending::Shutdown => {
                    outcome.shutdown_requested = true;
                    break;
                }
            }
        }
        if outcome.applied > 0 {
            tracing::debug!(applied = outcome.applied, "mutation queue drained");
        }
        outcome
    }

    /// Waits for the next pending item. `None` once every sender is gone.
    ///
    /// Used by event-driven loops, which have no tick to wake them.
    pub async fn recv(&mut self) -> Option<Pending<S>> {
        self.rx.recv().await
    }

    /// Applies one item received through [`recv`](Self::recv). Returns
    /// `true` if it was a shutdown request.
    pub fn apply(state: &mut S, pending: Pending<S>) -> bool {
        match pending {
            Pending::Apply(f) => {
                f(state);
                false
            }
            Pending::Shutdown => true,
        }
    }
}
