//! Per-node wakeup signal.
//!
//! Every input queue of a node shares one `Activation`. An enqueue marks
//! its input as pending and rings the node; the node's worker drains the
//! pending set and calls its activation hook once per marked input.
//! Arrivals that land while the worker is busy coalesce into a single
//! mark, which is why activation hooks must re-check their inputs.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Wakeup state shared by a node's inputs and its worker.
#[derive(Debug)]
pub struct Activation {
    notify: Notify,
    pending: Vec<AtomicBool>,
}

impl Activation {
    /// Creates a signal for a node with `ins` inputs.
    #[must_use]
    pub fn new(ins: usize) -> Self {
        Self {
            notify: Notify::new(),
            pending: (0..ins).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Number of inputs this signal covers.
    #[must_use]
    pub fn ins(&self) -> usize {
        self.pending.len()
    }

    /// Marks `input` as having new data and wakes the worker.
    ///
    /// The mark is stored before the wakeup, and `Notify` keeps a permit
    /// when nobody is waiting, so a wakeup is never lost.
    pub fn mark(&self, input: usize) {
        if let Some(flag) = self.pending.get(input) {
            flag.store(true, Ordering::Release);
            self.notify.notify_one();
        }
    }

    /// Takes every pending mark, in input order.
    pub fn take_pending(&self) -> Vec<usize> {
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, flag)| flag.swap(false, Ordering::AcqRel))
            .map(|(index, _)| index)
            .collect()
    }

    /// Waits until some input has been marked since the last wakeup.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}
