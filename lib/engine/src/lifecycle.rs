//! Node lifecycle state machine.
//!
//! `Constructed → Running → Stopping → Stopped`, with `Failed` reachable
//! from `Running` or `Stopping` when a worker ends on a fault or panic.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The lifecycle state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Registered, not yet started.
    Constructed,
    /// Worker is running.
    Running,
    /// Stop was signalled; worker has not exited yet.
    Stopping,
    /// Worker exited after observing the stop signal.
    Stopped,
    /// Worker ended on an activation fault or a panic.
    Failed,
}

impl NodeState {
    /// Returns true if the worker can never run again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Constructed, Self::Running)
                | (Self::Running, Self::Stopping)
                | (Self::Running, Self::Stopped)
                | (Self::Running, Self::Failed)
                | (Self::Stopping, Self::Stopped)
                | (Self::Stopping, Self::Failed)
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constructed => "constructed",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared, thread-safe holder for a node's state.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<Mutex<NodeState>>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(NodeState::Constructed)))
    }

    pub(crate) fn get(&self) -> NodeState {
        *self.0.lock()
    }

    /// Moves to `next` if the transition is legal. Returns whether it moved.
    pub(crate) fn advance(&self, next: NodeState) -> bool {
        let mut state = self.0.lock();
        if state.can_advance_to(next) {
            *state = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_the_happy_path() {
        let cell = StateCell::new();
        assert!(cell.advance(NodeState::Running));
        assert!(cell.advance(NodeState::Stopping));
        assert!(cell.advance(NodeState::Stopped));
        assert!(cell.get().is_terminal());
    }

    #[test]
    fn terminal_states_stick() {
        let cell = StateCell::new();
        cell.advance(NodeState::Running);
        cell.advance(NodeState::Failed);

        assert!(!cell.advance(NodeState::Stopping));
        assert!(!cell.advance(NodeState::Running));
        assert_eq!(cell.get(), NodeState::Failed);
    }

    #[test]
    fn cannot_skip_running() {
        let cell = StateCell::new();
        assert!(!cell.advance(NodeState::Stopping));
        assert_eq!(cell.get(), NodeState::Constructed);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&NodeState::Stopping).expect("serialize");
        assert_eq!(json, "\"stopping\"");
    }
}
