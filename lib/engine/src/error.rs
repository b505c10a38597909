//! Error types for the engine crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `GraphError`: assembly-time configuration faults (names, ports, types)
//! - `PortError`: misuse of a single port (unwired push, empty pop)
//! - `ExecutionError`: lifecycle and shutdown faults once workers exist
//! - `TimerError`: periodic timer construction and driving

use std::fmt;
use std::time::Duration;

/// Errors from graph assembly and start.
///
/// All of these are raised synchronously, before any worker runs, so a
/// graph that fails to assemble never executes partially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node is already registered under this name.
    DuplicateNode { name: String },
    /// No node is registered under this name.
    NodeNotFound { name: String },
    /// The output index is beyond the node's declared output count.
    OutputOutOfRange {
        node: String,
        port: usize,
        outs: usize,
    },
    /// The input index is beyond the node's declared input count.
    InputOutOfRange { node: String, port: usize, ins: usize },
    /// A port's payload type differs from the type requested at connect.
    TypeMismatch {
        node: String,
        port: usize,
        expected: &'static str,
        actual: &'static str,
    },
    /// The input already has an upstream producer.
    InputAlreadyConnected { node: String, port: usize },
    /// The output already feeds a downstream consumer.
    OutputAlreadyConnected { node: String, port: usize },
    /// The graph has started; nodes and edges are fixed.
    Frozen,
    /// `start()` was already called on this graph.
    AlreadyStarted,
    /// `start()` was called outside a tokio runtime.
    NoRuntime,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode { name } => write!(f, "node name already in use: {name}"),
            Self::NodeNotFound { name } => write!(f, "node not found: {name}"),
            Self::OutputOutOfRange { node, port, outs } => {
                write!(f, "output {port} out of range on node {node} ({outs} outputs)")
            }
            Self::InputOutOfRange { node, port, ins } => {
                write!(f, "input {port} out of range on node {node} ({ins} inputs)")
            }
            Self::TypeMismatch {
                node,
                port,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "type mismatch on {node}:{port}: expected {expected}, port carries {actual}"
                )
            }
            Self::InputAlreadyConnected { node, port } => {
                write!(f, "input {node}:{port} already has an upstream connection")
            }
            Self::OutputAlreadyConnected { node, port } => {
                write!(f, "output {node}:{port} already has a downstream connection")
            }
            Self::Frozen => write!(f, "graph is running; nodes and edges can no longer change"),
            Self::AlreadyStarted => write!(f, "graph already started"),
            Self::NoRuntime => write!(f, "graph must be started inside a tokio runtime"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors from a single port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// Push on an output with no downstream consumer.
    Unconnected { port: usize },
    /// Pop on an input whose queue is empty.
    Empty { port: usize },
    /// A role helper was asked for a port it does not have.
    OutOfRange { port: usize, len: usize },
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconnected { port } => write!(f, "output {port} is not connected"),
            Self::Empty { port } => write!(f, "pop on empty input {port}"),
            Self::OutOfRange { port, len } => {
                write!(f, "port {port} out of range ({len} ports)")
            }
        }
    }
}

impl std::error::Error for PortError {}

/// Errors from the running graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// `stop()` was called on a graph that is not running.
    NotRunning,
    /// A worker did not exit within the shutdown grace period.
    ///
    /// This breaks the cancellation contract and is not recoverable; the
    /// remaining workers are aborted.
    ShutdownTimeout { node: String, grace: Duration },
    /// One or more workers panicked. Reported after every worker has
    /// been joined.
    NodesPanicked { nodes: Vec<String> },
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunning => write!(f, "graph is not running"),
            Self::ShutdownTimeout { node, grace } => {
                write!(f, "node {node} did not stop within {}ms", grace.as_millis())
            }
            Self::NodesPanicked { nodes } => write!(f, "nodes panicked: {}", nodes.join(", ")),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Errors from periodic timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// Timers need a non-zero interval.
    ZeroInterval,
    /// Another task is already driving this timer.
    AlreadyDriven,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroInterval => write!(f, "timer interval must be non-zero"),
            Self::AlreadyDriven => write!(f, "timer is already being driven"),
        }
    }
}

impl std::error::Error for TimerError {}
