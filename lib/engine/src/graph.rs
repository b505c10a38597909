//! Graph registry and lifecycle.
//!
//! A `Graph` holds named nodes and the typed edges between their ports,
//! stored in a petgraph `DiGraph`. Assembly (`add`, `add_timer`,
//! `connect`) is validated eagerly; `start` gives every node its own tokio
//! task and drives registered timers, and `stop` cancels everything and
//! waits for every task to exit within the configured grace period.
//!
//! Nodes and edges are fixed once `start` has been called.

use crate::config::GraphConfig;
use crate::edge::{Edge, EdgeRef};
use crate::error::{ExecutionError, GraphError};
use crate::lifecycle::{NodeState, StateCell};
use crate::node::{Node, NodeContext};
use crate::port::{Consumer, Producer, Wiring, wire};
use crate::timer::PeriodicTimer;
use futures::FutureExt;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef as _;
use rootcause::Report;
use serde::Serialize;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use weft_core::{GraphId, Result};

/// A registered node and its bookkeeping.
struct NodeEntry {
    name: String,
    ins: usize,
    outs: usize,
    /// Moved into the worker task on start.
    node: Option<Box<dyn Node>>,
    state: StateCell,
}

/// How a worker task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Returned,
    Panicked,
}

/// A spawned task the graph must join on stop.
struct Worker {
    name: String,
    handle: JoinHandle<Exit>,
}

struct Running {
    cancel: CancellationToken,
    workers: Vec<Worker>,
    timers: Vec<Worker>,
}

enum Phase {
    Assembling,
    Running(Running),
    Stopped,
}

/// A dataflow graph of named nodes joined by typed edges.
pub struct Graph {
    id: GraphId,
    config: GraphConfig,
    topology: DiGraph<NodeEntry, Edge>,
    /// Map from node name to petgraph's NodeIndex for O(1) lookup.
    index: HashMap<String, NodeIndex>,
    timers: Vec<PeriodicTimer>,
    phase: Phase,
}

impl Graph {
    /// Creates an empty graph with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Creates an empty graph.
    #[must_use]
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            id: GraphId::new(),
            config,
            topology: DiGraph::new(),
            index: HashMap::new(),
            timers: Vec::new(),
            phase: Phase::Assembling,
        }
    }

    /// This graph's identifier.
    #[must_use]
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Registers `node` under `name`.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::DuplicateNode` if the name is taken, or
    /// `GraphError::Frozen` once the graph has started.
    pub fn add<N: Node>(&mut self, node: N, name: impl Into<String>) -> Result<(), GraphError> {
        self.add_boxed(Box::new(node), name)
    }

    /// Registers an already-boxed node under `name`.
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add).
    pub fn add_boxed(
        &mut self,
        node: Box<dyn Node>,
        name: impl Into<String>,
    ) -> Result<(), GraphError> {
        self.ensure_assembling()?;
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Report::new(GraphError::DuplicateNode { name }));
        }

        let ports = node.ports();
        let entry = NodeEntry {
            name: name.clone(),
            ins: ports.ins(),
            outs: ports.outs(),
            node: Some(node),
            state: StateCell::new(),
        };
        debug!(graph = %self.id, node = %name, ins = entry.ins, outs = entry.outs, "node added");
        let index = self.topology.add_node(entry);
        self.index.insert(name, index);
        Ok(())
    }

    /// Registers a timer for `start` to drive and `stop` to cancel.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::Frozen` once the graph has started.
    pub fn add_timer(&mut self, timer: PeriodicTimer) -> Result<(), GraphError> {
        self.ensure_assembling()?;
        debug!(graph = %self.id, timer = %timer.id(), "timer added");
        self.timers.push(timer);
        Ok(())
    }

    /// Wires output `source_port` of `source` to input `target_port` of
    /// `target`, both carrying `T`.
    ///
    /// Nothing is changed when this fails.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - either node doesn't exist
    /// - either port index is out of range
    /// - either port's payload type isn't `T`
    /// - the output or the input is already wired
    /// - the graph has started
    pub fn connect<T: Send + 'static>(
        &mut self,
        source: &str,
        source_port: usize,
        target: &str,
        target_port: usize,
    ) -> Result<(), GraphError> {
        self.ensure_assembling()?;
        let source_index = self.lookup(source)?;
        let target_index = self.lookup(target)?;

        {
            let source_node = self.assembling_node(source_index)?;
            let target_node = self.assembling_node(target_index)?;

            let output = source_node.ports().output(source_port).ok_or_else(|| {
                Report::new(GraphError::OutputOutOfRange {
                    node: source.to_string(),
                    port: source_port,
                    outs: source_node.ports().outs(),
                })
            })?;
            let input = target_node.ports().input(target_port).ok_or_else(|| {
                Report::new(GraphError::InputOutOfRange {
                    node: target.to_string(),
                    port: target_port,
                    ins: target_node.ports().ins(),
                })
            })?;

            let producer = output.as_any().downcast_ref::<Producer<T>>().ok_or_else(|| {
                Report::new(GraphError::TypeMismatch {
                    node: source.to_string(),
                    port: source_port,
                    expected: type_name::<T>(),
                    actual: output.payload_type(),
                })
            })?;
            let consumer = input.as_any().downcast_ref::<Consumer<T>>().ok_or_else(|| {
                Report::new(GraphError::TypeMismatch {
                    node: target.to_string(),
                    port: target_port,
                    expected: type_name::<T>(),
                    actual: input.payload_type(),
                })
            })?;

            match wire(producer, consumer) {
                Wiring::Wired => {}
                Wiring::OutputTaken => {
                    return Err(Report::new(GraphError::OutputAlreadyConnected {
                        node: source.to_string(),
                        port: source_port,
                    }));
                }
                Wiring::InputTaken => {
                    return Err(Report::new(GraphError::InputAlreadyConnected {
                        node: target.to_string(),
                        port: target_port,
                    }));
                }
            }
        }

        self.topology.add_edge(
            source_index,
            target_index,
            Edge::new(source_port, target_port, type_name::<T>()),
        );
        debug!(
            graph = %self.id,
            source,
            source_port,
            target,
            target_port,
            payload = type_name::<T>(),
            "edge connected"
        );
        Ok(())
    }

    /// Starts one worker per node and one driver per registered timer.
    ///
    /// Must be called from within a tokio runtime. Unconnected ports are
    /// logged but do not prevent starting.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::AlreadyStarted` on a second call, or
    /// `GraphError::NoRuntime` outside a runtime.
    #[instrument(skip(self), fields(graph = %self.id))]
    pub fn start(&mut self) -> Result<(), GraphError> {
        if !matches!(self.phase, Phase::Assembling) {
            return Err(Report::new(GraphError::AlreadyStarted));
        }
        let runtime = Handle::try_current().map_err(|_| Report::new(GraphError::NoRuntime))?;
        self.audit_ports();

        let cancel = CancellationToken::new();

        let timers = self
            .timers
            .iter()
            .map(|timer| {
                let timer = timer.clone();
                let name = timer.id().to_string();
                let handle = runtime.spawn(async move {
                    if let Err(report) = timer.run().await {
                        warn!(error = %report, "registered timer not driven by graph");
                    }
                    Exit::Returned
                });
                Worker { name, handle }
            })
            .collect::<Vec<_>>();

        let mut workers = Vec::with_capacity(self.topology.node_count());
        for entry in self.topology.node_weights_mut() {
            let Some(node) = entry.node.take() else {
                continue;
            };
            let ctx = NodeContext::new(
                entry.name.clone(),
                cancel.child_token(),
                self.config.fault_policy,
            );
            let state = entry.state.clone();
            state.advance(NodeState::Running);

            let span = info_span!("node", graph = %self.id, node = %entry.name);
            let handle = runtime.spawn(supervise(node, ctx, state).instrument(span));
            workers.push(Worker {
                name: entry.name.clone(),
                handle,
            });
        }

        info!(nodes = workers.len(), timers = timers.len(), "graph started");
        self.phase = Phase::Running(Running {
            cancel,
            workers,
            timers,
        });
        Ok(())
    }

    /// Signals every worker and timer to stop and waits for all of them.
    ///
    /// Blocked workers are woken by cancellation. Packets still queued are
    /// discarded. Workers that panicked are marked `Failed`.
    ///
    /// # Errors
    ///
    /// - `ExecutionError::NotRunning` if the graph is not running
    /// - `ExecutionError::ShutdownTimeout` if a worker outlives the grace
    ///   period; every remaining worker is then aborted
    /// - `ExecutionError::NodesPanicked` once all workers have been joined,
    ///   if any of them panicked
    #[instrument(skip(self), fields(graph = %self.id))]
    pub async fn stop(&mut self) -> Result<(), ExecutionError> {
        if !matches!(self.phase, Phase::Running(_)) {
            return Err(Report::new(ExecutionError::NotRunning));
        }
        let Phase::Running(running) = std::mem::replace(&mut self.phase, Phase::Stopped) else {
            return Err(Report::new(ExecutionError::NotRunning));
        };

        for entry in self.topology.node_weights() {
            entry.state.advance(NodeState::Stopping);
        }
        running.cancel.cancel();
        for timer in &self.timers {
            timer.stop();
        }

        let grace = self.config.shutdown_grace();
        let deadline = Instant::now() + grace;
        let mut panicked = Vec::new();
        let mut pending = running.workers.into_iter().chain(running.timers);

        while let Some(mut worker) = pending.next() {
            match tokio::time::timeout_at(deadline, &mut worker.handle).await {
                Ok(Ok(Exit::Returned)) => {}
                Ok(Ok(Exit::Panicked)) => panicked.push(worker.name),
                Ok(Err(join_error)) => {
                    error!(node = %worker.name, error = %join_error, "worker panicked");
                    self.mark_failed(&worker.name);
                    panicked.push(worker.name);
                }
                Err(_) => {
                    error!(node = %worker.name, ?grace, "worker outlived shutdown grace; aborting");
                    worker.handle.abort();
                    self.mark_failed(&worker.name);
                    for rest in pending {
                        rest.handle.abort();
                        self.mark_failed(&rest.name);
                    }
                    return Err(Report::new(ExecutionError::ShutdownTimeout {
                        node: worker.name,
                        grace,
                    }));
                }
            }
        }

        info!("graph stopped");
        if panicked.is_empty() {
            Ok(())
        } else {
            Err(Report::new(ExecutionError::NodesPanicked { nodes: panicked }))
        }
    }

    /// Whether the graph has been started and not yet stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running(_))
    }

    /// The lifecycle state of the named node.
    #[must_use]
    pub fn node_state(&self, name: &str) -> Option<NodeState> {
        let index = self.index.get(name)?;
        Some(self.topology[*index].state.get())
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.topology.node_count()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.topology.edge_count()
    }

    /// Nodes with no wired inputs, typically sources.
    pub fn entry_nodes(&self) -> Vec<&str> {
        self.names_without(Direction::Incoming)
    }

    /// Nodes with no wired outputs, typically sinks.
    pub fn terminal_nodes(&self) -> Vec<&str> {
        self.names_without(Direction::Outgoing)
    }

    /// Downstream neighbours of a node, with the connecting edge.
    pub fn successors(&self, name: &str) -> Vec<(&str, &Edge)> {
        self.neighbours(name, Direction::Outgoing)
    }

    /// Upstream neighbours of a node, with the connecting edge.
    pub fn predecessors(&self, name: &str) -> Vec<(&str, &Edge)> {
        self.neighbours(name, Direction::Incoming)
    }

    /// A serializable snapshot of nodes, states and edges.
    #[must_use]
    pub fn topology(&self) -> Topology {
        let nodes = self
            .topology
            .node_weights()
            .map(|entry| NodeInfo {
                name: entry.name.clone(),
                ins: entry.ins,
                outs: entry.outs,
                state: entry.state.get(),
            })
            .collect();
        let edges = self
            .topology
            .edge_references()
            .map(|edge| {
                EdgeRef::new(
                    self.topology[edge.source()].name.as_str(),
                    self.topology[edge.target()].name.as_str(),
                    edge.weight(),
                )
            })
            .collect();

        Topology {
            graph: self.id,
            nodes,
            edges,
        }
    }

    fn ensure_assembling(&self) -> Result<(), GraphError> {
        match self.phase {
            Phase::Assembling => Ok(()),
            Phase::Running(_) | Phase::Stopped => Err(Report::new(GraphError::Frozen)),
        }
    }

    fn lookup(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.index.get(name).copied().ok_or_else(|| {
            Report::new(GraphError::NodeNotFound {
                name: name.to_string(),
            })
        })
    }

    fn assembling_node(&self, index: NodeIndex) -> Result<&dyn Node, GraphError> {
        self.topology[index]
            .node
            .as_deref()
            .ok_or_else(|| Report::new(GraphError::Frozen))
    }

    fn audit_ports(&self) {
        for entry in self.topology.node_weights() {
            let Some(node) = entry.node.as_deref() else {
                continue;
            };
            let ports = node.ports();
            for input in (0..entry.ins).filter_map(|i| ports.input(i)) {
                if !input.is_connected() {
                    warn!(node = %entry.name, input = input.index(), "input is not connected");
                }
            }
            for output in (0..entry.outs).filter_map(|i| ports.output(i)) {
                if !output.is_connected() {
                    warn!(node = %entry.name, output = output.index(), "output is not connected");
                }
            }
        }
    }

    fn mark_failed(&self, name: &str) {
        if let Some(index) = self.index.get(name) {
            self.topology[*index].state.advance(NodeState::Failed);
        }
    }

    fn names_without(&self, direction: Direction) -> Vec<&str> {
        self.topology
            .node_indices()
            .filter(|&idx| self.topology.edges_directed(idx, direction).next().is_none())
            .map(|idx| self.topology[idx].name.as_str())
            .collect()
    }

    fn neighbours(&self, name: &str, direction: Direction) -> Vec<(&str, &Edge)> {
        let Some(&index) = self.index.get(name) else {
            return Vec::new();
        };

        self.topology
            .edges_directed(index, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (self.topology[other].name.as_str(), edge.weight())
            })
            .collect()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        if let Phase::Running(running) = &self.phase {
            running.cancel.cancel();
            for timer in &self.timers {
                timer.stop();
            }
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .field("timers", &self.timers.len())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Runs one node to completion and records how it ended.
///
/// A panic is caught here so the node is marked `Failed` as soon as it
/// happens, not when the graph is stopped.
async fn supervise(mut node: Box<dyn Node>, ctx: NodeContext, state: StateCell) -> Exit {
    let result = AssertUnwindSafe(node.run(&ctx)).catch_unwind().await;
    let discarded = node.ports().queued();
    match result {
        Ok(Ok(())) => {
            state.advance(NodeState::Stopped);
            debug!(discarded, "node stopped");
            Exit::Returned
        }
        Ok(Err(report)) => {
            state.advance(NodeState::Failed);
            error!(discarded, error = %report, "node failed");
            Exit::Returned
        }
        Err(panic) => {
            state.advance(NodeState::Failed);
            error!(discarded, panic = panic_message(panic.as_ref()), "node panicked");
            Exit::Panicked
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Serializable snapshot of a graph.
#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    /// The graph's identifier.
    pub graph: GraphId,
    /// Registered nodes.
    pub nodes: Vec<NodeInfo>,
    /// Wired edges.
    pub edges: Vec<EdgeRef>,
}

/// One node in a [`Topology`].
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    /// Registered name.
    pub name: String,
    /// Declared input count.
    pub ins: usize,
    /// Declared output count.
    pub outs: usize,
    /// Lifecycle state at snapshot time.
    pub state: NodeState,
}
