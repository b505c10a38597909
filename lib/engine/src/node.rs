//! The node interface.
//!
//! A node is stored by the graph behind this minimal, non-generic trait.
//! Its typed ports stay local to the node and are reached through
//! [`PortSet`] only for wiring and bookkeeping.
//!
//! The engine calls [`Node::ready`] with the index of an input that
//! received data. Several arrivals may be folded into one call, and a
//! call may find nothing new, so implementations must check their own
//! firing condition with `peek` before consuming anything.

use crate::activation::Activation;
use crate::config::FaultPolicy;
use crate::port::Port;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use weft_core::Result;

/// The ports of one node, fixed at construction.
pub trait PortSet: Send + Sync {
    /// Declared input count.
    fn ins(&self) -> usize;

    /// Declared output count.
    fn outs(&self) -> usize;

    /// Input `index`, if in range.
    fn input(&self, index: usize) -> Option<&dyn Port>;

    /// Output `index`, if in range.
    fn output(&self, index: usize) -> Option<&dyn Port>;

    /// The wakeup signal shared by the inputs. `None` for nodes without inputs.
    fn activation(&self) -> Option<&Arc<Activation>>;

    /// Packets still waiting across all inputs.
    fn queued(&self) -> usize;
}

/// What a worker knows about its own execution context.
#[derive(Debug, Clone)]
pub struct NodeContext {
    name: String,
    cancel: CancellationToken,
    fault_policy: FaultPolicy,
}

impl NodeContext {
    /// Creates a context; the graph does this for every worker it starts.
    #[must_use]
    pub fn new(name: impl Into<String>, cancel: CancellationToken, fault_policy: FaultPolicy) -> Self {
        Self {
            name: name.into(),
            cancel,
            fault_policy,
        }
    }

    /// The name the node was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether stop has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once stop has been signalled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// The graph's fault policy.
    #[must_use]
    pub fn fault_policy(&self) -> FaultPolicy {
        self.fault_policy
    }
}

/// A unit of execution in a graph.
#[async_trait]
pub trait Node: Send + 'static {
    /// This node's ports.
    fn ports(&self) -> &dyn PortSet;

    /// Activation hook, called when `input` may have new data.
    async fn ready(&mut self, input: usize) -> Result<()>;

    /// The worker body.
    ///
    /// The default waits for input activations and dispatches them to
    /// [`ready`](Self::ready) in input order until stop is signalled.
    /// Source nodes override this to wait on something else, typically a
    /// [`PeriodicTimer`](crate::timer::PeriodicTimer).
    async fn run(&mut self, ctx: &NodeContext) -> Result<()> {
        let Some(activation) = self.ports().activation().cloned() else {
            ctx.cancelled().await;
            return Ok(());
        };

        loop {
            tokio::select! {
                biased;
                () = ctx.cancelled() => return Ok(()),
                () = activation.notified() => {}
            }

            for input in activation.take_pending() {
                if ctx.is_cancelled() {
                    return Ok(());
                }
                if let Err(report) = self.ready(input).await {
                    match ctx.fault_policy() {
                        FaultPolicy::Isolate => return Err(report),
                        FaultPolicy::Ignore => {
                            warn!(node = ctx.name(), input, error = %report, "activation failed; continuing");
                        }
                    }
                }
            }
        }
    }
}
