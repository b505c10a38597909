//! Fixed-sequence source.

use async_trait::async_trait;
use tracing::debug;
use weft_core::Result;
use weft_engine::{Node, NodeContext, Outputs, Packet, PortSet};

/// A source that pushes a fixed sequence once, in order, as soon as the
/// graph starts, then idles until stopped.
#[derive(Debug)]
pub struct Replay<T> {
    outputs: Outputs<T>,
    values: Vec<T>,
}

impl<T: Send + 'static> Replay<T> {
    /// Creates a replay source with one output.
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            outputs: Outputs::new(1),
            values: values.into_iter().collect(),
        }
    }

    /// Values not yet pushed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

#[async_trait]
impl<T: Send + 'static> Node for Replay<T> {
    fn ports(&self) -> &dyn PortSet {
        &self.outputs
    }

    async fn ready(&mut self, _input: usize) -> Result<()> {
        Ok(())
    }

    async fn run(&mut self, ctx: &NodeContext) -> Result<()> {
        let count = self.values.len();
        for value in self.values.drain(..) {
            if ctx.is_cancelled() {
                return Ok(());
            }
            self.outputs.push(0, Packet::new(value))?;
        }
        debug!(node = ctx.name(), count, "replay finished");

        ctx.cancelled().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Collector;
    use weft_engine::{Graph, NodeState};

    #[tokio::test]
    async fn pushes_in_order() {
        let mut graph = Graph::new();
        let (collector, mut rx) = Collector::<&'static str>::new();
        graph.add(Replay::new(["a", "b", "c"]), "r").expect("add");
        graph.add(collector, "o1").expect("add");
        graph.connect::<&'static str>("r", 0, "o1", 0).expect("connect");

        graph.start().expect("start");
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(rx.recv().await.expect("value"));
        }
        graph.stop().await.expect("stop");

        assert_eq!(seen, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn unconnected_output_fails_the_node() {
        let mut graph = Graph::new();
        graph.add(Replay::new([1_u8]), "r").expect("add");

        graph.start().expect("start");
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while graph.node_state("r") != Some(NodeState::Failed) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("push on an unwired output fails");
        graph.stop().await.expect("stop");
    }

    #[test]
    fn counts_remaining_values() {
        let replay = Replay::new(0..4);
        assert_eq!(replay.remaining(), 4);
    }
}
