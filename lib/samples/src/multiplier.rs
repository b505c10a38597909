//! Barrier-join transformer rendering multiplication expressions.
//!
//! With inputs 3, 4 and 5 on ports 0, 1 and 2 the output is
//! `"3 * 4 * 5 = 60"`. Operands appear in port order.

use crate::error::ExpressionError;
use async_trait::async_trait;
use num_traits::CheckedMul;
use rootcause::Report;
use std::fmt::Display;
use weft_core::Result;
use weft_engine::{Node, Packet, PortSet, Transformer};

/// Waits for one packet on every input, multiplies them together and
/// emits the whole expression as a string.
///
/// A set of operands whose product overflows `T` is consumed without
/// output and reported as an activation error.
#[derive(Debug)]
pub struct Multiplier<T> {
    ports: Transformer<T, String>,
}

impl<T> Multiplier<T>
where
    T: Display + Clone + CheckedMul + Send + 'static,
{
    /// Creates a multiplier with `ins` inputs and one output.
    #[must_use]
    pub fn new(ins: usize) -> Self {
        Self {
            ports: Transformer::new(ins, 1),
        }
    }
}

/// Formats `terms` as `"a * b * c = p"`.
///
/// # Errors
///
/// Returns `ExpressionError::NoTerms` for an empty slice, or
/// `ExpressionError::Overflow` if the product does not fit `T`.
pub fn expression<T>(terms: &[T]) -> Result<String, ExpressionError>
where
    T: Display + Clone + CheckedMul,
{
    let (first, rest) = terms.split_first().ok_or(ExpressionError::NoTerms)?;
    let operands = terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" * ");

    let mut product = first.clone();
    for term in rest {
        product = product
            .checked_mul(term)
            .ok_or_else(|| {
                Report::new(ExpressionError::Overflow {
                    operands: operands.clone(),
                })
            })?;
    }

    Ok(format!("{operands} = {product}"))
}

#[async_trait]
impl<T> Node for Multiplier<T>
where
    T: Display + Clone + CheckedMul + Send + 'static,
{
    fn ports(&self) -> &dyn PortSet {
        &self.ports
    }

    async fn ready(&mut self, _input: usize) -> Result<()> {
        let mut failure = None;
        while self.ports.inputs().all_ready() {
            let terms: Vec<T> = self
                .ports
                .inputs()
                .pop_all()?
                .into_iter()
                .map(Packet::into_inner)
                .collect();
            match expression(&terms) {
                Ok(rendered) => self.ports.outputs().push(0, Packet::new(rendered))?,
                Err(report) => failure = Some(report),
            }
        }

        match failure {
            Some(report) => Err(report.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::Replay;
    use crate::sink::Collector;
    use std::time::Duration;
    use weft_engine::{FaultPolicy, Graph, GraphConfig, NodeState};

    async fn run_join(values: &[i32]) -> Vec<String> {
        let mut graph = Graph::new();
        let (collector, mut rx) = Collector::<String>::new();
        graph.add(Multiplier::<i32>::new(values.len()), "me1").expect("add");
        graph.add(collector, "o1").expect("add");
        graph.connect::<String>("me1", 0, "o1", 0).expect("connect");
        for (port, value) in values.iter().enumerate() {
            let name = format!("g{}", port + 1);
            graph.add(Replay::new([*value]), name.as_str()).expect("add");
            graph.connect::<i32>(&name, 0, "me1", port).expect("connect");
        }

        graph.start().expect("start");
        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("output in time")
            .expect("channel open");
        tokio::time::sleep(Duration::from_millis(20)).await;
        graph.stop().await.expect("stop");

        let mut outputs = vec![first];
        while let Ok(more) = rx.try_recv() {
            outputs.push(more);
        }
        outputs
    }

    #[tokio::test]
    async fn three_way_join_emits_once() {
        assert_eq!(run_join(&[3, 4, 5]).await, ["3 * 4 * 5 = 60"]);
    }

    #[tokio::test]
    async fn two_way_join() {
        assert_eq!(run_join(&[6, 7]).await, ["6 * 7 = 42"]);
    }

    #[test]
    fn expression_formats_in_order() {
        assert_eq!(expression(&[2_u64, 0, 9]).expect("fits"), "2 * 0 * 9 = 0");
        assert_eq!(expression(&[-3_i32, 4]).expect("fits"), "-3 * 4 = -12");
        assert_eq!(expression(&[7_u8]).expect("fits"), "7 = 7");
    }

    #[test]
    fn expression_rejects_empty_and_overflowing_terms() {
        let err = expression::<i32>(&[]).unwrap_err();
        assert_eq!(err.current_context(), &ExpressionError::NoTerms);

        let err = expression(&[100_i8, 2]).unwrap_err();
        assert_eq!(
            err.current_context(),
            &ExpressionError::Overflow {
                operands: "100 * 2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn overflowing_set_is_skipped_under_ignore_policy() {
        let mut graph = Graph::with_config(GraphConfig {
            fault_policy: FaultPolicy::Ignore,
            ..GraphConfig::default()
        });
        let (collector, mut rx) = Collector::<String>::new();
        graph.add(Multiplier::<i8>::new(2), "me1").expect("add");
        graph.add(Replay::new([100_i8, 3]), "g1").expect("add");
        graph.add(Replay::new([2_i8, 4]), "g2").expect("add");
        graph.add(collector, "o1").expect("add");
        graph.connect::<i8>("g1", 0, "me1", 0).expect("connect");
        graph.connect::<i8>("g2", 0, "me1", 1).expect("connect");
        graph.connect::<String>("me1", 0, "o1", 0).expect("connect");

        graph.start().expect("start");
        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("output in time");
        graph.stop().await.expect("stop");

        assert_eq!(first.as_deref(), Some("3 * 4 = 12"));
        assert_eq!(graph.node_state("me1"), Some(NodeState::Stopped));
    }

    #[tokio::test]
    async fn waits_for_every_input() {
        let mut graph = Graph::new();
        let (collector, mut rx) = Collector::<String>::new();
        graph.add(Multiplier::<i32>::new(2), "me1").expect("add");
        graph.add(Replay::new([1, 2, 3]), "g1").expect("add");
        graph.add(Replay::new([10]), "g2").expect("add");
        graph.add(collector, "o1").expect("add");
        graph.connect::<i32>("g1", 0, "me1", 0).expect("connect");
        graph.connect::<i32>("g2", 0, "me1", 1).expect("connect");
        graph.connect::<String>("me1", 0, "o1", 0).expect("connect");

        graph.start().expect("start");
        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("output in time");
        tokio::time::sleep(Duration::from_millis(20)).await;
        graph.stop().await.expect("stop");

        assert_eq!(first.as_deref(), Some("1 * 10 = 10"));
        assert!(rx.try_recv().is_err());
    }
}
