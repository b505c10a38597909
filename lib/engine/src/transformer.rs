//! Port-set roles.
//!
//! Nodes compose one of these instead of inheriting from a base class:
//! - [`Inputs`]: N typed inputs (sinks)
//! - [`Outputs`]: M typed outputs (sources)
//! - [`Transformer`]: both, for nodes that consume and produce

use crate::activation::Activation;
use crate::error::PortError;
use crate::node::PortSet;
use crate::packet::Packet;
use crate::port::{Consumer, Port, Producer};
use rootcause::Report;
use std::sync::Arc;
use weft_core::Result;

/// A node's typed inputs and their shared wakeup signal.
#[derive(Debug)]
pub struct Inputs<In> {
    activation: Arc<Activation>,
    consumers: Vec<Consumer<In>>,
}

impl<In: Send + 'static> Inputs<In> {
    /// Creates `ins` inputs, indexed from zero.
    #[must_use]
    pub fn new(ins: usize) -> Self {
        let activation = Arc::new(Activation::new(ins));
        let consumers = (0..ins)
            .map(|index| Consumer::new(index, Arc::clone(&activation)))
            .collect();
        Self {
            activation,
            consumers,
        }
    }

    /// Input count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    /// Whether there are no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Input `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Consumer<In>> {
        self.consumers.get(index)
    }

    /// Peeks every input in port order; true only if none is empty.
    #[must_use]
    pub fn all_ready(&self) -> bool {
        self.consumers.iter().all(Consumer::peek)
    }

    /// Pops one packet from every input, in port order.
    ///
    /// All inputs are checked before anything is removed, so on error no
    /// packet has been consumed.
    ///
    /// # Errors
    ///
    /// Returns `PortError::Empty` for the first empty input.
    pub fn pop_all(&self) -> Result<Vec<Packet<In>>, PortError> {
        if let Some(empty) = self.consumers.iter().find(|c| !c.peek()) {
            return Err(Report::new(PortError::Empty {
                port: empty.index(),
            }));
        }
        self.consumers.iter().map(Consumer::pop).collect()
    }

    /// Pops one packet from input `index`.
    ///
    /// # Errors
    ///
    /// Returns `PortError::OutOfRange` or `PortError::Empty`.
    pub fn pop(&self, index: usize) -> Result<Packet<In>, PortError> {
        self.get(index)
            .ok_or_else(|| {
                Report::new(PortError::OutOfRange {
                    port: index,
                    len: self.len(),
                })
            })?
            .pop()
    }

    fn port(&self, index: usize) -> Option<&dyn Port> {
        self.consumers.get(index).map(|c| c as &dyn Port)
    }

    fn backlog(&self) -> usize {
        self.consumers.iter().map(Consumer::len).sum()
    }
}

/// A node's typed outputs.
#[derive(Debug)]
pub struct Outputs<Out> {
    producers: Vec<Producer<Out>>,
}

impl<Out: Send + 'static> Outputs<Out> {
    /// Creates `outs` outputs, indexed from zero.
    #[must_use]
    pub fn new(outs: usize) -> Self {
        Self {
            producers: (0..outs).map(Producer::new).collect(),
        }
    }

    /// Output count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Whether there are no outputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    /// Output `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Producer<Out>> {
        self.producers.get(index)
    }

    /// Pushes `packet` through output `index`.
    ///
    /// # Errors
    ///
    /// Returns `PortError::OutOfRange` or `PortError::Unconnected`.
    pub fn push(&self, index: usize, packet: Packet<Out>) -> Result<(), PortError> {
        self.get(index)
            .ok_or_else(|| {
                Report::new(PortError::OutOfRange {
                    port: index,
                    len: self.len(),
                })
            })?
            .push(packet)
    }

    fn port(&self, index: usize) -> Option<&dyn Port> {
        self.producers.get(index).map(|p| p as &dyn Port)
    }
}

impl<In: Send + 'static> PortSet for Inputs<In> {
    fn ins(&self) -> usize {
        self.len()
    }

    fn outs(&self) -> usize {
        0
    }

    fn input(&self, index: usize) -> Option<&dyn Port> {
        self.port(index)
    }

    fn output(&self, _index: usize) -> Option<&dyn Port> {
        None
    }

    fn activation(&self) -> Option<&Arc<Activation>> {
        Some(&self.activation)
    }

    fn queued(&self) -> usize {
        self.backlog()
    }
}

impl<Out: Send + 'static> PortSet for Outputs<Out> {
    fn ins(&self) -> usize {
        0
    }

    fn outs(&self) -> usize {
        self.len()
    }

    fn input(&self, _index: usize) -> Option<&dyn Port> {
        None
    }

    fn output(&self, index: usize) -> Option<&dyn Port> {
        self.port(index)
    }

    fn activation(&self) -> Option<&Arc<Activation>> {
        None
    }

    fn queued(&self) -> usize {
        0
    }
}

/// N `In`-typed inputs plus M `Out`-typed outputs.
#[derive(Debug)]
pub struct Transformer<In, Out> {
    inputs: Inputs<In>,
    outputs: Outputs<Out>,
}

impl<In: Send + 'static, Out: Send + 'static> Transformer<In, Out> {
    /// Creates a transformer with `ins` inputs and `outs` outputs.
    #[must_use]
    pub fn new(ins: usize, outs: usize) -> Self {
        Self {
            inputs: Inputs::new(ins),
            outputs: Outputs::new(outs),
        }
    }

    /// The input side.
    #[must_use]
    pub fn inputs(&self) -> &Inputs<In> {
        &self.inputs
    }

    /// The output side.
    #[must_use]
    pub fn outputs(&self) -> &Outputs<Out> {
        &self.outputs
    }
}

impl<In: Send + 'static, Out: Send + 'static> PortSet for Transformer<In, Out> {
    fn ins(&self) -> usize {
        self.inputs.len()
    }

    fn outs(&self) -> usize {
        self.outputs.len()
    }

    fn input(&self, index: usize) -> Option<&dyn Port> {
        self.inputs.port(index)
    }

    fn output(&self, index: usize) -> Option<&dyn Port> {
        self.outputs.port(index)
    }

    fn activation(&self) -> Option<&Arc<Activation>> {
        (!self.inputs.is_empty()).then_some(&self.inputs.activation)
    }

    fn queued(&self) -> usize {
        self.inputs.backlog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::wire;

    fn feed(inputs: &Inputs<i32>, index: usize, value: i32) {
        let producer = Producer::new(0);
        wire(&producer, inputs.get(index).expect("input"));
        producer.push(Packet::new(value)).expect("push");
    }

    #[test]
    fn pop_all_waits_for_every_input() {
        let inputs = Inputs::<i32>::new(3);
        feed(&inputs, 0, 3);
        feed(&inputs, 2, 5);

        assert!(!inputs.all_ready());
        let err = inputs.pop_all().unwrap_err();
        assert_eq!(err.current_context(), &PortError::Empty { port: 1 });
        assert_eq!(inputs.backlog(), 2);
    }

    #[test]
    fn pop_all_returns_port_order() {
        let inputs = Inputs::<i32>::new(3);
        feed(&inputs, 2, 5);
        feed(&inputs, 0, 3);
        feed(&inputs, 1, 4);

        assert!(inputs.all_ready());
        let values: Vec<i32> = inputs
            .pop_all()
            .expect("pop_all")
            .into_iter()
            .map(Packet::into_inner)
            .collect();
        assert_eq!(values, vec![3, 4, 5]);
        assert_eq!(inputs.backlog(), 0);
    }

    #[test]
    fn arity_is_fixed_by_construction() {
        let transformer = Transformer::<i32, String>::new(2, 1);
        assert_eq!(transformer.ins(), 2);
        assert_eq!(transformer.outs(), 1);
        assert!(transformer.input(2).is_none());
        assert!(transformer.output(1).is_none());
        assert_eq!(transformer.output(0).map(|port| port.payload_type()), Some("alloc::string::String"));
    }

    #[test]
    fn push_out_of_range() {
        let outputs = Outputs::<i32>::new(1);
        let err = outputs.push(4, Packet::new(1)).unwrap_err();
        assert_eq!(err.current_context(), &PortError::OutOfRange { port: 4, len: 1 });
    }

    #[test]
    fn sources_have_no_activation() {
        let outputs = Outputs::<i32>::new(1);
        assert!(PortSet::activation(&outputs).is_none());
        let transformer = Transformer::<(), i32>::new(0, 1);
        assert!(transformer.activation().is_none());
    }
}
