//! Typed ports.
//!
//! A `Consumer<T>` is a node input: it owns an unbounded FIFO of packets.
//! A `Producer<T>` is a node output: it holds at most one downstream
//! queue and pushes packets into it. Pushing is the only way a packet
//! crosses from one node's worker to another's.
//!
//! Both sides implement the type-erased [`Port`] trait so the graph can
//! store heterogeneous nodes and still check payload types at connect time.

use crate::activation::Activation;
use crate::error::PortError;
use crate::packet::Packet;
use parking_lot::Mutex;
use rootcause::Report;
use std::any::{Any, type_name};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use weft_core::Result;

/// Type-erased view of a port, used for wiring.
pub trait Port: Send + Sync + 'static {
    /// Zero-based index of this port on its node.
    fn index(&self) -> usize;

    /// Name of the payload type, for diagnostics.
    fn payload_type(&self) -> &'static str;

    /// Whether an edge has been wired to this port.
    fn is_connected(&self) -> bool;

    /// Access for downcasting to the concrete `Consumer<T>`/`Producer<T>`.
    fn as_any(&self) -> &dyn Any;
}

/// The queue behind a consumer, shared with the producer that feeds it.
struct Queue<T> {
    index: usize,
    packets: Mutex<VecDeque<Packet<T>>>,
    activation: Arc<Activation>,
    connected: AtomicBool,
}

impl<T> Queue<T> {
    fn enqueue(&self, packet: Packet<T>) {
        self.packets.lock().push_back(packet);
        self.activation.mark(self.index);
    }
}

/// A typed node input owning a FIFO of packets.
pub struct Consumer<T> {
    queue: Arc<Queue<T>>,
}

impl<T: Send + 'static> Consumer<T> {
    /// Creates input `index` of a node, ringing `activation` on arrival.
    #[must_use]
    pub fn new(index: usize, activation: Arc<Activation>) -> Self {
        Self {
            queue: Arc::new(Queue {
                index,
                packets: Mutex::new(VecDeque::new()),
                activation,
                connected: AtomicBool::new(false),
            }),
        }
    }

    /// Returns whether at least one packet is queued, without removing it.
    #[must_use]
    pub fn peek(&self) -> bool {
        !self.queue.packets.lock().is_empty()
    }

    /// Removes and returns the front packet.
    ///
    /// # Errors
    ///
    /// Returns `PortError::Empty` if nothing is queued. Callers are
    /// expected to guard with [`peek`](Self::peek).
    pub fn pop(&self) -> Result<Packet<T>, PortError> {
        self.queue.packets.lock().pop_front().ok_or_else(|| {
            Report::new(PortError::Empty {
                port: self.queue.index,
            })
        })
    }

    /// Number of packets currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.packets.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.peek()
    }

    /// Marks this input as wired. Returns false if it already was.
    fn claim(&self) -> bool {
        self.queue
            .connected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl<T: Send + 'static> Port for Consumer<T> {
    fn index(&self) -> usize {
        self.queue.index
    }

    fn payload_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn is_connected(&self) -> bool {
        self.queue.connected.load(Ordering::Acquire)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("index", &self.queue.index)
            .field("queued", &self.queue.packets.lock().len())
            .finish()
    }
}

/// A typed node output feeding at most one consumer.
pub struct Producer<T> {
    index: usize,
    downstream: OnceLock<Arc<Queue<T>>>,
}

impl<T: Send + 'static> Producer<T> {
    /// Creates output `index` of a node.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            downstream: OnceLock::new(),
        }
    }

    /// Moves `packet` into the downstream queue and wakes its node.
    ///
    /// # Errors
    ///
    /// Returns `PortError::Unconnected` if no edge has been wired to this
    /// output. The packet is dropped.
    pub fn push(&self, packet: Packet<T>) -> Result<(), PortError> {
        let Some(queue) = self.downstream.get() else {
            return Err(Report::new(PortError::Unconnected { port: self.index }));
        };
        queue.enqueue(packet);
        Ok(())
    }
}

impl<T: Send + 'static> Port for Producer<T> {
    fn index(&self) -> usize {
        self.index
    }

    fn payload_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn is_connected(&self) -> bool {
        self.downstream.get().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("index", &self.index)
            .field("connected", &self.downstream.get().is_some())
            .finish()
    }
}

/// Outcome of trying to wire a producer to a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wiring {
    Wired,
    OutputTaken,
    InputTaken,
}

/// Wires `producer` to `consumer`, leaving both untouched on conflict.
pub(crate) fn wire<T: Send + 'static>(producer: &Producer<T>, consumer: &Consumer<T>) -> Wiring {
    if producer.is_connected() {
        return Wiring::OutputTaken;
    }
    if !consumer.claim() {
        return Wiring::InputTaken;
    }
    if producer.downstream.set(Arc::clone(&consumer.queue)).is_err() {
        consumer.queue.connected.store(false, Ordering::Release);
        return Wiring::OutputTaken;
    }
    Wiring::Wired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Producer<i32>, Consumer<i32>, Arc<Activation>) {
        let activation = Arc::new(Activation::new(1));
        let consumer = Consumer::new(0, Arc::clone(&activation));
        let producer = Producer::new(0);
        assert_eq!(wire(&producer, &consumer), Wiring::Wired);
        (producer, consumer, activation)
    }

    #[test]
    fn delivers_in_push_order() {
        let (producer, consumer, _) = pair();
        for value in [5, 1, 4, 1, 3] {
            producer.push(Packet::new(value)).expect("push");
        }

        let mut seen = Vec::new();
        while consumer.peek() {
            seen.push(consumer.pop().expect("pop").into_inner());
        }
        assert_eq!(seen, vec![5, 1, 4, 1, 3]);
    }

    #[test]
    fn popped_packet_is_gone() {
        let (producer, consumer, _) = pair();
        producer.push(Packet::new(9)).expect("push");

        assert_eq!(consumer.len(), 1);
        assert_eq!(*consumer.pop().expect("pop").data(), 9);
        assert!(!consumer.peek());
        let err = consumer.pop().unwrap_err();
        assert_eq!(err.current_context(), &PortError::Empty { port: 0 });
    }

    #[test]
    fn push_marks_owning_input() {
        let (producer, _consumer, activation) = pair();
        producer.push(Packet::new(1)).expect("push");
        assert_eq!(activation.take_pending(), vec![0]);
    }

    #[test]
    fn unconnected_push_fails() {
        let producer = Producer::<String>::new(3);
        let err = producer.push(Packet::new("lost".to_string())).unwrap_err();
        assert_eq!(err.current_context(), &PortError::Unconnected { port: 3 });
    }

    #[test]
    fn second_wiring_is_rejected_both_ways() {
        let (producer, consumer, _) = pair();

        let other_input = Consumer::new(0, Arc::new(Activation::new(1)));
        assert_eq!(wire(&producer, &other_input), Wiring::OutputTaken);
        assert!(!other_input.is_connected());

        let other_output = Producer::new(0);
        assert_eq!(wire(&other_output, &consumer), Wiring::InputTaken);
        assert!(!other_output.is_connected());
    }

    #[test]
    fn erased_port_reports_payload_type() {
        let consumer = Consumer::<u64>::new(0, Arc::new(Activation::new(1)));
        let port: &dyn Port = &consumer;
        assert_eq!(port.payload_type(), "u64");
        assert!(port.as_any().downcast_ref::<Consumer<u64>>().is_some());
        assert!(port.as_any().downcast_ref::<Consumer<i64>>().is_none());
    }
}
