//! Sinks: nodes with one input and no outputs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::{self, Display};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use weft_core::Result;
use weft_engine::{Inputs, Node, PortSet};

/// Writes every payload it receives as one line of text.
///
/// Writes are blocking `std::io` calls made on the node's worker task, so a
/// slow writer stalls the runtime thread it runs on. Standard output and
/// in-memory buffers are fine; wrap anything slower in a channel first.
pub struct TextSink<T> {
    inputs: Inputs<T>,
    out: Box<dyn Write + Send>,
}

impl<T: Display + Send + 'static> TextSink<T> {
    /// Creates a sink writing to `out`.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            inputs: Inputs::new(1),
            out: Box::new(out),
        }
    }

    /// Creates a sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

#[async_trait]
impl<T: Display + Send + 'static> Node for TextSink<T> {
    fn ports(&self) -> &dyn PortSet {
        &self.inputs
    }

    async fn ready(&mut self, input: usize) -> Result<()> {
        while self.inputs.get(input).is_some_and(|port| port.peek()) {
            let packet = self.inputs.pop(input)?;
            writeln!(self.out, "{}", packet.data())?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<T> fmt::Debug for TextSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSink").finish_non_exhaustive()
    }
}

/// An in-memory `Write` target that can be read while a sink holds a clone.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Forwards every payload it receives to an unbounded channel.
#[derive(Debug)]
pub struct Collector<T> {
    inputs: Inputs<T>,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Collector<T> {
    /// Creates a collector and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                inputs: Inputs::new(1),
                tx,
            },
            rx,
        )
    }
}

#[async_trait]
impl<T: Send + 'static> Node for Collector<T> {
    fn ports(&self) -> &dyn PortSet {
        &self.inputs
    }

    async fn ready(&mut self, input: usize) -> Result<()> {
        while self.inputs.get(input).is_some_and(|port| port.peek()) {
            let packet = self.inputs.pop(input)?;
            if self.tx.send(packet.into_inner()).is_err() {
                debug!("collector receiver dropped; discarding");
            }
        }
        Ok(())
    }
}
