//! Timer-paced source.

use async_trait::async_trait;
use std::fmt;
use tracing::trace;
use weft_core::Result;
use weft_engine::{Node, NodeContext, Outputs, Packet, PeriodicTimer, PortSet, Tick};

/// A source that calls `produce` on every tick of `timer` and pushes the
/// result on its single output.
///
/// Several generators may share one timer; each waits for the tick on its
/// own worker.
pub struct Generator<T, F> {
    outputs: Outputs<T>,
    timer: PeriodicTimer,
    produce: F,
}

impl<T, F> Generator<T, F>
where
    T: Send + 'static,
    F: FnMut() -> T + Send + 'static,
{
    /// Creates a generator with one output.
    #[must_use]
    pub fn new(timer: PeriodicTimer, produce: F) -> Self {
        Self {
            outputs: Outputs::new(1),
            timer,
            produce,
        }
    }

    /// The timer pacing this generator.
    #[must_use]
    pub fn timer(&self) -> &PeriodicTimer {
        &self.timer
    }
}

#[async_trait]
impl<T, F> Node for Generator<T, F>
where
    T: Send + 'static,
    F: FnMut() -> T + Send + 'static,
{
    fn ports(&self) -> &dyn PortSet {
        &self.outputs
    }

    async fn ready(&mut self, _input: usize) -> Result<()> {
        Ok(())
    }

    async fn run(&mut self, ctx: &NodeContext) -> Result<()> {
        loop {
            let tick = tokio::select! {
                biased;
                () = ctx.cancelled() => return Ok(()),
                tick = self.timer.wait() => tick,
            };

            match tick {
                Tick::Fired(n) => {
                    trace!(node = ctx.name(), tick = n, "generating");
                    let value = (self.produce)();
                    self.outputs.push(0, Packet::new(value))?;
                }
                // No more ticks will come; idle until the graph stops us.
                Tick::Stopped => {
                    ctx.cancelled().await;
                    return Ok(());
                }
            }
        }
    }
}

impl<T, F> fmt::Debug for Generator<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}
