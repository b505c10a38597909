//! Ready-made nodes for weft graphs.
//!
//! Everything here is built only on the public `weft-engine` contract:
//!
//! - **Sources**: [`Generator`] (timer-paced) and [`Replay`] (fixed sequence)
//! - **Sinks**: [`TextSink`] (line-per-packet text output) and [`Collector`]
//!   (forwards payloads to a channel)
//! - **Transformers**: [`Multiplier`] (barrier join rendering a
//!   multiplication expression)

pub mod error;
pub mod generator;
pub mod multiplier;
pub mod replay;
pub mod sink;

pub use error::ExpressionError;
pub use generator::Generator;
pub use multiplier::Multiplier;
pub use replay::Replay;
pub use sink::{Collector, SharedBuffer, TextSink};
