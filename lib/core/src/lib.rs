//! Foundational types shared by every weft crate.
//!
//! This crate carries the error alias used across the engine and the
//! strongly-typed identifiers that tag graphs and timers in log output.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{GraphId, ParseIdError, TimerId};
