//! Typed dataflow graphs for weft.
//!
//! A [`Graph`] holds named [`Node`]s whose typed output ports are wired to
//! typed input ports. Each edge is a FIFO queue of [`Packet`]s. Once
//! started, every node runs as its own tokio task and is woken whenever one
//! of its inputs receives data. [`PeriodicTimer`] gives source nodes a
//! shared clock.
//!
//! ```ignore
//! let mut graph = Graph::new();
//! graph.add(source, "g1")?;
//! graph.add(sink, "o1")?;
//! graph.connect::<i64>("g1", 0, "o1", 0)?;
//! graph.start()?;
//! // ...
//! graph.stop().await?;
//! ```

pub mod activation;
pub mod config;
pub mod edge;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod node;
pub mod packet;
pub mod port;
pub mod timer;
pub mod transformer;

pub use activation::Activation;
pub use config::{FaultPolicy, GraphConfig};
pub use edge::{Edge, EdgeRef};
pub use error::{ExecutionError, GraphError, PortError, TimerError};
pub use graph::{Graph, NodeInfo, Topology};
pub use lifecycle::NodeState;
pub use node::{Node, NodeContext, PortSet};
pub use packet::Packet;
pub use port::{Consumer, Port, Producer};
pub use timer::{PeriodicTimer, Tick};
pub use transformer::{Inputs, Outputs, Transformer};
