//! Edge types for dataflow graphs.
//!
//! An edge joins output `source_port` of one node to input `target_port`
//! of another. Both ports carry the same payload type, recorded here by
//! name for introspection.

use serde::Serialize;

/// The weight stored on each graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Output index on the source node.
    pub source_port: usize,
    /// Input index on the target node.
    pub target_port: usize,
    /// Payload type carried by the edge.
    pub payload_type: &'static str,
}

impl Edge {
    /// Creates an edge between two port indices.
    #[must_use]
    pub fn new(source_port: usize, target_port: usize, payload_type: &'static str) -> Self {
        Self {
            source_port,
            target_port,
            payload_type,
        }
    }
}

/// A fully-qualified edge, naming both endpoint nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRef {
    /// The source node name.
    pub source_node: String,
    /// The source output index.
    pub source_port: usize,
    /// The target node name.
    pub target_node: String,
    /// The target input index.
    pub target_port: usize,
    /// Payload type carried by the edge.
    pub payload_type: &'static str,
}

impl EdgeRef {
    /// Combines an edge weight with its endpoint names.
    #[must_use]
    pub fn new(source_node: impl Into<String>, target_node: impl Into<String>, edge: &Edge) -> Self {
        Self {
            source_node: source_node.into(),
            source_port: edge.source_port,
            target_node: target_node.into(),
            target_port: edge.target_port,
            payload_type: edge.payload_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_ref_copies_ports() {
        let edge = Edge::new(0, 2, "i32");
        let edge_ref = EdgeRef::new("g3", "me1", &edge);

        assert_eq!(edge_ref.source_node, "g3");
        assert_eq!(edge_ref.source_port, 0);
        assert_eq!(edge_ref.target_node, "me1");
        assert_eq!(edge_ref.target_port, 2);
        assert_eq!(edge_ref.payload_type, "i32");
    }

    #[test]
    fn edge_ref_serializes_flat() {
        let edge_ref = EdgeRef::new("me1", "o1", &Edge::new(0, 0, "alloc::string::String"));
        let json = serde_json::to_value(&edge_ref).expect("serialize");
        assert_eq!(json["source_node"], "me1");
        assert_eq!(json["payload_type"], "alloc::string::String");
    }
}
