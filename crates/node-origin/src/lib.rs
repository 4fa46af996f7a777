#![forbid(unsafe_code)]

//! Node provenance tracking for an optimizing compiler's IR graph.
//!
//! Records which reducer created each node and from which prior node it was
//! derived. Purely diagnostic: turning tracking off never changes the graph.

pub mod config;
pub mod graph;
pub mod node_aux_data;
pub mod node_origin;
pub mod origin_report;
pub mod origin_scope;
pub mod origin_script;
pub mod origin_table;
pub mod reducer;

pub use config::{OriginTracker, OriginTrackingConfig};
pub use graph::{
    DecoratorId, Graph, GraphDecorator, GraphError, GraphId, MAX_NODE_COUNT, Node, NodeId,
};
pub use node_origin::{NodeOrigin, UNKNOWN_CREATED_FROM};
pub use origin_report::{
    NodeOriginRecord, NodeOriginReport, emit_origin_report, render_origin_json_lines,
    render_origin_summary,
};
pub use origin_scope::{OriginScope, with_origin_scope};
pub use origin_table::{NodeOriginError, NodeOriginTable, OriginTableContext, OriginTableEvent};
