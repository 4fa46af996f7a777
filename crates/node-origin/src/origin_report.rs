//! Deterministic node-to-origin dump for visualizers and cross-version diffs.
//!
//! One record per node the graph knows about, ascending by node id, whether
//! or not the node was ever stamped. Nothing here reads the clock or iterates
//! a hash map, so two emissions over the same state are byte-identical.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::graph::Graph;
use crate::origin_table::{NodeOriginTable, OriginTableEvent};

pub const ORIGIN_REPORT_SCHEMA_VERSION: &str = "node-origin.report.v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOriginRecord {
    pub node_id: u32,
    pub opcode: String,
    pub reducer_name: String,
    pub created_from: i64,
    pub is_known: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOriginReport {
    pub schema_version: String,
    pub graph_name: String,
    pub node_count: u64,
    pub known_count: u64,
    pub unknown_count: u64,
    /// Known nodes per reducer name.
    pub reducer_counts: BTreeMap<String, u64>,
    pub records: Vec<NodeOriginRecord>,
    pub records_digest: String,
    pub logs: Vec<OriginTableEvent>,
}

/// Walk every node of `graph` and pair it with its recorded origin.
pub fn emit_origin_report(table: &NodeOriginTable, graph: &Graph) -> NodeOriginReport {
    let records = graph
        .nodes()
        .iter()
        .map(|node| {
            let origin = table.get_node_origin(node.id());
            NodeOriginRecord {
                node_id: node.id().as_u32(),
                opcode: node.opcode().to_string(),
                reducer_name: origin.reducer_name().to_string(),
                created_from: origin.created_from(),
                is_known: origin.is_known(),
            }
        })
        .collect::<Vec<_>>();

    let mut reducer_counts = BTreeMap::<String, u64>::new();
    for record in records.iter().filter(|record| record.is_known) {
        *reducer_counts.entry(record.reducer_name.clone()).or_default() += 1;
    }
    let known_count = records.iter().filter(|record| record.is_known).count() as u64;
    let node_count = records.len() as u64;

    NodeOriginReport {
        schema_version: ORIGIN_REPORT_SCHEMA_VERSION.to_string(),
        graph_name: graph.name().to_string(),
        node_count,
        known_count,
        unknown_count: node_count - known_count,
        reducer_counts,
        records_digest: records_digest(&records),
        records,
        logs: vec![OriginTableEvent::new(
            table.context(),
            "origin_report_emitted",
            "pass",
            None,
        )],
    }
}

fn records_digest(records: &[NodeOriginRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.node_id.to_be_bytes());
        hasher.update(record.opcode.as_bytes());
        hasher.update(b"|");
        hasher.update(record.reducer_name.as_bytes());
        hasher.update(b"|");
        hasher.update(record.created_from.to_be_bytes());
        hasher.update([u8::from(record.is_known)]);
    }
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Line-oriented text rendering. `include_unknown = false` omits rows for
/// nodes without a known origin; the header counts always cover every node.
pub fn render_origin_summary(report: &NodeOriginReport, include_unknown: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!("graph: {}", report.graph_name));
    lines.push(format!(
        "nodes: {} known: {} unknown: {}",
        report.node_count, report.known_count, report.unknown_count
    ));
    lines.push(format!("reducers: {}", report.reducer_counts.len()));
    for (reducer, count) in &report.reducer_counts {
        lines.push(format!("  - {reducer} nodes={count}"));
    }
    lines.push(format!("digest: {}", report.records_digest));
    for record in report
        .records
        .iter()
        .filter(|record| include_unknown || record.is_known)
    {
        if record.is_known {
            lines.push(format!(
                "#{} {} <- {} from #{}",
                record.node_id, record.opcode, record.reducer_name, record.created_from
            ));
        } else {
            lines.push(format!("#{} {} <- unknown", record.node_id, record.opcode));
        }
    }
    lines.join("\n")
}

/// One JSON object per node, newline separated.
pub fn render_origin_json_lines(
    report: &NodeOriginReport,
    include_unknown: bool,
) -> Result<String, serde_json::Error> {
    let mut lines = Vec::with_capacity(report.records.len());
    for record in report
        .records
        .iter()
        .filter(|record| include_unknown || record.is_known)
    {
        lines.push(serde_json::to_string(record)?);
    }
    Ok(lines.join("\n"))
}
