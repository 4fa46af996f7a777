//! Replayable pipeline scripts.
//!
//! A script is a serde description of the provenance-relevant events of a
//! pipeline run: node creations, explicit origin changes, and nested reducer
//! scopes. Replaying it against a fresh graph reproduces the table exactly,
//! which is what the `node_origin_report` tool builds on.

use serde::{Deserialize, Serialize};

use crate::config::{OriginTracker, OriginTrackingConfig};
use crate::graph::{Graph, GraphError, NodeId};
use crate::node_origin::NodeOrigin;
use crate::origin_report::{NodeOriginReport, emit_origin_report};
use crate::origin_scope::OriginScope;
use crate::origin_table::{NodeOriginError, NodeOriginTable};

pub const UNKNOWN_NODE_CODE: &str = "NO-SCRIPT-0001";
pub const TRACKING_DISABLED_CODE: &str = "NO-SCRIPT-0002";
pub const GRAPH_FULL_CODE: &str = "NO-SCRIPT-0003";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    SetCurrent {
        reducer_name: String,
        created_from: i64,
    },
    CreateNode {
        opcode: String,
        #[serde(default)]
        inputs: Vec<u32>,
    },
    Scope {
        reducer_name: String,
        node: u32,
        #[serde(default)]
        steps: Vec<ScriptStep>,
    },
    SetOrigin {
        node: u32,
        reducer_name: String,
        created_from: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginScript {
    pub graph_name: String,
    #[serde(default)]
    pub config: Option<OriginTrackingConfig>,
    /// Upper bound on nodes the replay may create.
    #[serde(default)]
    pub node_capacity: Option<u32>,
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OriginScriptError {
    #[error("step {step} references node #{node} which does not exist")]
    UnknownNode { step: usize, node: u32 },
    #[error("origin tracking is disabled for graph `{graph}`")]
    TrackingDisabled { graph: String },
    #[error(transparent)]
    Table(#[from] NodeOriginError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl OriginScriptError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownNode { .. } => UNKNOWN_NODE_CODE,
            Self::TrackingDisabled { .. } => TRACKING_DISABLED_CODE,
            Self::Table(error) => error.error_code(),
            Self::Graph(_) => GRAPH_FULL_CODE,
        }
    }
}

#[derive(Debug)]
pub struct ReplayOutcome {
    pub graph: Graph,
    pub tracker: OriginTracker,
    pub report: NodeOriginReport,
}

/// Replay `script` on an empty graph and emit the resulting report.
pub fn replay_origin_script(script: &OriginScript) -> Result<ReplayOutcome, OriginScriptError> {
    let config = script.config.clone().unwrap_or_default();
    let mut graph = match script.node_capacity {
        Some(capacity) => Graph::with_node_capacity(script.graph_name.clone(), capacity),
        None => Graph::new(script.graph_name.clone()),
    };
    let tracker = OriginTracker::from_config(config, &mut graph)?;
    let Some(table) = tracker.table() else {
        return Err(OriginScriptError::TrackingDisabled {
            graph: script.graph_name.clone(),
        });
    };

    let mut step_index = 0usize;
    run_steps(table, &mut graph, &script.steps, &mut step_index)?;

    let report = emit_origin_report(table, &graph);
    Ok(ReplayOutcome {
        graph,
        tracker,
        report,
    })
}

fn run_steps(
    table: &NodeOriginTable,
    graph: &mut Graph,
    steps: &[ScriptStep],
    step_index: &mut usize,
) -> Result<(), OriginScriptError> {
    for step in steps {
        let index = *step_index;
        *step_index += 1;
        match step {
            ScriptStep::SetCurrent {
                reducer_name,
                created_from,
            } => {
                table.set_current_origin(NodeOrigin::from_raw(reducer_name.as_str(), *created_from));
            }
            ScriptStep::CreateNode { opcode, inputs } => {
                let inputs = inputs
                    .iter()
                    .map(|raw| existing_node(graph, index, *raw))
                    .collect::<Result<Vec<_>, _>>()?;
                graph.try_new_node(opcode.as_str(), &inputs)?;
            }
            ScriptStep::Scope {
                reducer_name,
                node,
                steps,
            } => {
                let node = existing_node(graph, index, *node)?;
                let _scope = OriginScope::enter(Some(table), reducer_name, node);
                run_steps(table, graph, steps, step_index)?;
            }
            ScriptStep::SetOrigin {
                node,
                reducer_name,
                created_from,
            } => {
                let node = existing_node(graph, index, *node)?;
                table.set_node_origin(node, NodeOrigin::from_raw(reducer_name.as_str(), *created_from));
            }
        }
    }
    Ok(())
}

fn existing_node(graph: &Graph, step: usize, raw: u32) -> Result<NodeId, OriginScriptError> {
    let id = NodeId::new(raw);
    if graph.contains(id) {
        Ok(id)
    } else {
        Err(OriginScriptError::UnknownNode { step, node: raw })
    }
}
