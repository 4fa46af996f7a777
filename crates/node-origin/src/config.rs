//! Tracking configuration and the tracker that owns an optional table.

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, NodeId};
use crate::origin_report::{NodeOriginReport, emit_origin_report};
use crate::origin_scope::OriginScope;
use crate::origin_table::{NodeOriginError, NodeOriginTable, OriginTableContext};

/// Configuration controlling provenance tracking for one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginTrackingConfig {
    /// When false no table exists and every scope is a no-op.
    pub enabled: bool,
    /// Register the creation decorator on the graph at startup.
    pub install_decorator: bool,
    /// Whether renderers emit rows for nodes with unknown origin.
    pub include_unknown: bool,
    pub trace_id: String,
    pub decision_id: String,
    pub policy_id: String,
}

impl Default for OriginTrackingConfig {
    fn default() -> Self {
        let context = OriginTableContext::default();
        Self {
            enabled: true,
            install_decorator: true,
            include_unknown: true,
            trace_id: context.trace_id,
            decision_id: context.decision_id,
            policy_id: context.policy_id,
        }
    }
}

impl OriginTrackingConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn context(&self) -> OriginTableContext {
        OriginTableContext::new(
            self.trace_id.clone(),
            self.decision_id.clone(),
            self.policy_id.clone(),
        )
    }
}

/// Owns the table for one graph when tracking is enabled.
#[derive(Debug)]
pub struct OriginTracker {
    config: OriginTrackingConfig,
    table: Option<NodeOriginTable>,
}

impl OriginTracker {
    pub fn from_config(
        config: OriginTrackingConfig,
        graph: &mut Graph,
    ) -> Result<Self, NodeOriginError> {
        if !config.enabled {
            return Ok(Self {
                config,
                table: None,
            });
        }
        let mut table = NodeOriginTable::with_context(config.context());
        if config.install_decorator {
            table.add_decorator(graph)?;
        }
        Ok(Self {
            config,
            table: Some(table),
        })
    }

    pub fn config(&self) -> &OriginTrackingConfig {
        &self.config
    }

    pub fn table(&self) -> Option<&NodeOriginTable> {
        self.table.as_ref()
    }

    pub fn table_mut(&mut self) -> Option<&mut NodeOriginTable> {
        self.table.as_mut()
    }

    pub fn is_enabled(&self) -> bool {
        self.table.is_some()
    }

    pub fn scope(&self, reducer_name: &str, node: NodeId) -> OriginScope<'_> {
        OriginScope::enter(self.table(), reducer_name, node)
    }

    pub fn emit_report(&self, graph: &Graph) -> Option<NodeOriginReport> {
        self.table().map(|table| emit_origin_report(table, graph))
    }

    /// Remove the decorator from `graph`, which must be the graph it was
    /// installed on.
    pub fn detach(&mut self, graph: &mut Graph) -> Result<(), NodeOriginError> {
        match self.table.as_mut() {
            Some(table) => table.remove_decorator(graph),
            None => Ok(()),
        }
    }
}
