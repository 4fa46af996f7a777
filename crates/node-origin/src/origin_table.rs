//! Per-graph provenance table and the creation decorator that feeds it.
//!
//! The table maps node identities to [`NodeOrigin`] records and carries the
//! "current origin": the record attached to whatever node the graph creates
//! next. Reducers move the current origin with [`OriginScope`]; the installed
//! [`OriginDecorator`] copies it onto every new node.
//!
//! The table owns its state through `Rc<RefCell<..>>`, which keeps it
//! single-threaded (`!Send`); the decorator only holds a `Weak` handle, so a
//! dropped table stops stamping and the graph prunes its decorator. Each
//! compilation owns its own table.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::graph::{DecoratorId, Graph, GraphDecorator, GraphId, Node, NodeId};
use crate::node_aux_data::NodeAuxData;
use crate::node_origin::NodeOrigin;
use crate::origin_scope::OriginScope;

pub(crate) const COMPONENT: &str = "node_origin_table";
pub const DECORATOR_ALREADY_INSTALLED_CODE: &str = "NO-ORIGIN-0001";
pub const DECORATOR_GRAPH_MISMATCH_CODE: &str = "NO-ORIGIN-0002";

// ---------------------------------------------------------------------------
// Context and structured events
// ---------------------------------------------------------------------------

/// Correlation ids stamped onto every event the table emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginTableContext {
    pub trace_id: String,
    pub decision_id: String,
    pub policy_id: String,
}

impl OriginTableContext {
    pub fn new(
        trace_id: impl Into<String>,
        decision_id: impl Into<String>,
        policy_id: impl Into<String>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            decision_id: decision_id.into(),
            policy_id: policy_id.into(),
        }
    }
}

impl Default for OriginTableContext {
    fn default() -> Self {
        Self::new("trace-node-origin", "decision-node-origin", "policy-node-origin")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginTableEvent {
    pub trace_id: String,
    pub decision_id: String,
    pub policy_id: String,
    pub component: String,
    pub event: String,
    pub outcome: String,
    pub error_code: Option<String>,
}

impl OriginTableEvent {
    pub(crate) fn new(
        context: &OriginTableContext,
        event: &str,
        outcome: &str,
        error_code: Option<&str>,
    ) -> Self {
        Self {
            trace_id: context.trace_id.clone(),
            decision_id: context.decision_id.clone(),
            policy_id: context.policy_id.clone(),
            component: COMPONENT.to_string(),
            event: event.to_string(),
            outcome: outcome.to_string(),
            error_code: error_code.map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NodeOriginError {
    #[error("origin decorator already installed on graph `{graph}`")]
    DecoratorAlreadyInstalled { graph: String },
    #[error("origin decorator is installed on {installed}, not on graph `{graph}` ({requested})")]
    DecoratorGraphMismatch {
        graph: String,
        installed: GraphId,
        requested: GraphId,
    },
}

impl NodeOriginError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DecoratorAlreadyInstalled { .. } => DECORATOR_ALREADY_INSTALLED_CODE,
            Self::DecoratorGraphMismatch { .. } => DECORATOR_GRAPH_MISMATCH_CODE,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct OriginState {
    origins: NodeAuxData<NodeOrigin>,
    current_origin: NodeOrigin,
}

type SharedOriginState = Rc<RefCell<OriginState>>;

// ---------------------------------------------------------------------------
// Decorator
// ---------------------------------------------------------------------------

/// Stamps each newly created node with the table's current origin.
#[derive(Debug)]
pub struct OriginDecorator {
    state: Weak<RefCell<OriginState>>,
}

impl GraphDecorator for OriginDecorator {
    fn decorate(&mut self, node: &Node) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.borrow_mut();
        let origin = state.current_origin.clone();
        state.origins.set(node.id(), origin);
    }

    fn is_live(&self) -> bool {
        self.state.strong_count() > 0
    }
}

// ---------------------------------------------------------------------------
// NodeOriginTable
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct NodeOriginTable {
    state: SharedOriginState,
    decorator: Option<DecoratorId>,
    context: OriginTableContext,
    events: Vec<OriginTableEvent>,
}

impl NodeOriginTable {
    pub fn new() -> Self {
        Self::with_context(OriginTableContext::default())
    }

    pub fn with_context(context: OriginTableContext) -> Self {
        Self {
            state: Rc::new(RefCell::new(OriginState {
                origins: NodeAuxData::new(NodeOrigin::unknown()),
                current_origin: NodeOrigin::unknown(),
            })),
            decorator: None,
            context,
            events: Vec::new(),
        }
    }

    pub fn context(&self) -> &OriginTableContext {
        &self.context
    }

    /// Register the creation decorator on `graph`. At most one may be active
    /// per table; a second install is rejected and leaves the graph untouched.
    pub fn add_decorator(&mut self, graph: &mut Graph) -> Result<(), NodeOriginError> {
        if self.decorator.is_some() {
            self.events.push(OriginTableEvent::new(
                &self.context,
                "decorator_install_rejected",
                "fail",
                Some(DECORATOR_ALREADY_INSTALLED_CODE),
            ));
            return Err(NodeOriginError::DecoratorAlreadyInstalled {
                graph: graph.name().to_string(),
            });
        }
        let id = graph.add_decorator(Box::new(OriginDecorator {
            state: Rc::downgrade(&self.state),
        }));
        self.decorator = Some(id);
        self.events.push(OriginTableEvent::new(
            &self.context,
            "decorator_installed",
            "pass",
            None,
        ));
        Ok(())
    }

    /// Detach the decorator from `graph`. No-op when none is installed.
    ///
    /// `graph` must be the graph the decorator was installed on; any other
    /// graph is rejected and the installation is left in place.
    pub fn remove_decorator(&mut self, graph: &mut Graph) -> Result<(), NodeOriginError> {
        let Some(id) = self.decorator else {
            return Ok(());
        };
        if id.graph() != graph.id() {
            self.events.push(OriginTableEvent::new(
                &self.context,
                "decorator_remove_rejected",
                "fail",
                Some(DECORATOR_GRAPH_MISMATCH_CODE),
            ));
            return Err(NodeOriginError::DecoratorGraphMismatch {
                graph: graph.name().to_string(),
                installed: id.graph(),
                requested: graph.id(),
            });
        }
        graph.remove_decorator(id);
        self.decorator = None;
        self.events.push(OriginTableEvent::new(
            &self.context,
            "decorator_removed",
            "pass",
            None,
        ));
        Ok(())
    }

    pub fn has_decorator(&self) -> bool {
        self.decorator.is_some()
    }

    /// Graph the decorator is currently installed on, if any.
    pub fn decorated_graph(&self) -> Option<GraphId> {
        self.decorator.map(DecoratorId::graph)
    }

    pub fn get_node_origin(&self, node: NodeId) -> NodeOrigin {
        self.state.borrow().origins.get(node)
    }

    /// Last write wins; no history is kept.
    pub fn set_node_origin(&self, node: NodeId, origin: NodeOrigin) {
        self.state.borrow_mut().origins.set(node, origin);
    }

    pub fn current_origin(&self) -> NodeOrigin {
        self.state.borrow().current_origin.clone()
    }

    /// Replace the current origin without opening a scope, e.g. to attribute
    /// a batch of nodes to a fixed source position.
    pub fn set_current_origin(&self, origin: NodeOrigin) {
        self.state.borrow_mut().current_origin = origin;
    }

    /// Swap in `origin` as current and return the previous value.
    pub(crate) fn replace_current_origin(&self, origin: NodeOrigin) -> NodeOrigin {
        std::mem::replace(&mut self.state.borrow_mut().current_origin, origin)
    }

    pub fn is_stamped(&self, node: NodeId) -> bool {
        self.state.borrow().origins.is_set(node)
    }

    pub fn stamped_count(&self) -> usize {
        self.state.borrow().origins.set_count()
    }

    /// Stamped entries in ascending node order.
    pub fn stamped_origins(&self) -> Vec<(NodeId, NodeOrigin)> {
        self.state
            .borrow()
            .origins
            .iter_set()
            .map(|(id, origin)| (id, origin.clone()))
            .collect()
    }

    /// Open a scope attributing new nodes to `reducer_name` acting on `node`.
    pub fn scope(&self, reducer_name: &str, node: NodeId) -> OriginScope<'_> {
        OriginScope::enter(Some(self), reducer_name, node)
    }

    pub fn drain_events(&mut self) -> Vec<OriginTableEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

impl Default for NodeOriginTable {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
