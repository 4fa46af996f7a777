//! Reducer driver that attributes every node a reducer creates.
//!
//! Each `Reducer::reduce` call runs inside an [`OriginScope`] for the
//! reducer's name and the node being reduced, so the creation decorator stamps
//! new nodes without the reducer doing anything itself.

use std::collections::BTreeMap;

use crate::graph::{Graph, NodeId};
use crate::origin_scope::OriginScope;
use crate::origin_table::NodeOriginTable;

pub const DEFAULT_MAX_ROUNDS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    NoChange,
    /// Node was updated in place.
    Changed,
    /// Node should be replaced by another node.
    Replace(NodeId),
}

pub trait Reducer {
    fn reducer_name(&self) -> &str;
    fn reduce(&mut self, graph: &mut Graph, node: NodeId) -> Reduction;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionOutcome {
    pub node: NodeId,
    pub replaced: bool,
    pub reductions: u32,
}

pub struct GraphReducer<'t> {
    table: Option<&'t NodeOriginTable>,
    reducers: Vec<Box<dyn Reducer + 't>>,
    max_rounds: u32,
}

impl<'t> GraphReducer<'t> {
    pub fn new(table: Option<&'t NodeOriginTable>) -> Self {
        Self {
            table,
            reducers: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn add_reducer(&mut self, reducer: Box<dyn Reducer + 't>) {
        self.reducers.push(reducer);
    }

    pub fn reducer_count(&self) -> usize {
        self.reducers.len()
    }

    /// Run every reducer on `node`, following replacements until a full pass
    /// makes none or `max_rounds` is exhausted.
    pub fn reduce_node(&mut self, graph: &mut Graph, node: NodeId) -> ReductionOutcome {
        let mut outcome = ReductionOutcome {
            node,
            replaced: false,
            reductions: 0,
        };
        for _ in 0..self.max_rounds {
            let mut replacement = None;
            for reducer in &mut self.reducers {
                let reduction = {
                    let _scope = OriginScope::enter(self.table, reducer.reducer_name(), outcome.node);
                    reducer.reduce(graph, outcome.node)
                };
                match reduction {
                    Reduction::NoChange => {}
                    Reduction::Changed => outcome.reductions += 1,
                    Reduction::Replace(new_node) if new_node == outcome.node => {
                        outcome.reductions += 1;
                    }
                    Reduction::Replace(new_node) => {
                        outcome.reductions += 1;
                        replacement = Some(new_node);
                        break;
                    }
                }
            }
            match replacement {
                Some(new_node) => {
                    outcome.node = new_node;
                    outcome.replaced = true;
                }
                None => break,
            }
        }
        outcome
    }

    /// Reduce every node present when the call starts, in ascending order.
    /// Returns the replacement chosen for each replaced node.
    pub fn reduce_graph(&mut self, graph: &mut Graph) -> BTreeMap<NodeId, NodeId> {
        let roots = graph.node_ids().collect::<Vec<_>>();
        let mut replacements = BTreeMap::new();
        for root in roots {
            let outcome = self.reduce_node(graph, root);
            if outcome.replaced {
                replacements.insert(root, outcome.node);
            }
        }
        replacements
    }
}
