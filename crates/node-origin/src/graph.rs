//! Minimal IR graph: dense node identities, opcode labels, input edges, and
//! a creation-event hook (`GraphDecorator`) fired on every new node.
//!
//! The graph knows nothing about provenance. Anything that wants to observe
//! node creation registers a decorator and receives each node right after it
//! is appended.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Stable identity of a node within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    opcode: String,
    inputs: Vec<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }
}

// ---------------------------------------------------------------------------
// Decorators
// ---------------------------------------------------------------------------

/// Observer invoked once per node creation.
pub trait GraphDecorator {
    fn decorate(&mut self, node: &Node);

    /// A decorator that reports `false` is dropped by the graph before the
    /// next creation event.
    fn is_live(&self) -> bool {
        true
    }
}

/// Process-unique identity of a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph:{}", self.0)
    }
}

/// Handle returned by [`Graph::add_decorator`]; only the issuing graph
/// accepts it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecoratorId {
    graph: GraphId,
    sequence: u64,
}

impl DecoratorId {
    pub fn graph(self) -> GraphId {
        self.graph
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph `{graph}` is full: node capacity {capacity} reached")]
    NodeCapacityExhausted { graph: String, capacity: u32 },
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Largest number of nodes a graph may hold; ids run `0..MAX_NODE_COUNT`.
pub const MAX_NODE_COUNT: u32 = u32::MAX;

pub struct Graph {
    id: GraphId,
    name: String,
    nodes: Vec<Node>,
    node_capacity: u32,
    decorators: Vec<(DecoratorId, Box<dyn GraphDecorator>)>,
    next_decorator_sequence: u64,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_node_capacity(name, MAX_NODE_COUNT)
    }

    /// Graph that refuses to grow past `capacity` nodes.
    pub fn with_node_capacity(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: GraphId::next(),
            name: name.into(),
            nodes: Vec::new(),
            node_capacity: capacity,
            decorators: Vec::new(),
            next_decorator_sequence: 1,
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a node and notify every live decorator, in registration order.
    pub fn try_new_node(
        &mut self,
        opcode: impl Into<String>,
        inputs: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        let raw = u32::try_from(self.nodes.len())
            .ok()
            .filter(|raw| *raw < self.node_capacity)
            .ok_or_else(|| GraphError::NodeCapacityExhausted {
                graph: self.name.clone(),
                capacity: self.node_capacity,
            })?;
        let id = NodeId::new(raw);
        self.nodes.push(Node {
            id,
            opcode: opcode.into(),
            inputs: inputs.to_vec(),
        });
        self.decorators.retain(|(_, decorator)| decorator.is_live());
        let node = &self.nodes[id.index()];
        for (_, decorator) in &mut self.decorators {
            decorator.decorate(node);
        }
        Ok(id)
    }

    /// Infallible form of [`Graph::try_new_node`].
    ///
    /// # Panics
    ///
    /// Panics when the node capacity is exhausted; like allocation failure,
    /// running out of node ids is fatal to a compilation.
    pub fn new_node(&mut self, opcode: impl Into<String>, inputs: &[NodeId]) -> NodeId {
        match self.try_new_node(opcode, inputs) {
            Ok(id) => id,
            Err(error) => panic!("{error}"),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All node identities in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(Node::id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn add_decorator(&mut self, decorator: Box<dyn GraphDecorator>) -> DecoratorId {
        let id = DecoratorId {
            graph: self.id,
            sequence: self.next_decorator_sequence,
        };
        self.next_decorator_sequence += 1;
        self.decorators.push((id, decorator));
        id
    }

    /// Returns whether a decorator with this id was registered here. Ids
    /// issued by another graph are rejected.
    pub fn remove_decorator(&mut self, id: DecoratorId) -> bool {
        if id.graph != self.id {
            return false;
        }
        let before = self.decorators.len();
        self.decorators.retain(|(existing, _)| *existing != id);
        self.decorators.len() != before
    }

    /// Registered decorators that are still live.
    pub fn decorator_count(&self) -> usize {
        self.decorators
            .iter()
            .filter(|(_, decorator)| decorator.is_live())
            .count()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .field("decorators", &self.decorators.len())
            .finish()
    }
}
