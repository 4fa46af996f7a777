//! Sparse per-node side table with a default value for absent entries.

use crate::graph::NodeId;

/// Dense vector keyed by [`NodeId`], grown on write. Reads past the end, or
/// of slots never written, return the default.
#[derive(Debug, Clone)]
pub struct NodeAuxData<T: Clone> {
    default: T,
    slots: Vec<Option<T>>,
}

impl<T: Clone> NodeAuxData<T> {
    pub fn new(default: T) -> Self {
        Self {
            default,
            slots: Vec::new(),
        }
    }

    pub fn get(&self, id: NodeId) -> T {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    /// Overwrite the entry for `id`. Returns whether an explicit value was
    /// already present.
    pub fn set(&mut self, id: NodeId, value: T) -> bool {
        let index = id.index();
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index].replace(value).is_some()
    }

    pub fn is_set(&self, id: NodeId) -> bool {
        self.slots.get(id.index()).is_some_and(Option::is_some)
    }

    /// Explicitly written entries in ascending id order.
    pub fn iter_set(&self) -> impl Iterator<Item = (NodeId, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref().map(|value| (NodeId::new(index as u32), value))
        })
    }

    pub fn set_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
