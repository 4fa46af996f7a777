//! RAII scope that temporarily replaces a table's current origin.
//!
//! Entering a scope saves the table's current origin and installs
//! `(reducer_name, node)`; dropping it puts the saved value back. Scopes
//! borrow the table, so they close in reverse order of opening on every exit
//! path: normal return, `?` propagation, and unwinding.
//!
//! A scope built without a table does nothing, so call sites can open one
//! unconditionally even when tracking is disabled.

use crate::graph::NodeId;
use crate::node_origin::NodeOrigin;
use crate::origin_table::NodeOriginTable;

#[must_use = "the origin is restored as soon as the scope is dropped"]
#[derive(Debug)]
pub struct OriginScope<'a> {
    table: Option<&'a NodeOriginTable>,
    prev_origin: NodeOrigin,
}

impl<'a> OriginScope<'a> {
    pub fn enter(table: Option<&'a NodeOriginTable>, reducer_name: &str, node: NodeId) -> Self {
        let prev_origin = match table {
            Some(table) => table.replace_current_origin(NodeOrigin::new(reducer_name, node)),
            None => NodeOrigin::unknown(),
        };
        Self { table, prev_origin }
    }

    /// Origin that will be restored on drop.
    pub fn previous_origin(&self) -> &NodeOrigin {
        &self.prev_origin
    }

    pub fn is_active(&self) -> bool {
        self.table.is_some()
    }
}

impl Drop for OriginScope<'_> {
    fn drop(&mut self) {
        if let Some(table) = self.table {
            table.set_current_origin(std::mem::take(&mut self.prev_origin));
        }
    }
}

/// Run `f` with the current origin set to `(reducer_name, node)`.
pub fn with_origin_scope<R>(
    table: Option<&NodeOriginTable>,
    reducer_name: &str,
    node: NodeId,
    f: impl FnOnce() -> R,
) -> R {
    let _scope = OriginScope::enter(table, reducer_name, node);
    f()
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn origin(name: &str, id: u32) -> NodeOrigin {
        NodeOrigin::new(name, NodeId::new(id))
    }

    #[test]
    fn scope_sets_and_restores() {
        let table = NodeOriginTable::new();
        table.set_current_origin(origin("A", 1));
        {
            let scope = table.scope("B", NodeId::new(2));
            assert!(scope.is_active());
            assert_eq!(scope.previous_origin(), &origin("A", 1));
            assert_eq!(table.current_origin(), origin("B", 2));
        }
        assert_eq!(table.current_origin(), origin("A", 1));
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let table = NodeOriginTable::new();
        for depth in 0..16u32 {
            let before = table.current_origin();
            let mut scopes = Vec::new();
            for level in 0..depth {
                scopes.push(OriginScope::enter(Some(&table), "Nested", NodeId::new(level)));
                assert_eq!(table.current_origin(), origin("Nested", level));
            }
            while let Some(scope) = scopes.pop() {
                drop(scope);
            }
            assert_eq!(table.current_origin(), before);
        }
    }

    #[test]
    fn absent_table_is_noop() {
        let table = NodeOriginTable::new();
        table.set_current_origin(origin("A", 1));
        {
            let scope = OriginScope::enter(None, "B", NodeId::new(2));
            assert!(!scope.is_active());
            assert_eq!(table.current_origin(), origin("A", 1));
        }
        assert_eq!(table.current_origin(), origin("A", 1));
        assert_eq!(table.stamped_count(), 0);
    }

    #[test]
    fn restores_on_early_error_return() {
        fn failing(table: &NodeOriginTable) -> Result<(), &'static str> {
            let _scope = table.scope("Fold", NodeId::new(3));
            let reduced: Result<u32, &'static str> = Err("reduction failed");
            reduced?;
            Ok(())
        }

        let table = NodeOriginTable::new();
        table.set_current_origin(origin("Outer", 0));
        assert!(failing(&table).is_err());
        assert_eq!(table.current_origin(), origin("Outer", 0));
    }

    #[test]
    fn restores_on_panic() {
        let table = NodeOriginTable::new();
        table.set_current_origin(origin("Outer", 0));
        let result = catch_unwind(AssertUnwindSafe(|| {
            with_origin_scope(Some(&table), "Panicky", NodeId::new(5), || {
                panic!("reducer bug");
            })
        }));
        assert!(result.is_err());
        assert_eq!(table.current_origin(), origin("Outer", 0));
    }

    #[test]
    fn with_origin_scope_returns_value() {
        let table = NodeOriginTable::new();
        let seen = with_origin_scope(Some(&table), "Inline", NodeId::new(9), || {
            table.current_origin()
        });
        assert_eq!(seen, origin("Inline", 9));
        assert_eq!(table.current_origin(), NodeOrigin::unknown());
    }

    #[test]
    fn set_current_inside_scope_is_discarded_on_exit() {
        let table = NodeOriginTable::new();
        {
            let _scope = table.scope("Outer", NodeId::new(1));
            table.set_current_origin(NodeOrigin::from_raw("SourcePosition", 44));
        }
        assert_eq!(table.current_origin(), NodeOrigin::unknown());
    }
}
