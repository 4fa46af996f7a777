//! Integration tests for the `origin_table` and `origin_scope` modules.
//!
//! Covers unknown-by-default reads, last-write-wins stamping, scope
//! restoration at arbitrary depth, no-op scopes, decorator stamping, and the
//! end-to-end Inline/Fold scenario.

#![forbid(unsafe_code)]

use node_origin::{
    Graph, NodeId, NodeOrigin, NodeOriginError, NodeOriginTable, OriginScope, OriginTableContext,
    with_origin_scope,
};

fn origin(name: &str, id: u32) -> NodeOrigin {
    NodeOrigin::new(name, NodeId::new(id))
}

fn graph_with_nodes(count: u32) -> Graph {
    let mut graph = Graph::new("integration");
    for _ in 0..count {
        graph.new_node("Dead", &[]);
    }
    graph
}

// ---------------------------------------------------------------------------
// Table reads and writes
// ---------------------------------------------------------------------------

#[test]
fn never_stamped_ids_read_unknown() {
    let table = NodeOriginTable::new();
    table.set_node_origin(NodeId::new(3), origin("A", 0));
    for raw in [0, 1, 2, 4, 100, u32::MAX] {
        assert_eq!(table.get_node_origin(NodeId::new(raw)), NodeOrigin::unknown());
    }
}

#[test]
fn last_write_wins_per_id() {
    let table = NodeOriginTable::new();
    let sequence = [origin("A", 1), origin("B", 2), origin("C", 3)];
    for record in &sequence {
        table.set_node_origin(NodeId::new(8), record.clone());
    }
    assert_eq!(table.get_node_origin(NodeId::new(8)), origin("C", 3));
}

// ---------------------------------------------------------------------------
// Scopes
// ---------------------------------------------------------------------------

fn recurse(table: &NodeOriginTable, remaining: u32, seen: &mut Vec<NodeOrigin>) {
    if remaining == 0 {
        return;
    }
    let _scope = table.scope("Recursive", NodeId::new(remaining));
    seen.push(table.current_origin());
    recurse(table, remaining - 1, seen);
    assert_eq!(table.current_origin(), origin("Recursive", remaining));
}

#[test]
fn recursive_scopes_restore_to_pre_push_state() {
    for depth in [0, 1, 2, 7, 64] {
        let table = NodeOriginTable::new();
        table.set_current_origin(origin("Base", 99));
        let mut seen = Vec::new();
        recurse(&table, depth, &mut seen);
        assert_eq!(seen.len(), depth as usize);
        assert_eq!(table.current_origin(), origin("Base", 99));
    }
}

#[test]
fn sibling_scopes_are_independent() {
    let table = NodeOriginTable::new();
    with_origin_scope(Some(&table), "First", NodeId::new(1), || {
        assert_eq!(table.current_origin(), origin("First", 1));
    });
    with_origin_scope(Some(&table), "Second", NodeId::new(2), || {
        assert_eq!(table.current_origin(), origin("Second", 2));
    });
    assert_eq!(table.current_origin(), NodeOrigin::unknown());
}

#[test]
fn scope_without_table_touches_nothing() {
    let mut graph = Graph::new("noop");
    let mut table = NodeOriginTable::new();
    table.add_decorator(&mut graph).unwrap();
    table.set_current_origin(origin("Kept", 1));
    {
        let _scope = OriginScope::enter(None, "Ignored", NodeId::new(0));
        graph.new_node("Add", &[]);
    }
    assert_eq!(table.current_origin(), origin("Kept", 1));
    assert_eq!(table.get_node_origin(NodeId::new(0)), origin("Kept", 1));
}

// ---------------------------------------------------------------------------
// Decorator
// ---------------------------------------------------------------------------

#[test]
fn decorator_uses_origin_current_at_creation() {
    let mut graph = Graph::new("observer");
    let mut table = NodeOriginTable::new();
    table.add_decorator(&mut graph).unwrap();

    let r = origin("Foo", 7);
    table.set_current_origin(r.clone());
    let first = graph.new_node("Add", &[]);
    let second = graph.new_node("Add", &[first]);

    let s = origin("Bar", 8);
    table.set_current_origin(s.clone());
    let third = graph.new_node("Add", &[second]);

    assert_eq!(table.get_node_origin(first), r);
    assert_eq!(table.get_node_origin(second), r);
    assert_eq!(table.get_node_origin(third), s);
}

#[test]
fn second_install_fails_and_single_stamp_remains() {
    let mut graph = Graph::new("twice");
    let mut table = NodeOriginTable::new();
    table.add_decorator(&mut graph).unwrap();
    assert!(matches!(
        table.add_decorator(&mut graph),
        Err(NodeOriginError::DecoratorAlreadyInstalled { .. })
    ));
    assert_eq!(graph.decorator_count(), 1);
}

#[test]
fn two_tables_on_two_graphs_stay_independent() {
    let mut g1 = Graph::new("g1");
    let mut g2 = Graph::new("g2");
    let mut a = NodeOriginTable::new();
    let mut b = NodeOriginTable::new();
    a.add_decorator(&mut g1).unwrap();
    b.add_decorator(&mut g2).unwrap();

    // Detaching a from the wrong graph must not touch b's decorator.
    let err = a.remove_decorator(&mut g2).unwrap_err();
    assert!(matches!(err, NodeOriginError::DecoratorGraphMismatch { .. }));
    assert_eq!(g2.decorator_count(), 1);
    assert!(a.has_decorator());

    // Nor may it lead to a second decorator on g1.
    assert!(a.add_decorator(&mut g1).is_err());
    assert_eq!(g1.decorator_count(), 1);

    a.set_current_origin(origin("Inline", 0));
    b.set_current_origin(origin("Fold", 0));
    let n1 = g1.new_node("Call", &[]);
    let n2 = g2.new_node("Add", &[]);
    assert_eq!(a.get_node_origin(n1), origin("Inline", 0));
    assert_eq!(b.get_node_origin(n2), origin("Fold", 0));

    a.remove_decorator(&mut g1).unwrap();
    assert_eq!(g1.decorator_count(), 0);
    assert_eq!(g2.decorator_count(), 1);
}

#[test]
fn graph_outliving_its_table_drops_the_decorator() {
    let mut graph = Graph::new("outlives");
    {
        let mut table = NodeOriginTable::new();
        table.add_decorator(&mut graph).unwrap();
        graph.new_node("Start", &[]);
        assert_eq!(table.stamped_count(), 1);
    }
    graph.new_node("End", &[]);
    assert_eq!(graph.decorator_count(), 0);
}

#[test]
fn context_flows_into_events() {
    let mut graph = Graph::new("ctx");
    let mut table = NodeOriginTable::with_context(OriginTableContext::new("t-1", "d-1", "p-1"));
    table.add_decorator(&mut graph).unwrap();
    let events = table.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].trace_id, "t-1");
    assert_eq!(events[0].decision_id, "d-1");
    assert_eq!(events[0].policy_id, "p-1");
    assert_eq!(events[0].outcome, "pass");
    assert!(events[0].error_code.is_none());
}

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

#[test]
fn inline_then_fold_then_restore() {
    let mut graph = graph_with_nodes(10);
    let mut table = NodeOriginTable::new();
    table.add_decorator(&mut graph).unwrap();

    table.set_current_origin(origin("Inline", 3));
    let n10 = graph.new_node("Call", &[]);
    assert_eq!(n10, NodeId::new(10));
    assert_eq!(table.get_node_origin(n10), origin("Inline", 3));

    {
        let _scope = OriginScope::enter(Some(&table), "Fold", n10);
        assert_eq!(table.current_origin(), origin("Fold", 10));
        let n11 = graph.new_node("Int32Constant", &[]);
        assert_eq!(n11, NodeId::new(11));
        assert_eq!(table.get_node_origin(n11), origin("Fold", 10));
    }

    let n12 = graph.new_node("Return", &[n10]);
    assert_eq!(n12, NodeId::new(12));
    assert_eq!(table.get_node_origin(n12), origin("Inline", 3));

    table.remove_decorator(&mut graph).unwrap();
    let n13 = graph.new_node("End", &[]);
    assert_eq!(table.get_node_origin(n13), NodeOrigin::unknown());
}
