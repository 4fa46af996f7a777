#![no_main]

use libfuzzer_sys::fuzz_target;
use node_origin::{Graph, NodeId, NodeOrigin, NodeOriginTable, OriginScope};

const MAX_DEPTH: usize = 32;
const REDUCER_NAMES: [&str; 4] = ["Inline", "Fold", "Simplify", "Lower"];

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let mut graph = Graph::new("fuzz");
    let mut table = NodeOriginTable::new();
    if table.add_decorator(&mut graph).is_err() {
        return;
    }
    graph.new_node("Start", &[]);
    run_program(&table, &mut graph, data, 0);
});

/// Interpret `data` as a program of node creations and nested scopes, checking
/// after every scope that the caller's origin was restored.
fn run_program(table: &NodeOriginTable, graph: &mut Graph, data: &[u8], depth: usize) -> usize {
    let mut cursor = 0usize;
    while cursor < data.len() {
        let byte = data[cursor];
        cursor += 1;
        match byte % 4 {
            0 => {
                let expected = table.current_origin();
                let id = graph.new_node("Op", &[]);
                assert_eq!(table.get_node_origin(id), expected);
            }
            1 if depth < MAX_DEPTH => {
                let before = table.current_origin();
                let node = NodeId::new(u32::from(byte) % graph.node_count() as u32);
                let name = REDUCER_NAMES[usize::from(byte >> 6)];
                {
                    let _scope = OriginScope::enter(Some(table), name, node);
                    assert_eq!(table.current_origin(), NodeOrigin::new(name, node));
                    cursor += run_program(table, graph, &data[cursor..], depth + 1);
                }
                assert_eq!(table.current_origin(), before);
            }
            2 => table.set_current_origin(NodeOrigin::from_raw("SourcePosition", i64::from(byte))),
            _ => return cursor,
        }
    }
    cursor
}
