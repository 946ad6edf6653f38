#![allow(dead_code)]

use callgraph_frame::graph::{Graph, ListNode, NodeId, Order};
use callgraph_frame::graphframe::{GraphFrame, LiteralNode};
use callgraph_frame::table::{ColumnSpec, IndexLevel, MetricTable, MetricValue, RowKey};
use serde_json::json;

fn literal(value: serde_json::Value) -> Vec<LiteralNode> {
    serde_json::from_value(value).unwrap()
}

fn leaf(name: &str, inc: f64, exc: f64) -> serde_json::Value {
    json!({"name": name, "metrics": {"time (inc)": inc, "time": exc}})
}

/// Two-root tree with repeated names, 24 nodes
pub fn mock_graph_literal() -> Vec<LiteralNode> {
    let bar = || {
        json!({
            "name": "bar",
            "metrics": {"time (inc)": 20.0, "time": 5.0},
            "children": [leaf("baz", 5.0, 5.0), leaf("grault", 10.0, 10.0)]
        })
    };
    literal(json!([
        {
            "name": "foo",
            "metrics": {"time (inc)": 130.0, "time": 0.0},
            "children": [
                bar(),
                {
                    "name": "qux",
                    "metrics": {"time (inc)": 60.0, "time": 0.0},
                    "children": [{
                        "name": "quux",
                        "metrics": {"time (inc)": 60.0, "time": 5.0},
                        "children": [{
                            "name": "corge",
                            "metrics": {"time (inc)": 55.0, "time": 10.0},
                            "children": [
                                bar(),
                                leaf("grault", 10.0, 10.0),
                                leaf("garply", 15.0, 15.0)
                            ]
                        }]
                    }]
                },
                {
                    "name": "waldo",
                    "metrics": {"time (inc)": 50.0, "time": 0.0},
                    "children": [
                        {
                            "name": "fred",
                            "metrics": {"time (inc)": 35.0, "time": 5.0},
                            "children": [
                                leaf("plugh", 5.0, 5.0),
                                {
                                    "name": "xyzzy",
                                    "metrics": {"time (inc)": 25.0, "time": 5.0},
                                    "children": [{
                                        "name": "thud",
                                        "metrics": {"time (inc)": 25.0, "time": 5.0},
                                        "children": [
                                            leaf("baz", 5.0, 5.0),
                                            leaf("garply", 15.0, 15.0)
                                        ]
                                    }]
                                }
                            ]
                        },
                        leaf("garply", 15.0, 15.0)
                    ]
                }
            ]
        },
        {
            "name": "waldo",
            "metrics": {"time (inc)": 30.0, "time": 10.0},
            "children": [bar()]
        }
    ]))
}

pub fn mock_dag_literal1() -> Vec<LiteralNode> {
    literal(json!([{
        "name": "A",
        "metrics": {"time (inc)": 130.0, "time": 0.0},
        "children": [
            {
                "name": "B",
                "metrics": {"time (inc)": 20.0, "time": 5.0},
                "children": [{
                    "name": "C",
                    "metrics": {"time (inc)": 5.0, "time": 5.0},
                    "children": [leaf("D", 8.0, 1.0)]
                }]
            },
            {
                "name": "E",
                "metrics": {"time (inc)": 55.0, "time": 10.0},
                "children": [leaf("F", 1.0, 9.0)]
            }
        ]
    }]))
}

pub fn mock_dag_literal2() -> Vec<LiteralNode> {
    literal(json!([{
        "name": "A",
        "metrics": {"time (inc)": 130.0, "time": 0.0},
        "children": [
            {
                "name": "B",
                "metrics": {"time (inc)": 20.0, "time": 5.0},
                "children": [{
                    "name": "C",
                    "metrics": {"time (inc)": 5.0, "time": 5.0},
                    "children": [leaf("D", 8.0, 1.0)]
                }]
            },
            {
                "name": "E",
                "metrics": {"time (inc)": 55.0, "time": 10.0},
                "children": [leaf("H", 1.0, 9.0)]
            }
        ]
    }]))
}

pub fn small_mock1() -> Vec<LiteralNode> {
    literal(json!([{
        "name": "A",
        "metrics": {"time (inc)": 130.0, "time": 0.0},
        "children": [
            {
                "name": "B",
                "metrics": {"time (inc)": 20.0, "time": 5.0},
                "children": [leaf("C", 5.0, 5.0)]
            },
            {
                "name": "E",
                "metrics": {"time (inc)": 55.0, "time": 10.0},
                "children": [leaf("F", 1.0, 9.0)]
            },
            leaf("H", 55.0, 10.0)
        ]
    }]))
}

pub fn small_mock2() -> Vec<LiteralNode> {
    literal(json!([{
        "name": "A",
        "metrics": {"time (inc)": 130.0, "time": 0.0},
        "children": [
            {
                "name": "B",
                "metrics": {"time (inc)": 20.0, "time": 5.0},
                "children": [leaf("C", 5.0, 5.0), leaf("D", 5.0, 5.0)]
            },
            {
                "name": "E",
                "metrics": {"time (inc)": 55.0, "time": 10.0},
                "children": [leaf("F", 1.0, 9.0), leaf("G", 1.0, 9.0)]
            }
        ]
    }]))
}

pub fn small_mock3() -> Vec<LiteralNode> {
    literal(json!([{
        "name": "A",
        "metrics": {"time (inc)": 130.0, "time": 0.0},
        "children": [
            leaf("B", 20.0, 5.0),
            {
                "name": "E",
                "metrics": {"time (inc)": 55.0, "time": 10.0},
                "children": [leaf("F", 1.0, 9.0)]
            }
        ]
    }]))
}

fn module_leaf(name: &str, module: &str, inc: f64, exc: f64) -> serde_json::Value {
    json!({"name": name, "metrics": {"time (inc)": inc, "time": exc, "module": module}})
}

fn module_dag(d_module: &str, f_module: &str) -> Vec<LiteralNode> {
    literal(json!([{
        "name": "A",
        "metrics": {"time (inc)": 130.0, "time": 0.0, "module": "main"},
        "children": [
            {
                "name": "B",
                "metrics": {"time (inc)": 20.0, "time": 5.0, "module": "foo"},
                "children": [{
                    "name": "C",
                    "metrics": {"time (inc)": 6.0, "time": 5.0, "module": "graz"},
                    "children": [module_leaf("D", d_module, 1.0, 1.0)]
                }]
            },
            {
                "name": "E",
                "metrics": {"time (inc)": 19.0, "time": 10.0, "module": "bar"},
                "children": [module_leaf("F", f_module, 9.0, 9.0)]
            }
        ]
    }]))
}

/// A(main) -> B(foo) -> C(graz) -> D(baz), A -> E(bar) -> F(bar)
pub fn mock_dag_literal_module() -> Vec<LiteralNode> {
    module_dag("baz", "bar")
}

/// As [`mock_dag_literal_module`] with D in graz
pub fn mock_dag_literal_module_complex() -> Vec<LiteralNode> {
    module_dag("graz", "bar")
}

/// D in graz and F in foo, so foo is entered from main and from bar
pub fn mock_dag_literal_module_more_complex() -> Vec<LiteralNode> {
    module_dag("graz", "foo")
}

/// Frame over `roots` with one row per node and (rank, thread) slice
///
/// `levels` picks which parts of each slice end up in the row keys;
/// `time` is `value(name, rank, thread)` and `time (inc)` is derived.
pub fn indexed_frame<F>(
    roots: &[ListNode],
    levels: Vec<IndexLevel>,
    slices: &[(u32, u32)],
    value: F,
) -> GraphFrame
where
    F: Fn(&str, u32, u32) -> f64,
{
    let graph = Graph::from_lists(roots).unwrap();
    let mut table = MetricTable::with_levels(levels);
    table.add_column(ColumnSpec::text("name")).unwrap();
    table.add_column(ColumnSpec::numeric("time")).unwrap();

    let ranked = table.has_level(IndexLevel::Rank);
    let threaded = table.has_level(IndexLevel::Thread);
    let ids: Vec<NodeId> = graph.traverse(Order::Pre).collect();
    for id in ids {
        let name = graph.frame(id).and_then(|f| f.name()).unwrap().to_string();
        for &(rank, thread) in slices {
            let mut key = RowKey::node(id);
            if ranked {
                key = key.with_rank(rank);
            }
            if threaded {
                key = key.with_thread(thread);
            }
            table
                .insert(
                    key,
                    [
                        ("name", MetricValue::from(name.as_str())),
                        ("time", MetricValue::from(value(&name, rank, thread))),
                    ],
                )
                .unwrap();
        }
    }

    let mut gf = GraphFrame::new(graph, table, vec!["time".to_string()], vec![], None).unwrap();
    gf.calculate_inclusive_metrics().unwrap();
    gf
}

/// Nodes named `name`, in pre-order
pub fn find_all(gf: &GraphFrame, name: &str) -> Vec<NodeId> {
    gf.graph()
        .traverse(Order::Pre)
        .filter(|id| gf.graph().frame(*id).and_then(|f| f.name()) == Some(name))
        .collect()
}

pub fn find(gf: &GraphFrame, name: &str) -> NodeId {
    find_all(gf, name)[0]
}

pub fn metric(gf: &GraphFrame, node: NodeId, column: &str) -> Option<f64> {
    gf.table().number(&RowKey::node(node), column)
}

/// Value of `column` for the node named `name` on one rank
pub fn rank_metric(gf: &GraphFrame, name: &str, rank: u32, column: &str) -> Option<f64> {
    gf.table()
        .number(&RowKey::node(find(gf, name)).with_rank(rank), column)
}
