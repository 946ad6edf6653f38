mod common;

use callgraph_frame::flamegraph::{build_collapsed_stacks, generate_flamegraph, FlamegraphConfig};
use callgraph_frame::graphframe::GraphFrame;
use callgraph_frame::output::{read_document, read_literal, write_literal, write_svg};
use callgraph_frame::utils::config::SCHEMA_VERSION;
use common::{find, metric, mock_graph_literal, small_mock1, small_mock2};
use pretty_assertions::assert_eq;

#[test]
fn test_document_round_trip() {
    let gf = GraphFrame::from_literal(&mock_graph_literal()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mock.json");

    write_literal(&gf, &path).unwrap();

    let document = read_document(&path).unwrap();
    assert_eq!(document.version, SCHEMA_VERSION);
    assert!(chrono::DateTime::parse_from_rfc3339(&document.generated_at).is_ok());
    assert_eq!(document.graph.len(), 2);

    let back = read_literal(&path).unwrap();
    assert!(back.graph().equals(gf.graph()));
    assert_eq!(back.table().len(), 24);
}

#[test]
fn test_diff_survives_disk() {
    let gf1 = GraphFrame::from_literal(&small_mock1()).unwrap();
    let gf2 = GraphFrame::from_literal(&small_mock2()).unwrap();
    let diff = gf1.sub(&gf2).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diff.json");
    write_literal(&diff, &path).unwrap();

    let back = read_literal(&path).unwrap();
    assert_eq!(back.graph().len(), 8);
    assert_eq!(metric(&back, find(&back, "D"), "time"), Some(-5.0));
    assert_eq!(metric(&back, find(&back, "D"), "_missing_node"), Some(2.0));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_literal(dir.path().join("absent.json")).is_err());
}

#[test]
fn test_flamegraph_to_disk() {
    let gf = GraphFrame::from_literal(&mock_graph_literal()).unwrap();
    let stacks = build_collapsed_stacks(&gf, None).unwrap();
    let config = FlamegraphConfig::new().with_title("Mock Profile");
    let svg = generate_flamegraph(&stacks, Some(&config)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/flame.svg");
    write_svg(&svg, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("Mock Profile"));
    assert!(written.contains("corge"));
}
