use vigil_core::classify::classify_target;
use vigil_core::report::{build_graph, site_risk, NodeKind, Risk};
use vigil_core::tracer::{CallSite, StackExpr};

fn hardcoded_site(pc: usize, address: &str) -> CallSite {
    let target = StackExpr::Literal(address.to_string());
    let classification = classify_target(&target);
    CallSite {
        id: format!("site-{pc}"),
        pc,
        block: Some(0),
        target,
        classification,
        pattern: None,
        note: None,
    }
}

fn unknown_site(pc: usize) -> CallSite {
    let classification = classify_target(&StackExpr::Unknown);
    CallSite {
        id: format!("site-{pc}"),
        pc,
        block: Some(0),
        target: StackExpr::Unknown,
        classification,
        pattern: None,
        note: None,
    }
}

#[test]
fn test_risk_order_puts_unknown_on_top() {
    assert!(Risk::Low < Risk::Medium);
    assert!(Risk::Medium < Risk::High);
    assert!(Risk::High < Risk::Unknown);
    assert_eq!(
        [Risk::Medium, Risk::Unknown, Risk::High].into_iter().max(),
        Some(Risk::Unknown)
    );
}

#[test]
fn test_site_risk_table() {
    let hardcoded = hardcoded_site(0, &"aa".repeat(20));
    assert_eq!(site_risk(&hardcoded.classification, None), Risk::Low);

    let storage = classify_target(&StackExpr::Storage(Box::new(StackExpr::Literal(
        "01".to_string(),
    ))));
    assert_eq!(site_risk(&storage, None), Risk::Medium);

    let calldata = classify_target(&StackExpr::Calldata(Box::new(StackExpr::Unknown)));
    assert_eq!(site_risk(&calldata, None), Risk::High);

    let dynamic = classify_target(&StackExpr::Op {
        op: "ADD".to_string(),
        args: vec![],
    });
    assert_eq!(site_risk(&dynamic, None), Risk::High);

    let unknown = classify_target(&StackExpr::Unknown);
    assert_eq!(site_risk(&unknown, None), Risk::Unknown);
}

#[test]
fn test_graph_has_one_contract_node() {
    let sites = vec![hardcoded_site(5, &"aa".repeat(20))];
    let graph = build_graph(Some("0x1234"), &sites, &[Risk::Low]);

    assert_eq!(graph.nodes[0].id, "contract:0x1234");
    assert_eq!(graph.nodes[0].kind, NodeKind::Contract);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].from, "contract:0x1234");
    assert_eq!(graph.edges[0].to, format!("impl:0x{}", "aa".repeat(20)));
    assert_eq!(graph.edges[0].label, "DELEGATECALL");
    assert_eq!(graph.edges[0].risk, Risk::Low);
}

#[test]
fn test_graph_without_address_uses_unknown_contract_id() {
    let sites = vec![unknown_site(3)];
    let graph = build_graph(None, &sites, &[Risk::Unknown]);
    assert_eq!(graph.nodes[0].id, "contract:unknown");
    assert_eq!(graph.edges[0].to, "unknown:site-3");
    assert_eq!(graph.edges[0].label, "DELEGATECALL (dynamic)");
}

#[test]
fn test_graph_coalesces_nodes_by_id() {
    let address = "aa".repeat(20);
    let sites = vec![hardcoded_site(5, &address), hardcoded_site(9, &address)];
    let graph = build_graph(None, &sites, &[Risk::Low, Risk::Low]);

    // contract + one implementation node, but two edges
    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 2);
}

#[test]
fn test_implementation_referenced_twice_becomes_a_facet() {
    let address = "aa".repeat(20);
    let sites = vec![hardcoded_site(5, &address), hardcoded_site(9, &address)];
    let graph = build_graph(None, &sites, &[Risk::Low, Risk::Low]);

    let node = &graph.nodes[1];
    assert_eq!(node.id, format!("impl:0x{address}"));
    assert_eq!(node.kind, NodeKind::Facet);
}

#[test]
fn test_distinct_implementations_stay_implementations() {
    let sites = vec![
        hardcoded_site(5, &"aa".repeat(20)),
        hardcoded_site(9, &"bb".repeat(20)),
    ];
    let graph = build_graph(None, &sites, &[Risk::Low, Risk::Low]);

    assert_eq!(graph.nodes.len(), 3);
    assert!(graph.nodes[1..]
        .iter()
        .all(|node| node.kind == NodeKind::Implementation));
}

#[test]
fn test_storage_slot_edge_label_truncates_the_slot() {
    let target = StackExpr::Storage(Box::new(StackExpr::Literal(
        "360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc".to_string(),
    )));
    let classification = classify_target(&target);
    let sites = vec![CallSite {
        id: "site-7".to_string(),
        pc: 7,
        block: Some(0),
        target,
        classification,
        pattern: None,
        note: None,
    }];
    let graph = build_graph(None, &sites, &[Risk::Medium]);

    assert_eq!(
        graph.edges[0].to,
        "storage:0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc"
    );
    assert_eq!(graph.edges[0].label, "Storage Proxy (slot: 0x360894a1…)");
}
