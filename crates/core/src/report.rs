//! Risk assessment, dataflow graph, and report assembly.

use crate::classify::{Classification, TargetKind};
use crate::patterns::{PatternMatch, PatternName};
use crate::tracer::CallSite;
use crate::AnalyzeOptions;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Risk level of a site or a whole contract.
///
/// Variant order is the severity order; `Unknown` sorts above `High`
/// because an unprovable target cannot be called safe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
    Unknown,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::Low => write!(f, "low"),
            Risk::Medium => write!(f, "medium"),
            Risk::High => write!(f, "high"),
            Risk::Unknown => write!(f, "unknown"),
        }
    }
}

/// Derives the risk of one site from its classification and pattern.
pub fn site_risk(classification: &Classification, pattern: Option<&PatternMatch>) -> Risk {
    match classification.kind {
        TargetKind::Hardcoded => {
            if pattern.is_some_and(|m| m.name == PatternName::Eip1167) {
                Risk::Medium
            } else {
                Risk::Low
            }
        }
        TargetKind::Storage => Risk::Medium,
        TargetKind::Calldata | TargetKind::Dynamic => Risk::High,
        TargetKind::Unknown => Risk::Unknown,
    }
}

/// Node role in the dataflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Contract,
    Implementation,
    Facet,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    pub risk: Risk,
}

/// Delegation graph: the analyzed contract plus everything it calls into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataflowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Per-site entry in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteReport {
    pub id: String,
    pub pc: usize,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternMatch>,
    pub risk: Risk,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Histogram entry for detected proxy patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCount {
    pub name: PatternName,
    pub count: u32,
}

/// Complete analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// SHA-256 of the input string exactly as the caller supplied it.
    pub bytecode_hash: String,
    pub delegatecall_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_risk: Option<Risk>,
    pub sites: Vec<SiteReport>,
    pub proxies_detected: Vec<PatternCount>,
    pub graph: DataflowGraph,
}

/// Assembles the report from classified, pattern-tagged sites.
pub fn build_report(input: &str, options: &AnalyzeOptions, sites: Vec<CallSite>) -> Report {
    let bytecode_hash = hex::encode(Sha256::digest(input.as_bytes()));

    let mut site_reports = Vec::with_capacity(sites.len());
    let mut risks = Vec::with_capacity(sites.len());
    for site in &sites {
        let risk = site_risk(&site.classification, site.pattern.as_ref());
        risks.push(risk);
        site_reports.push(SiteReport {
            id: site.id.clone(),
            pc: site.pc,
            classification: site.classification.clone(),
            pattern: site.pattern.clone(),
            risk,
            notes: site.note.clone(),
        });
    }
    site_reports.sort_by_key(|site| site.pc);

    let overall_risk = risks.iter().copied().max();

    let mut histogram: BTreeMap<PatternName, u32> = BTreeMap::new();
    for site in &sites {
        if let Some(pattern) = &site.pattern {
            *histogram.entry(pattern.name).or_insert(0) += 1;
        }
    }
    let proxies_detected = histogram
        .into_iter()
        .map(|(name, count)| PatternCount { name, count })
        .collect();

    let graph = build_graph(options.contract_address.as_deref(), &sites, &risks);

    Report {
        contract_address: options.contract_address.clone(),
        network: options.network.clone(),
        bytecode_hash,
        delegatecall_count: sites.len() as u32,
        overall_risk,
        sites: site_reports,
        proxies_detected,
        graph,
    }
}

/// Builds the delegation graph: one contract node, one target node per
/// site, nodes coalesced by id. Implementation nodes referenced by two or
/// more sites become facets.
pub fn build_graph(
    contract_address: Option<&str>,
    sites: &[CallSite],
    risks: &[Risk],
) -> DataflowGraph {
    let contract_id = format!("contract:{}", contract_address.unwrap_or("unknown"));
    let mut nodes = vec![GraphNode {
        id: contract_id.clone(),
        label: contract_address.unwrap_or("analyzed contract").to_string(),
        kind: NodeKind::Contract,
    }];
    let mut node_index: HashMap<String, usize> = HashMap::new();
    node_index.insert(contract_id.clone(), 0);
    let mut reference_counts: HashMap<String, u32> = HashMap::new();
    let mut edges = Vec::with_capacity(sites.len());

    for (site, risk) in sites.iter().zip(risks) {
        let pattern_name = site.pattern.as_ref().map(|m| m.name);
        let (node, label) = if let Some(address) = &site.classification.address_literal {
            let node = GraphNode {
                id: format!("impl:{address}"),
                label: address.clone(),
                kind: NodeKind::Implementation,
            };
            let label = pattern_name
                .map(|name| name.to_string())
                .unwrap_or_else(|| "DELEGATECALL".to_string());
            (node, label)
        } else if let Some(slot) = &site.classification.storage_slot_literal {
            let node = GraphNode {
                id: format!("storage:{slot}"),
                label: slot.clone(),
                kind: NodeKind::Implementation,
            };
            let name = pattern_name
                .map(|name| name.to_string())
                .unwrap_or_else(|| "Storage Proxy".to_string());
            let short_slot: String = slot.chars().take(10).collect();
            (node, format!("{name} (slot: {short_slot}…)"))
        } else {
            let node = GraphNode {
                id: format!("unknown:{}", site.id),
                label: "unknown target".to_string(),
                kind: NodeKind::Unknown,
            };
            (node, "DELEGATECALL (dynamic)".to_string())
        };

        *reference_counts.entry(node.id.clone()).or_insert(0) += 1;
        edges.push(GraphEdge {
            from: contract_id.clone(),
            to: node.id.clone(),
            label,
            risk: *risk,
        });
        if !node_index.contains_key(&node.id) {
            node_index.insert(node.id.clone(), nodes.len());
            nodes.push(node);
        }
    }

    for node in nodes.iter_mut() {
        if node.kind == NodeKind::Implementation
            && reference_counts.get(&node.id).copied().unwrap_or(0) >= 2
        {
            node.kind = NodeKind::Facet;
        }
    }

    DataflowGraph { nodes, edges }
}
