//! Recognition of well-known proxy idioms.
//!
//! Cross-references site classifications with byte-level signatures and
//! standard storage slots. Output depends only on the raw bytecode and the
//! set of slot literals, never on site ordering.

use crate::classify::TargetKind;
use crate::tracer::CallSite;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// EIP-1167 minimal-proxy code preceding the implementation address.
pub const EIP1167_PREFIX: &str = "363d3d373d3d3d363d73";
/// EIP-1167 minimal-proxy code following the implementation address.
pub const EIP1167_SUFFIX: &str = "5af43d82803e903d91602b57fd5bf3";

/// keccak256("eip1967.proxy.implementation") - 1
pub const EIP1967_IMPL_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";
/// keccak256("PROXIABLE"), the EIP-1822 (UUPS) implementation slot.
pub const UUPS_IMPL_SLOT: &str =
    "0xc5f16f0fcc639fa48a6947836d9850f504798523bf8c9a3a87d5876cf622bcf7";

/// Known proxy pattern families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PatternName {
    #[serde(rename = "EIP-1167")]
    Eip1167,
    #[serde(rename = "EIP-1967")]
    Eip1967,
    #[serde(rename = "UUPS")]
    Uups,
    #[serde(rename = "Diamond")]
    Diamond,
}

impl fmt::Display for PatternName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternName::Eip1167 => write!(f, "EIP-1167"),
            PatternName::Eip1967 => write!(f, "EIP-1967"),
            PatternName::Uups => write!(f, "UUPS"),
            PatternName::Diamond => write!(f, "Diamond"),
        }
    }
}

/// A recognized proxy idiom attached to a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub name: PatternName,
    pub description: String,
}

impl PatternMatch {
    fn new(name: PatternName) -> Self {
        let description = match name {
            PatternName::Eip1167 => "Minimal proxy clone (EIP-1167)",
            PatternName::Eip1967 => "Transparent proxy implementation slot (EIP-1967)",
            PatternName::Uups => "UUPS upgradeable proxy (EIP-1822)",
            PatternName::Diamond => "Diamond facet dispatch (EIP-2535)",
        };
        Self {
            name,
            description: description.to_string(),
        }
    }
}

/// Attaches at most one pattern per site.
///
/// Priority: EIP-1167 over EIP-1967/UUPS over Diamond. `code_hex` is the raw
/// bytecode as lowercase hex without a `0x` prefix.
pub fn detect_patterns(code_hex: &str, sites: &mut [CallSite]) {
    if sites.is_empty() {
        return;
    }

    if has_eip1167_signature(code_hex) {
        tracing::debug!("EIP-1167 byte signature found; tagging all {} sites", sites.len());
        for site in sites.iter_mut() {
            site.pattern = Some(PatternMatch::new(PatternName::Eip1167));
        }
        return;
    }

    let slot_literals: BTreeSet<&str> = sites
        .iter()
        .filter_map(|site| site.classification.storage_slot_literal.as_deref())
        .collect();
    let has_uups_slot = slot_literals.contains(UUPS_IMPL_SLOT);

    for site in sites.iter_mut() {
        if site.classification.storage_slot_literal.as_deref() == Some(EIP1967_IMPL_SLOT) {
            let name = if has_uups_slot {
                PatternName::Uups
            } else {
                PatternName::Eip1967
            };
            site.pattern = Some(PatternMatch::new(name));
        }
    }

    detect_diamond(sites);
}

/// Scans for the EIP-1167 runtime: the prefix, a 20-byte implementation
/// address, then the forwarding suffix.
fn has_eip1167_signature(code_hex: &str) -> bool {
    let Some(prefix_at) = code_hex.find(EIP1167_PREFIX) else {
        return false;
    };
    let earliest_suffix = prefix_at + EIP1167_PREFIX.len() + 40;
    code_hex
        .get(earliest_suffix..)
        .is_some_and(|tail| tail.contains(EIP1167_SUFFIX))
}

/// Diamond rule: two or more storage-typed sites over two or more distinct
/// literal slots tag every still-unmatched site.
fn detect_diamond(sites: &mut [CallSite]) {
    let storage_sites = sites
        .iter()
        .filter(|site| site.classification.kind == TargetKind::Storage)
        .count();
    let distinct_slots: BTreeSet<&str> = sites
        .iter()
        .filter(|site| site.classification.kind == TargetKind::Storage)
        .filter_map(|site| site.classification.storage_slot_literal.as_deref())
        .collect();

    if storage_sites >= 2 && distinct_slots.len() >= 2 {
        for site in sites.iter_mut() {
            if site.pattern.is_none() {
                site.pattern = Some(PatternMatch::new(PatternName::Diamond));
            }
        }
    }
}
