//! Classification of DELEGATECALL target expressions.

use crate::patterns::EIP1967_IMPL_SLOT;
use crate::tracer::StackExpr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse provenance of a call target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Address baked into the bytecode as a 20-byte literal.
    Hardcoded,
    /// Address read from a storage slot.
    Storage,
    /// Address taken from transaction calldata.
    Calldata,
    /// Address computed at runtime from other values.
    Dynamic,
    /// Provenance could not be established.
    Unknown,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Hardcoded => write!(f, "hardcoded"),
            TargetKind::Storage => write!(f, "storage"),
            TargetKind::Calldata => write!(f, "calldata"),
            TargetKind::Dynamic => write!(f, "dynamic"),
            TargetKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classifier verdict for a single site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    /// Normalized 20-byte address literal, when the target is hardcoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_literal: Option<String>,
    /// Normalized storage-slot literal, when the target is a literal SLOAD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_slot_literal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Classification {
    fn of(kind: TargetKind) -> Self {
        Self {
            kind,
            address_literal: None,
            storage_slot_literal: None,
            details: None,
        }
    }
}

/// Lowercases a hex literal and re-attaches the `0x` prefix.
///
/// Short literals keep their value; no zero-padding is applied.
pub fn normalize_hex_literal(value: &str) -> String {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    format!("0x{}", stripped.to_ascii_lowercase())
}

/// Assigns a target kind and literal metadata to a symbolic expression.
pub fn classify_target(target: &StackExpr) -> Classification {
    match target {
        StackExpr::Literal(value) => {
            let stripped = value
                .strip_prefix("0x")
                .unwrap_or(value)
                .to_ascii_lowercase();
            if stripped.len() == 40 {
                Classification {
                    address_literal: Some(format!("0x{stripped}")),
                    ..Classification::of(TargetKind::Hardcoded)
                }
            } else {
                Classification {
                    details: Some(format!("literal({stripped})")),
                    ..Classification::of(TargetKind::Unknown)
                }
            }
        }
        StackExpr::Storage(slot) => match slot.as_ref() {
            StackExpr::Literal(slot_value) => {
                let normalized = normalize_hex_literal(slot_value);
                let details = (normalized == EIP1967_IMPL_SLOT)
                    .then(|| "EIP-1967 implementation slot".to_string());
                Classification {
                    storage_slot_literal: Some(normalized),
                    details,
                    ..Classification::of(TargetKind::Storage)
                }
            }
            _ => Classification {
                details: Some("non-literal storage slot".to_string()),
                ..Classification::of(TargetKind::Storage)
            },
        },
        StackExpr::Calldata(_) => Classification {
            details: Some("derived from CALLDATALOAD".to_string()),
            ..Classification::of(TargetKind::Calldata)
        },
        StackExpr::Op { op, .. } => Classification {
            details: Some(format!("op({op})")),
            ..Classification::of(TargetKind::Dynamic)
        },
        StackExpr::Env(_) | StackExpr::Unknown => Classification::of(TargetKind::Unknown),
    }
}
