use crate::model::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative heuristics driving column inference and row filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTableDef {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Header words that identify each role (matched case-insensitively, exactly).
    pub role_keywords: BTreeMap<Role, Vec<String>>,
    /// Words that mark a cell as structural: totals, notes, floors, currency tokens.
    #[serde(default)]
    pub structural_keywords: Vec<String>,
    /// Leading words of subtotal/total labels ("Total geral", "Subtotal sala 2").
    #[serde(default)]
    pub total_prefixes: Vec<String>,
    /// Closed material vocabulary used to derive materials from descriptions.
    #[serde(default)]
    pub materials: Vec<MaterialDef>,
    #[serde(default)]
    pub positional_fallbacks: PositionalFallbacks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDef {
    /// Canonical label reported on records.
    pub label: String,
    pub keywords: Vec<String>,
}

/// Zero-based column positions tried when a required role has no scored column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionalFallbacks {
    #[serde(default)]
    pub name: Vec<u32>,
    #[serde(default)]
    pub code: Vec<u32>,
}
