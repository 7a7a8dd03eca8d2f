pub mod builtin;
pub mod schema;

use crate::error::SheetcatError;
use crate::model::Role;
use regex::Regex;
use schema::RuleTableDef;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-=_*.~]{2,}$").expect("valid separator regex"));

/// A validated rule table with lookup indexes over its keyword lists.
#[derive(Debug, Clone)]
pub struct Rules {
    table: RuleTableDef,
    roles_by_keyword: HashMap<String, Vec<Role>>,
    structural: HashSet<String>,
    total_prefixes: Vec<String>,
    material_index: Vec<(String, HashSet<String>)>,
}

impl Rules {
    /// Validate a rule table and build its lookup indexes.
    pub fn new(table: RuleTableDef) -> Result<Rules, SheetcatError> {
        validate_rules(&table)?;

        let mut roles_by_keyword: HashMap<String, Vec<Role>> = HashMap::new();
        for (role, keywords) in &table.role_keywords {
            for kw in keywords {
                let entry = roles_by_keyword.entry(normalize_token(kw)).or_default();
                if !entry.contains(role) {
                    entry.push(*role);
                }
            }
        }

        let structural = table
            .structural_keywords
            .iter()
            .map(|s| normalize_token(s))
            .collect();
        let total_prefixes = table
            .total_prefixes
            .iter()
            .map(|s| normalize_token(s))
            .collect();
        let material_index = table
            .materials
            .iter()
            .map(|m| {
                (
                    m.label.clone(),
                    m.keywords.iter().map(|k| normalize_token(k)).collect(),
                )
            })
            .collect();

        Ok(Rules {
            table,
            roles_by_keyword,
            structural,
            total_prefixes,
            material_index,
        })
    }

    pub fn table(&self) -> &RuleTableDef {
        &self.table
    }

    /// Roles whose keyword list contains `text` exactly (after normalization).
    pub fn roles_for_keyword(&self, text: &str) -> &[Role] {
        self.roles_by_keyword
            .get(&normalize_token(text))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_role_keyword(&self, role: Role, text: &str) -> bool {
        self.roles_for_keyword(text).contains(&role)
    }

    /// True for header echoes, structural words, separator runs and bare
    /// currency tokens. Empty text is not a keyword.
    pub fn is_header_like(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        if SEPARATOR_RUN.is_match(trimmed) {
            return true;
        }
        if is_currency_only(trimmed) {
            return true;
        }
        let token = normalize_token(trimmed);
        self.structural.contains(&token) || self.roles_by_keyword.contains_key(&token)
    }

    /// True when the text opens with a total/subtotal word ("Total geral", "Subtotal: ...").
    pub fn starts_with_total(&self, text: &str) -> bool {
        let token = normalize_token(text);
        let first = token
            .split(|c: char| c.is_whitespace() || c == ':')
            .next()
            .unwrap_or("");
        self.total_prefixes.iter().any(|p| p == first || token == *p)
    }

    /// Canonical material labels whose keywords occur as words in `text`, in table order.
    pub fn materials_in(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let words: HashSet<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|w| !w.is_empty())
            .collect();
        self.material_index
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| words.contains(k.as_str())))
            .map(|(label, _)| label.clone())
            .collect()
    }
}

/// Lower-case, trim, collapse inner whitespace and drop trailing ':' / '.'.
pub fn normalize_token(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .to_lowercase()
        .trim_end_matches([':', '.'])
        .trim()
        .to_string()
}

fn is_currency_only(s: &str) -> bool {
    let upper = s.to_uppercase();
    let stripped = upper
        .replace("R$", "")
        .replace("US$", "")
        .replace(['$', '€', '£'], "");
    stripped.len() < upper.len()
        && stripped
            .chars()
            .all(|c| c.is_whitespace() || c == '-' || c == '–')
}

/// Load a rule table from a JSON file.
pub fn load_rules(path: &Path) -> Result<Rules, SheetcatError> {
    let content = std::fs::read_to_string(path).map_err(|e| SheetcatError::ConfigLoad {
        what: "rule table",
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let table: RuleTableDef =
        serde_json::from_str(&content).map_err(|e| SheetcatError::ConfigLoad {
            what: "rule table",
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Rules::new(table)
}

/// Parse a rule table from a JSON string (no file path context).
pub fn parse_rules_str(json: &str) -> Result<Rules, SheetcatError> {
    let table: RuleTableDef = serde_json::from_str(json)?;
    Rules::new(table)
}

/// Validate that a rule table is usable for inference.
pub fn validate_rules(table: &RuleTableDef) -> Result<(), SheetcatError> {
    for role in [Role::Name, Role::Code] {
        let has_keywords = table
            .role_keywords
            .get(&role)
            .map(|kws| kws.iter().any(|k| !k.trim().is_empty()))
            .unwrap_or(false);
        if !has_keywords {
            return Err(SheetcatError::RulesInvalid(format!(
                "role '{role}' needs at least one keyword"
            )));
        }
    }

    for (role, keywords) in &table.role_keywords {
        if keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(SheetcatError::RulesInvalid(format!(
                "role '{role}' has an empty keyword"
            )));
        }
    }

    for material in &table.materials {
        if material.label.trim().is_empty() {
            return Err(SheetcatError::RulesInvalid(
                "material label must not be empty".into(),
            ));
        }
        if material.keywords.is_empty() {
            return Err(SheetcatError::RulesInvalid(format!(
                "material '{}' has no keywords",
                material.label
            )));
        }
    }

    Ok(())
}
