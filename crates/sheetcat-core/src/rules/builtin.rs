use crate::error::SheetcatError;
use crate::rules::Rules;
use crate::rules::schema::RuleTableDef;

const CATALOG_RULES_JSON: &str = include_str!("../../../../rules/catalog-rules.json");

/// Load the built-in rule table shipped with the crate.
pub fn load_builtin() -> Result<Rules, SheetcatError> {
    let table: RuleTableDef = serde_json::from_str(CATALOG_RULES_JSON)?;
    Rules::new(table)
}

/// The built-in rule table as pretty-printed JSON, for inspection or as a
/// starting point for a custom table.
pub fn builtin_json() -> &'static str {
    CATALOG_RULES_JSON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn test_load_builtin() {
        let rules = load_builtin().unwrap();
        assert!(rules.is_role_keyword(Role::Code, "Código"));
        assert!(rules.is_role_keyword(Role::Price, "PREÇO:"));
        assert!(!rules.is_role_keyword(Role::Name, "Cadeira"));
    }

    #[test]
    fn test_builtin_has_fallbacks() {
        let rules = load_builtin().unwrap();
        assert_eq!(rules.table().positional_fallbacks.name, vec![0]);
        assert_eq!(rules.table().positional_fallbacks.code, vec![5, 1, 0]);
    }
}
