use crate::model::CellValue;
use crate::rules::Rules;

/// Split a colors/materials cell into trimmed, non-empty entries.
///
/// A JSON array (`["Preto", "Branco"]`) is decoded as-is; anything else is
/// split on commas and semicolons.
pub fn parse_list(cell: &CellValue) -> Vec<String> {
    let text = cell.as_text();
    if text.is_empty() {
        return Vec::new();
    }

    if text.starts_with('[') && text.ends_with(']') {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(&text) {
            return clean(items);
        }
        return split_delimited(&text[1..text.len() - 1]);
    }

    split_delimited(&text)
}

/// Materials from the materials cell, or derived from the description when
/// the cell yields nothing.
pub fn parse_materials(cell: &CellValue, description: Option<&str>, rules: &Rules) -> Vec<String> {
    let listed = parse_list(cell);
    if !listed.is_empty() {
        return listed;
    }
    description
        .map(|d| rules.materials_in(d))
        .unwrap_or_default()
}

fn split_delimited(s: &str) -> Vec<String> {
    clean(
        s.split([',', ';'])
            .map(|item| item.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\''))
            .map(str::to_string)
            .collect(),
    )
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::builtin::load_builtin;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_delimited() {
        assert_eq!(parse_list(&text("Preto, Branco;  Cinza ,")), vec!["Preto", "Branco", "Cinza"]);
    }

    #[test]
    fn test_json_array() {
        assert_eq!(parse_list(&text(r#"["Azul", " Verde "]"#)), vec!["Azul", "Verde"]);
    }

    #[test]
    fn test_bracketed_but_not_json() {
        assert_eq!(parse_list(&text("[Azul, Verde]")), vec!["Azul", "Verde"]);
    }

    #[test]
    fn test_empty() {
        assert!(parse_list(&CellValue::Empty).is_empty());
        assert!(parse_list(&text(" ; , ")).is_empty());
    }

    #[test]
    fn test_materials_from_description() {
        let rules = load_builtin().unwrap();
        let found = parse_materials(
            &CellValue::Empty,
            Some("Poltrona em couro natural com base de alumínio"),
            &rules,
        );
        assert_eq!(found, vec!["Metal", "Couro"]);
    }

    #[test]
    fn test_listed_materials_win() {
        let rules = load_builtin().unwrap();
        let found = parse_materials(&text("Carvalho"), Some("Mesa em vidro"), &rules);
        assert_eq!(found, vec!["Carvalho"]);
    }
}
