use crate::classify::outcome::{RejectReason, RowVerdict};
use crate::inference::ColumnRoleMap;
use crate::model::{RawRow, Role};
use crate::rules::Rules;

/// State of a role-mapped cell as seen by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    /// The role has no column on this sheet.
    Unmapped,
    Empty,
    Keyword,
    Value(String),
}

impl Field {
    fn read(row: &RawRow, map: &ColumnRoleMap, role: Role, rules: &Rules) -> Field {
        let Some(column) = map.get(role) else {
            return Field::Unmapped;
        };
        let text = row.text(column);
        if text.is_empty() {
            Field::Empty
        } else if rules.is_header_like(&text) {
            Field::Keyword
        } else {
            Field::Value(text)
        }
    }

    /// Empty or header word; an unmapped role counts as failing too.
    fn fails(&self) -> bool {
        !matches!(self, Field::Value(_))
    }
}

/// Decide whether a raw row is a product row.
///
/// Checks run cheapest first and the first match wins:
/// 1. blank/separator row
/// 2. name and code both empty or header words
/// 3. one of name/code present while the other is empty
/// 4. price present but name and code both invalid (subtotal line)
/// 5. every mapped value is a header word
pub fn classify_row(row: &RawRow, map: &ColumnRoleMap, rules: &Rules) -> RowVerdict {
    let meaningful = row
        .cells
        .values()
        .filter(|v| v.as_text().chars().count() > 1)
        .count();
    if meaningful < 2 {
        return RowVerdict::Reject(RejectReason::Blank);
    }

    let name = Field::read(row, map, Role::Name, rules);
    let code = Field::read(row, map, Role::Code, rules);

    if name.fails() && code.fails() {
        return RowVerdict::Reject(RejectReason::HeaderEcho);
    }

    let lone = matches!((&name, &code), (Field::Value(_), Field::Empty) | (Field::Empty, Field::Value(_)));
    if lone {
        return RowVerdict::Reject(RejectReason::LoneField);
    }

    let price = Field::read(row, map, Role::Price, rules);
    if matches!(price, Field::Value(_))
        && !is_valid_name(&name, rules)
        && !is_valid_code(&code, rules)
    {
        return RowVerdict::Reject(RejectReason::Subtotal);
    }

    let mut mapped = map
        .iter()
        .map(|(_, column)| row.text(column))
        .filter(|t| !t.is_empty())
        .peekable();
    if mapped.peek().is_some() && mapped.all(|t| rules.is_header_like(&t)) {
        return RowVerdict::Reject(RejectReason::SecondaryHeader);
    }

    RowVerdict::Accept
}

/// A usable product name: has letters and isn't a total label.
fn is_valid_name(field: &Field, rules: &Rules) -> bool {
    match field {
        Field::Value(text) => {
            text.chars().filter(|c| c.is_alphabetic()).count() >= 2 && !rules.starts_with_total(text)
        }
        _ => false,
    }
}

/// A usable product code: isn't a total label or bare punctuation.
fn is_valid_code(field: &Field, rules: &Rules) -> bool {
    match field {
        Field::Value(text) => {
            text.chars().any(char::is_alphanumeric) && !rules.starts_with_total(text)
        }
        _ => false,
    }
}
