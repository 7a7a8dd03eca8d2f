use crate::model::{CellValue, Role};
use crate::parsing::dimensions::parse_dimensions;
use regex::Regex;
use std::sync::LazyLock;

static PRICE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(\d+([.,]\d{1,2})?|\d{1,3}([.,]\d{3})+([.,]\d{1,2})?)$").expect("valid price regex")
});
static CODE_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\d][\p{L}\d\-_./#]{1,23}$").expect("valid code regex"));
static DATE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}|\d{4}-\d{2}-\d{2}([ t].*)?)$").expect("valid date regex")
});
static MONTH_ABBREV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(jan(eiro|uary)?|fev(ereiro)?|feb(ruary)?|mar(ço|co|ch)?|abr(il)?|apr(il)?|mai(o)?|may",
        r"|jun(ho|e)?|jul(ho|y)?|ago(sto)?|aug(ust)?|set(embro)?|sep(tember)?|out(ubro)?|oct(ober)?",
        r"|nov(embro|ember)?|dez(embro)?|dec(ember)?)\.?([/\-. ]?\d{2,4})?$"
    ))
    .expect("valid month regex")
});

/// Shape of a single cell value, as used by column inference.
pub fn matches_shape(role: Role, cell: &CellValue) -> bool {
    if cell.is_empty() {
        return false;
    }
    match role {
        Role::Price => is_price_like(cell),
        Role::Code => is_code_like(cell),
        Role::Name => is_name_like(cell),
        Role::Description => is_description_like(cell),
        Role::Quantity => is_quantity_like(cell),
        Role::Dimensions => parse_dimensions(&cell.as_text()).is_some() && !is_price_like(cell),
        _ => false,
    }
}

/// Digits with an optional 1-2 digit decimal part, after currency symbols are stripped.
pub fn is_price_like(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(n) => *n >= 0.0,
        CellValue::Text(s) => {
            if is_date_like(s) {
                return false;
            }
            let stripped: String = s
                .replace("R$", "")
                .replace("US$", "")
                .chars()
                .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£'))
                .collect();
            PRICE_LIKE.is_match(&stripped)
        }
        CellValue::Empty => false,
    }
}

/// Short alphanumeric token without spaces that contains at least one digit.
pub fn is_code_like(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(n) => n.fract() == 0.0 && *n >= 0.0,
        CellValue::Text(s) => {
            let t = s.trim();
            CODE_LIKE.is_match(t) && t.chars().any(|c| c.is_ascii_digit()) && !is_date_like(t)
        }
        CellValue::Empty => false,
    }
}

/// Text containing a space, 4 to 60 characters long, that isn't a number or dimension.
pub fn is_name_like(cell: &CellValue) -> bool {
    let CellValue::Text(s) = cell else {
        return false;
    };
    let t = s.trim();
    let len = t.chars().count();
    (4..=60).contains(&len)
        && t.contains(' ')
        && t.chars().any(char::is_alphabetic)
        && !is_price_like(cell)
        && !is_date_like(t)
}

/// Free text with spaces, longer than a typical product name.
pub fn is_description_like(cell: &CellValue) -> bool {
    let CellValue::Text(s) = cell else {
        return false;
    };
    let t = s.trim();
    t.chars().count() > 40 && t.split_whitespace().count() >= 5
}

/// Small non-negative integer.
pub fn is_quantity_like(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(n) => n.fract() == 0.0 && (0.0..10_000.0).contains(n),
        CellValue::Text(s) => s
            .trim()
            .parse::<u32>()
            .map(|q| q < 10_000)
            .unwrap_or(false),
        CellValue::Empty => false,
    }
}

/// `dd/mm/yyyy`, ISO dates, or a month abbreviation ("jan/24", "Março").
pub fn is_date_like(s: &str) -> bool {
    let t = s.trim().to_lowercase();
    !t.is_empty() && (DATE_LIKE.is_match(&t) || MONTH_ABBREV.is_match(&t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_price_like() {
        assert!(is_price_like(&text("R$ 1.234,56")));
        assert!(is_price_like(&text("99,90")));
        assert!(is_price_like(&text("1500")));
        assert!(is_price_like(&CellValue::Number(12.5)));
        assert!(!is_price_like(&text("CAD-001")));
        assert!(!is_price_like(&text("12/05/2024")));
        assert!(!is_price_like(&text("1,2345")));
    }

    #[test]
    fn test_code_like() {
        assert!(is_code_like(&text("CAD-001")));
        assert!(is_code_like(&text("7891234")));
        assert!(is_code_like(&CellValue::Number(1001.0)));
        assert!(!is_code_like(&text("Cadeira Office X")));
        assert!(!is_code_like(&text("ABC")));
        assert!(!is_code_like(&text("01/02/2024")));
    }

    #[test]
    fn test_name_like() {
        assert!(is_name_like(&text("Cadeira Office X")));
        assert!(!is_name_like(&text("Cadeira")));
        assert!(!is_name_like(&text("1 234")));
    }

    #[test]
    fn test_date_like() {
        assert!(is_date_like("12/05/2024"));
        assert!(is_date_like("2024-05-12"));
        assert!(is_date_like("Jan/24"));
        assert!(is_date_like("março"));
        assert!(!is_date_like("Mesa lateral"));
        assert!(!is_date_like("CAD-001"));
    }

    #[test]
    fn test_quantity_like() {
        assert!(is_quantity_like(&text("12")));
        assert!(is_quantity_like(&CellValue::Number(3.0)));
        assert!(!is_quantity_like(&CellValue::Number(3.5)));
        assert!(!is_quantity_like(&text("doze")));
    }
}
