use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Zero-based column position within a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column {}", column_letters(self.0))
    }
}

/// Spreadsheet-style column letters ("A", "B", ..., "AA").
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// An untyped cell value as read from the sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    #[default]
    Empty,
}

impl CellValue {
    /// Trimmed text form of the cell; numbers render without a trailing ".0".
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
            CellValue::Empty => true,
        }
    }
}

/// One physical sheet row, header-like rows included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based absolute row index in the sheet.
    pub row: u32,
    pub cells: BTreeMap<ColumnId, CellValue>,
}

impl RawRow {
    pub fn new(row: u32, cells: impl IntoIterator<Item = (u32, CellValue)>) -> Self {
        RawRow {
            row,
            cells: cells
                .into_iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(c, v)| (ColumnId(c), v))
                .collect(),
        }
    }

    /// Convenience constructor from positional text values; empty strings are skipped.
    pub fn from_texts(row: u32, values: &[&str]) -> Self {
        RawRow::new(
            row,
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (i as u32, CellValue::Text(v.to_string()))),
        )
    }

    pub fn get(&self, column: ColumnId) -> Option<&CellValue> {
        self.cells.get(&column)
    }

    pub fn text(&self, column: ColumnId) -> String {
        self.get(column).map(CellValue::as_text).unwrap_or_default()
    }
}

/// Semantic meaning of a column. Declaration order is the assignment priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Name,
    Code,
    Price,
    Description,
    Manufacturer,
    Location,
    Quantity,
    Category,
    Colors,
    Materials,
    Dimensions,
}

impl Role {
    pub const PRIORITY: [Role; 11] = [
        Role::Name,
        Role::Code,
        Role::Price,
        Role::Description,
        Role::Manufacturer,
        Role::Location,
        Role::Quantity,
        Role::Category,
        Role::Colors,
        Role::Materials,
        Role::Dimensions,
    ];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Name => "name",
            Role::Code => "code",
            Role::Price => "price",
            Role::Description => "description",
            Role::Manufacturer => "manufacturer",
            Role::Location => "location",
            Role::Quantity => "quantity",
            Role::Category => "category",
            Role::Colors => "colors",
            Role::Materials => "materials",
            Role::Dimensions => "dimensions",
        };
        write!(f, "{s}")
    }
}

/// Width/height/depth in centimetres plus the text they were parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub depth: Option<Decimal>,
    pub label: String,
}

/// Final output unit of an extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub code: String,
    /// Price in minor currency units (cents).
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Sheet row the record was built from (1-based).
    pub source_row: u32,
    /// Suggested asset filename until storage replaces it with a durable URL.
    pub image_reference: Option<String>,
}

/// An image pulled out of the workbook archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub bytes: Vec<u8>,
    /// Archive path (or strategy-specific source name).
    pub source: String,
    /// 1-based anchor row, `None` when unknown.
    pub anchor_row: Option<u32>,
}

/// Image bytes handed to the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    pub sheet_name: String,
    pub record_code: String,
    pub suggested_filename: String,
    pub byte_count: usize,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Outcome of one image-extraction strategy attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    pub images: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Diagnostics for one processed sheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub rows_seen: usize,
    pub rows_accepted: usize,
    pub rows_rejected: usize,
    pub header_rows: usize,
    #[serde(default)]
    pub rejected_by_reason: BTreeMap<String, usize>,
    pub images_found: usize,
    pub images_associated: usize,
    pub images_by_proximity: usize,
    pub images_by_sequence: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategy_attempts: Vec<StrategyAttempt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Records and report for a single sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetExtraction {
    pub sheet_name: String,
    pub records: Vec<ProductRecord>,
    pub report: ExtractionReport,
    /// Set when the sheet was skipped (e.g. no name/code column found).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything extracted from one workbook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogExtraction {
    pub sheets: Vec<SheetExtraction>,
    #[serde(default)]
    pub assets: Vec<ImageAsset>,
}

impl CatalogExtraction {
    pub fn records(&self) -> impl Iterator<Item = &ProductRecord> {
        self.sheets.iter().flat_map(|s| s.records.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(5), "F");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
    }

    #[test]
    fn test_number_cells_render_as_integers() {
        assert_eq!(CellValue::Number(42.0).as_text(), "42");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
        assert_eq!(CellValue::Text("  abc ".into()).as_text(), "abc");
    }

    #[test]
    fn test_raw_row_skips_empty_cells() {
        let row = RawRow::from_texts(3, &["a", "", "c"]);
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.text(ColumnId(2)), "c");
        assert_eq!(row.text(ColumnId(1)), "");
    }
}
