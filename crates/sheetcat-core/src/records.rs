use crate::classify::{classify_row, RowVerdict};
use crate::inference::ColumnRoleMap;
use crate::model::{CellValue, Dimensions, ProductRecord, RawRow, Role};
use crate::parsing::{parse_dimensions, parse_list, parse_materials, parse_price_cell};
use crate::rules::Rules;
use serde::{Deserialize, Serialize};

/// Typed values pulled from one row, before it becomes a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExtractionResult {
    pub row: u32,
    pub name: Option<String>,
    pub code: Option<String>,
    pub price_cents: i64,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<u32>,
    pub dimensions: Option<Dimensions>,
    pub colors: Vec<String>,
    pub materials: Vec<String>,
    pub verdict: RowVerdict,
}

/// Classify a row and, when accepted, normalize its mapped fields.
pub fn extract_fields(row: &RawRow, map: &ColumnRoleMap, rules: &Rules) -> FieldExtractionResult {
    let verdict = classify_row(row, map, rules);
    let cell = |role: Role| -> CellValue {
        map.get(role)
            .and_then(|c| row.get(c))
            .cloned()
            .unwrap_or_default()
    };
    let text = |role: Role| -> Option<String> {
        let t = cell(role).as_text();
        (!t.is_empty()).then_some(t)
    };

    if !verdict.is_accept() {
        return FieldExtractionResult {
            row: row.row,
            name: text(Role::Name),
            code: text(Role::Code),
            price_cents: 0,
            description: None,
            manufacturer: None,
            location: None,
            category: None,
            quantity: None,
            dimensions: None,
            colors: Vec::new(),
            materials: Vec::new(),
            verdict,
        };
    }

    let description = text(Role::Description);
    let dimensions = text(Role::Dimensions).and_then(|d| parse_dimensions(&d));

    FieldExtractionResult {
        row: row.row,
        name: text(Role::Name),
        code: text(Role::Code),
        price_cents: parse_price_cell(&cell(Role::Price)),
        manufacturer: text(Role::Manufacturer),
        location: text(Role::Location),
        category: text(Role::Category),
        quantity: parse_quantity(&cell(Role::Quantity)),
        dimensions,
        colors: parse_list(&cell(Role::Colors)),
        materials: parse_materials(&cell(Role::Materials), description.as_deref(), rules),
        description,
        verdict,
    }
}

impl FieldExtractionResult {
    /// Turn an accepted row into a record. A missing code is synthesized from
    /// the sheet position; a missing name falls back to the description or code.
    pub fn into_record(self, sheet_index: usize) -> Option<ProductRecord> {
        if !self.verdict.is_accept() {
            return None;
        }
        let code = self
            .code
            .unwrap_or_else(|| format!("AUTO-{}-{}", sheet_index + 1, self.row));
        let name = self
            .name
            .or_else(|| {
                self.description
                    .as_deref()
                    .and_then(|d| d.lines().next())
                    .map(|l| l.trim().to_string())
            })
            .unwrap_or_else(|| code.clone());

        Some(ProductRecord {
            name,
            code,
            price_cents: self.price_cents,
            description: self.description,
            category: self.category,
            colors: self.colors,
            materials: self.materials,
            sizes: self.dimensions.as_ref().map(|d| d.label.clone()),
            dimensions: self.dimensions,
            quantity: self.quantity,
            manufacturer: self.manufacturer,
            location: self.location,
            source_row: self.row,
            image_reference: None,
        })
    }
}

fn parse_quantity(cell: &CellValue) -> Option<u32> {
    match cell {
        CellValue::Number(n) if *n >= 0.0 && *n < u32::MAX as f64 => Some(n.round() as u32),
        CellValue::Text(s) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RejectReason;
    use crate::rules::builtin::load_builtin;
    use rust_decimal_macros::dec;

    fn full_map() -> ColumnRoleMap {
        ColumnRoleMap::from_pairs([
            (Role::Name, 0),
            (Role::Code, 1),
            (Role::Price, 2),
            (Role::Description, 3),
            (Role::Quantity, 4),
            (Role::Dimensions, 5),
            (Role::Colors, 6),
        ])
    }

    #[test]
    fn test_accepted_row_becomes_record() {
        let rules = load_builtin().unwrap();
        let row = RawRow::from_texts(
            4,
            &[
                "Mesa Reta",
                "MES-010",
                "R$ 1.299,90",
                "Tampo em MDF com pés de aço",
                "3 un",
                "1,20 x 0,75 x 0,60",
                "Branco; Preto",
            ],
        );
        let fields = extract_fields(&row, &full_map(), &rules);
        assert!(fields.verdict.is_accept());
        let record = fields.into_record(0).unwrap();
        assert_eq!(record.name, "Mesa Reta");
        assert_eq!(record.code, "MES-010");
        assert_eq!(record.price_cents, 129990);
        assert_eq!(record.quantity, Some(3));
        assert_eq!(record.colors, vec!["Branco", "Preto"]);
        assert_eq!(record.materials, vec!["Madeira", "Metal"]);
        let dims = record.dimensions.unwrap();
        assert_eq!(dims.width, Some(dec!(120)));
        assert_eq!(record.sizes.as_deref(), Some("1,20 x 0,75 x 0,60"));
        assert_eq!(record.source_row, 4);
        assert!(record.image_reference.is_none());
    }

    #[test]
    fn test_rejected_row_has_no_record() {
        let rules = load_builtin().unwrap();
        let row = RawRow::from_texts(1, &["Nome", "Código", "Preço"]);
        let fields = extract_fields(&row, &full_map(), &rules);
        assert_eq!(fields.verdict, RowVerdict::Reject(RejectReason::HeaderEcho));
        assert!(fields.into_record(0).is_none());
    }

    #[test]
    fn test_code_synthesized_when_unmapped() {
        let rules = load_builtin().unwrap();
        let map = ColumnRoleMap::from_pairs([(Role::Name, 0), (Role::Price, 1)]);
        let row = RawRow::from_texts(9, &["Sofá Retrátil", "3.500,00"]);
        let record = extract_fields(&row, &map, &rules).into_record(1).unwrap();
        assert_eq!(record.code, "AUTO-2-9");
        assert_eq!(record.price_cents, 350000);
    }

    #[test]
    fn test_name_falls_back_to_code() {
        let rules = load_builtin().unwrap();
        let map = ColumnRoleMap::from_pairs([(Role::Code, 0), (Role::Price, 1)]);
        let row = RawRow::from_texts(2, &["CAD-001", "10,00"]);
        let record = extract_fields(&row, &map, &rules).into_record(0).unwrap();
        assert_eq!(record.name, "CAD-001");
    }
}
