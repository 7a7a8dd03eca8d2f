use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use crate::error::SheetcatError;
use crate::model::{CellValue, RawRow};

/// Cell reader over an xlsx workbook held in memory.
pub struct SheetReader<'a> {
    workbook: Xlsx<Cursor<&'a [u8]>>,
}

impl<'a> SheetReader<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self, SheetcatError> {
        let workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e| SheetcatError::Archive(format!("failed to open xlsx: {e}")))?;
        Ok(SheetReader { workbook })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// All non-blank rows of a sheet, tagged with their 1-based sheet row.
    pub fn read_rows(&mut self, sheet: &str) -> Result<Vec<RawRow>, SheetcatError> {
        let range = self
            .workbook
            .worksheet_range(sheet)
            .map_err(|e| SheetcatError::SheetRead {
                sheet: sheet.to_string(),
                reason: e.to_string(),
            })?;

        let Some((first_row, first_col)) = range.start() else {
            return Ok(Vec::new());
        };

        let rows = range
            .rows()
            .enumerate()
            .map(|(i, cells)| {
                RawRow::new(
                    first_row + i as u32 + 1,
                    cells
                        .iter()
                        .enumerate()
                        .map(|(j, cell)| (first_col + j as u32, cell_value(cell))),
                )
            })
            .filter(|row| !row.cells.is_empty())
            .collect();

        Ok(rows)
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Text(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Empty,
    }
}
