use sheetcat_core::model::{CatalogExtraction, ExtractionReport, ProductRecord, SheetExtraction};
use std::fmt::Write;

const NAME_WIDTH: usize = 40;

pub fn format_catalog(catalog: &CatalogExtraction) -> String {
    let mut out = String::new();
    for (i, sheet) in catalog.sheets.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        format_sheet(&mut out, sheet);
    }
    if catalog.sheets.is_empty() {
        out.push_str("No sheets processed.\n");
    }
    out
}

fn format_sheet(out: &mut String, sheet: &SheetExtraction) {
    let _ = writeln!(out, "=== {} ===\n", sheet.sheet_name);

    if let Some(ref err) = sheet.error {
        let _ = writeln!(out, "  Skipped: {err}");
        return;
    }

    if sheet.records.is_empty() {
        let _ = writeln!(out, "  No product rows found.\n");
    } else {
        let code_width = sheet
            .records
            .iter()
            .map(|r| r.code.chars().count())
            .max()
            .unwrap_or(4)
            .max(4);
        let _ = writeln!(
            out,
            "  {:>5}  {:<code_width$}  {:<NAME_WIDTH$}  {:>12}  Image",
            "Row", "Code", "Name", "Price"
        );
        let _ = writeln!(out, "  {}", "-".repeat(5 + code_width + NAME_WIDTH + 12 + 14));
        for record in &sheet.records {
            format_record(out, record, code_width);
        }
        out.push('\n');
    }

    format_report(out, &sheet.report);
}

fn format_record(out: &mut String, record: &ProductRecord, code_width: usize) {
    let _ = writeln!(
        out,
        "  {:>5}  {:<code_width$}  {:<NAME_WIDTH$}  {:>12}  {}",
        record.source_row,
        record.code,
        truncate(&record.name, NAME_WIDTH),
        format_cents(record.price_cents),
        record.image_reference.as_deref().unwrap_or("-")
    );
}

fn format_report(out: &mut String, report: &ExtractionReport) {
    let _ = writeln!(
        out,
        "  Rows: {} seen, {} accepted, {} rejected, {} header",
        report.rows_seen, report.rows_accepted, report.rows_rejected, report.header_rows
    );
    if !report.rejected_by_reason.is_empty() {
        let reasons: Vec<String> = report
            .rejected_by_reason
            .iter()
            .map(|(reason, n)| format!("{reason} {n}"))
            .collect();
        let _ = writeln!(out, "  Rejected: {}", reasons.join(", "));
    }

    match report.image_strategy {
        Some(ref strategy) => {
            let _ = writeln!(
                out,
                "  Images: {} found via {strategy}, {} bound ({} by position, {} by order)",
                report.images_found,
                report.images_associated,
                report.images_by_proximity,
                report.images_by_sequence
            );
        }
        None => {
            let _ = writeln!(out, "  Images: none");
        }
    }
    for attempt in report.strategy_attempts.iter().filter(|a| a.error.is_some()) {
        let _ = writeln!(
            out,
            "    {} failed: {}",
            attempt.strategy,
            attempt.error.as_deref().unwrap_or_default()
        );
    }
    for w in &report.warnings {
        let _ = writeln!(out, "  Warning: {w}");
    }
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max - 3).collect();
    cut.push_str("...");
    cut
}
