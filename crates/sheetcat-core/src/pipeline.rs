use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

use regex::Regex;

use crate::associate::BindingKind;
use crate::classify::RowVerdict;
use crate::error::SheetcatError;
use crate::extraction::media::sniff_extension;
use crate::extraction::sheet::SheetReader;
use crate::extraction::{
    ArchiveStrategy, ExternalCommandStrategy, ImageCascade, ImageExtractionStrategy,
    MediaSweepStrategy, SheetEntry, WorkbookArchive,
};
use crate::inference::infer_roles;
use crate::model::{
    CatalogExtraction, EmbeddedImage, ExtractionReport, ImageAsset, ProductRecord, SheetExtraction,
};
use crate::options::ExtractOptions;
use crate::records::extract_fields;
use crate::rules::Rules;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.]").expect("valid filename regex"));

/// Default strategy order: archive, external command when configured, media sweep.
pub fn default_cascade(options: &ExtractOptions) -> ImageCascade {
    let mut strategies: Vec<Box<dyn ImageExtractionStrategy>> = vec![Box::new(ArchiveStrategy::new())];
    if let Some(config) = &options.external_extractor {
        strategies.push(Box::new(ExternalCommandStrategy::new(config.clone())));
    }
    strategies.push(Box::new(MediaSweepStrategy::new(options.min_image_bytes)));
    ImageCascade::new(strategies)
}

/// Run every sheet of a workbook through inference, classification and the
/// image cascade.
///
/// Only an unreadable container fails the whole call. A sheet whose columns
/// cannot be placed is returned with `error` set, and image problems never
/// cost a sheet its records. When `cancel` is raised the sheets finished so
/// far are returned.
pub fn run(
    bytes: &[u8],
    options: &ExtractOptions,
    rules: &Rules,
    cascade: &ImageCascade,
    cancel: Option<&AtomicBool>,
) -> Result<CatalogExtraction, SheetcatError> {
    let mut archive = WorkbookArchive::open(bytes)?;
    let mut reader = SheetReader::open(bytes)?;

    let mut sheets: Vec<SheetEntry> = archive.sheets().to_vec();
    if sheets.is_empty() {
        sheets = reader
            .sheet_names()
            .into_iter()
            .enumerate()
            .map(|(index, name)| SheetEntry {
                name,
                index,
                part: String::new(),
            })
            .collect();
    }

    let mut catalog = CatalogExtraction::default();
    let mut used_filenames: HashSet<String> = HashSet::new();

    for sheet in &sheets {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            tracing::info!("cancelled before sheet '{}'", sheet.name);
            break;
        }

        let mut result = process_sheet(&mut reader, sheet, options, rules);
        if result.error.is_none() {
            attach_images(
                &mut archive,
                sheet,
                cascade,
                options,
                &mut result,
                &mut catalog.assets,
                &mut used_filenames,
            );
        }

        tracing::info!(
            "{}: {} records, {} rejected, {} images bound",
            sheet.name,
            result.report.rows_accepted,
            result.report.rows_rejected,
            result.report.images_associated
        );
        catalog.sheets.push(result);
    }

    Ok(catalog)
}

fn process_sheet(
    reader: &mut SheetReader<'_>,
    sheet: &SheetEntry,
    options: &ExtractOptions,
    rules: &Rules,
) -> SheetExtraction {
    let mut result = SheetExtraction {
        sheet_name: sheet.name.clone(),
        records: Vec::new(),
        report: ExtractionReport::default(),
        error: None,
    };

    let rows = match reader.read_rows(&sheet.name) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("{e}");
            result.error = Some(e.to_string());
            return result;
        }
    };
    result.report.rows_seen = rows.len();
    if rows.is_empty() {
        return result;
    }

    let sample = &rows[..rows.len().min(options.sample_rows)];
    let map = match infer_roles(&sheet.name, sample, rules, options.header_zone_rows) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("{e}");
            result.error = Some(e.to_string());
            return result;
        }
    };

    let header_row = map.header_row();
    for (batch_index, batch) in rows.chunks(options.batch_size.max(1)).enumerate() {
        let accepted_before = result.records.len();
        for row in batch {
            // Title lines above the header count with it.
            if header_row.is_some_and(|h| row.row <= h) {
                result.report.header_rows += 1;
                continue;
            }
            let fields = extract_fields(row, &map, rules);
            match fields.verdict {
                RowVerdict::Accept => {
                    if let Some(record) = fields.into_record(sheet.index) {
                        result.records.push(record);
                    }
                }
                RowVerdict::Reject(reason) => {
                    tracing::debug!("{}: row {} rejected ({reason})", sheet.name, row.row);
                    result.report.rows_rejected += 1;
                    *result
                        .report
                        .rejected_by_reason
                        .entry(reason.to_string())
                        .or_insert(0) += 1;
                }
            }
        }
        tracing::debug!(
            "{}: batch {} done, {} rows, {} accepted",
            sheet.name,
            batch_index + 1,
            batch.len(),
            result.records.len() - accepted_before
        );
    }
    result.report.rows_accepted = result.records.len();

    result
}

fn attach_images(
    archive: &mut WorkbookArchive<'_>,
    sheet: &SheetEntry,
    cascade: &ImageCascade,
    options: &ExtractOptions,
    result: &mut SheetExtraction,
    assets: &mut Vec<ImageAsset>,
    used_filenames: &mut HashSet<String>,
) {
    let record_rows: Vec<u32> = result.records.iter().map(|r| r.source_row).collect();
    let outcome = cascade.run(archive, sheet, &record_rows, options.anchor_tolerance);

    let report = &mut result.report;
    report.images_found = outcome.images.len();
    report.image_strategy = outcome.winner;
    report.strategy_attempts = outcome.attempts;

    for binding in &outcome.bindings {
        let record: &mut ProductRecord = &mut result.records[binding.record];
        let image = &outcome.images[binding.image];
        let filename = suggested_filename(&record.code, image, used_filenames);
        record.image_reference = Some(filename.clone());
        assets.push(ImageAsset {
            sheet_name: sheet.name.clone(),
            record_code: record.code.clone(),
            suggested_filename: filename,
            byte_count: image.bytes.len(),
            bytes: image.bytes.clone(),
        });
        match binding.kind {
            BindingKind::Proximity => report.images_by_proximity += 1,
            BindingKind::Sequential => report.images_by_sequence += 1,
        }
    }
    report.images_associated = outcome.bindings.len();

    let unbound = outcome.images.len() - outcome.bindings.len();
    if unbound > 0 {
        report
            .warnings
            .push(format!("{unbound} images not bound to any record"));
    }
}

/// `<code>.<ext>` with unsafe characters replaced, suffixed `_1`, `_2`, ...
/// until unused.
fn suggested_filename(code: &str, image: &EmbeddedImage, used: &mut HashSet<String>) -> String {
    let stem = UNSAFE_FILENAME_CHARS.replace_all(code, "_").into_owned();
    let ext = sniff_extension(&image.bytes)
        .map(str::to_string)
        .or_else(|| {
            image
                .source
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .filter(|ext| !ext.is_empty() && !ext.contains('/'))
        })
        .unwrap_or_else(|| "bin".to_string());

    let mut candidate = format!("{stem}.{ext}");
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{stem}_{n}.{ext}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}
