pub mod associate;
pub mod classify;
pub mod error;
pub mod extraction;
pub mod inference;
pub mod model;
pub mod options;
pub mod parsing;
pub mod pipeline;
pub mod records;
pub mod rules;
pub mod store;

use std::sync::atomic::AtomicBool;

use error::SheetcatError;
use extraction::ImageCascade;
use model::CatalogExtraction;
use options::ExtractOptions;
use rules::Rules;

pub use store::ImageStore;

/// Main API entry point: reconstruct product records from spreadsheet bytes.
///
/// Uses the built-in rule table and the default image strategy order.
pub fn extract_catalog(
    bytes: &[u8],
    options: &ExtractOptions,
) -> Result<CatalogExtraction, SheetcatError> {
    let rules = rules::builtin::load_builtin()?;
    let cascade = pipeline::default_cascade(options);
    pipeline::run(bytes, options, &rules, &cascade, None)
}

/// Like [`extract_catalog`] with a custom rule table and strategy cascade,
/// plus an optional flag that stops the run between sheets.
pub fn extract_catalog_with(
    bytes: &[u8],
    options: &ExtractOptions,
    rules: &Rules,
    cascade: &ImageCascade,
    cancel: Option<&AtomicBool>,
) -> Result<CatalogExtraction, SheetcatError> {
    pipeline::run(bytes, options, rules, cascade, cancel)
}
