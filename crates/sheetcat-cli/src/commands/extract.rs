use sheetcat_core::error::SheetcatError;
use sheetcat_core::model::ImageAsset;
use sheetcat_core::options::{load_options, ExternalExtractorConfig, ExtractOptions};
use sheetcat_core::rules::{builtin, load_rules};
use sheetcat_core::{pipeline, ImageStore};
use std::path::PathBuf;

use crate::output;

pub struct ExtractArgs {
    pub input_file: PathBuf,
    pub output_format: String,
    pub out: Option<PathBuf>,
    pub images_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub external_extractor: Option<String>,
    pub external_args: Vec<String>,
    pub external_timeout: Option<u64>,
}

/// Writes each asset as a file in a directory.
struct DirectoryStore {
    dir: PathBuf,
}

impl ImageStore for DirectoryStore {
    fn store(&self, asset: &ImageAsset) -> Result<String, SheetcatError> {
        let path = self.dir.join(&asset.suggested_filename);
        std::fs::write(&path, &asset.bytes).map_err(|e| SheetcatError::Store {
            filename: asset.suggested_filename.clone(),
            reason: e.to_string(),
        })?;
        Ok(path.display().to_string())
    }
}

pub fn run(args: ExtractArgs) -> Result<(), SheetcatError> {
    let mut options = match &args.config {
        Some(path) => load_options(path)?,
        None => ExtractOptions::default(),
    };
    if let Some(program) = args.external_extractor {
        options.external_extractor = Some(ExternalExtractorConfig {
            program,
            args: args.external_args,
            timeout_secs: args.external_timeout.unwrap_or(30),
        });
    } else if let (Some(secs), Some(ext)) = (args.external_timeout, options.external_extractor.as_mut()) {
        ext.timeout_secs = secs;
    }

    let rules = match &args.rules {
        Some(path) => load_rules(path)?,
        None => builtin::load_builtin()?,
    };

    let bytes = std::fs::read(&args.input_file)?;
    let cascade = pipeline::default_cascade(&options);
    tracing::debug!("image strategies: {}", cascade.strategy_names().join(", "));
    let mut catalog = sheetcat_core::extract_catalog_with(&bytes, &options, &rules, &cascade, None)?;

    if let Some(dir) = args.images_dir {
        std::fs::create_dir_all(&dir)?;
        let stored = catalog.persist_images(&DirectoryStore { dir: dir.clone() });
        eprintln!("Stored {stored} image(s) in {}", dir.display());
    }

    match args.out {
        Some(path) => {
            // Always write JSON when saving to file
            let json = serde_json::to_string_pretty(&catalog)?;
            std::fs::write(&path, json)?;
            eprintln!(
                "Extracted {} record(s) from {} sheet(s), written to {}",
                catalog.records().count(),
                catalog.sheets.len(),
                path.display()
            );
            for sheet in &catalog.sheets {
                if let Some(ref err) = sheet.error {
                    eprintln!("  skipped '{}': {err}", sheet.sheet_name);
                }
                for w in &sheet.report.warnings {
                    eprintln!("  warning ({}): {w}", sheet.sheet_name);
                }
            }
        }
        None => match args.output_format.as_str() {
            "json" => output::json::print(&catalog)?,
            _ => println!("{}", output::table::format_catalog(&catalog)),
        },
    }

    Ok(())
}
