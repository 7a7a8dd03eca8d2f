use crate::error::SheetcatError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for one extraction run. Every field has a default, so a JSON
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Rows fed to column inference.
    pub sample_rows: usize,
    /// Leading rows where a keyword hit counts as a header hit.
    pub header_zone_rows: usize,
    /// Max distance in rows between an image anchor and its record.
    pub anchor_tolerance: u32,
    /// Rows per classification batch.
    pub batch_size: usize,
    /// Media smaller than this is ignored by the sweep.
    pub min_image_bytes: usize,
    pub external_extractor: Option<ExternalExtractorConfig>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            sample_rows: 20,
            header_zone_rows: 3,
            anchor_tolerance: 5,
            batch_size: 1000,
            min_image_bytes: 100,
            external_extractor: None,
        }
    }
}

/// An external program that extracts images and prints them as JSON.
///
/// `{input}` in `args` is replaced by the workbook path and `{output_dir}`
/// by a scratch directory the program may write to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalExtractorConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

pub fn load_options(path: &Path) -> Result<ExtractOptions, SheetcatError> {
    let content = std::fs::read_to_string(path).map_err(|e| SheetcatError::ConfigLoad {
        what: "options",
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| SheetcatError::ConfigLoad {
        what: "options",
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let opts: ExtractOptions = serde_json::from_str(r#"{"anchor_tolerance": 2}"#).unwrap();
        assert_eq!(opts.anchor_tolerance, 2);
        assert_eq!(opts.sample_rows, 20);
        assert!(opts.external_extractor.is_none());
    }

    #[test]
    fn test_external_extractor_timeout_default() {
        let opts: ExtractOptions = serde_json::from_str(
            r#"{"external_extractor": {"program": "extract-images", "args": ["{input}"]}}"#,
        )
        .unwrap();
        let ext = opts.external_extractor.unwrap();
        assert_eq!(ext.program, "extract-images");
        assert_eq!(ext.timeout_secs, 30);
    }

    #[test]
    fn test_load_options_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"batch_size": 50, "min_image_bytes": 0}"#).unwrap();
        let opts = load_options(file.path()).unwrap();
        assert_eq!(opts.batch_size, 50);
        assert_eq!(opts.min_image_bytes, 0);
    }

    #[test]
    fn test_load_options_reports_path() {
        let err = load_options(Path::new("/nonexistent/options.json")).unwrap_err();
        assert!(err.to_string().contains("options.json"));
    }
}
