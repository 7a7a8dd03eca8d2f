use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SheetcatError {
    #[error("cannot open spreadsheet archive: {0}")]
    Archive(String),

    #[error("sheet '{sheet}': could not place either the name or the code column")]
    RolesUndetectable { sheet: String },

    #[error("failed to read sheet '{sheet}': {reason}")]
    SheetRead { sheet: String, reason: String },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("image extraction failed: {0}")]
    ImageExtraction(String),

    #[error("external extractor '{program}' not found on PATH")]
    ExternalNotFound { program: String },

    #[error("external extractor failed with exit code {code}: {stderr}")]
    ExternalFailed { code: i32, stderr: String },

    #[error("external extractor '{program}' did not finish within {secs}s")]
    ExternalTimeout { program: String, secs: u64 },

    #[error("failed to load {what} from {path}: {reason}")]
    ConfigLoad {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("invalid rule table: {0}")]
    RulesInvalid(String),

    #[error("image store rejected '{filename}': {reason}")]
    Store { filename: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}
