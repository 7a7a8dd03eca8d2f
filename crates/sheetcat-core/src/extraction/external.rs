use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::error::SheetcatError;
use crate::extraction::archive::WorkbookArchive;
use crate::extraction::ooxml::SheetEntry;
use crate::extraction::ImageExtractionStrategy;
use crate::model::EmbeddedImage;
use crate::options::ExternalExtractorConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Image extraction backend that shells out to a configured program.
///
/// The workbook is written to a temp file and the program is expected to
/// print `{"images": [{"image_base64", "anchor_row", "image_filename",
/// "sheet"}], "error": null}` on stdout.
pub struct ExternalCommandStrategy {
    config: ExternalExtractorConfig,
}

#[derive(Debug, Deserialize)]
struct ExternalOutput {
    #[serde(default)]
    images: Vec<ExternalImage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalImage {
    image_base64: String,
    #[serde(default)]
    anchor_row: Option<u32>,
    #[serde(default)]
    image_filename: Option<String>,
    #[serde(default)]
    sheet: Option<String>,
}

impl ExternalCommandStrategy {
    pub fn new(config: ExternalExtractorConfig) -> Self {
        ExternalCommandStrategy { config }
    }

    /// Run the program on raw workbook bytes and keep the images for `sheet`.
    pub fn run_on(&self, workbook: &[u8], sheet: &str) -> Result<Vec<EmbeddedImage>, SheetcatError> {
        let mut input = tempfile::Builder::new()
            .prefix("sheetcat-")
            .suffix(".xlsx")
            .tempfile()
            .map_err(|e| SheetcatError::ImageExtraction(e.to_string()))?;
        input
            .write_all(workbook)
            .map_err(|e| SheetcatError::ImageExtraction(e.to_string()))?;
        input
            .flush()
            .map_err(|e| SheetcatError::ImageExtraction(e.to_string()))?;
        let output_dir =
            tempfile::tempdir().map_err(|e| SheetcatError::ImageExtraction(e.to_string()))?;

        let input_path = input.path().to_string_lossy().into_owned();
        let output_path = output_dir.path().to_string_lossy().into_owned();
        let args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|a| {
                a.replace("{input}", &input_path)
                    .replace("{output_dir}", &output_path)
            })
            .collect();

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SheetcatError::ExternalNotFound {
                        program: self.config.program.clone(),
                    }
                } else {
                    SheetcatError::ImageExtraction(format!("{} failed: {e}", self.config.program))
                }
            })?;

        let stdout = self.wait_with_timeout(child)?;
        let parsed: ExternalOutput = serde_json::from_slice(&stdout)?;
        decode_images(parsed, sheet)
    }

    /// Wait for the child, killing it once the configured timeout passes.
    fn wait_with_timeout(&self, mut child: Child) -> Result<Vec<u8>, SheetcatError> {
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let deadline = Instant::now() + timeout;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                // Reader threads are left to finish on their own; a grandchild
                // may still hold the pipes open.
                return Err(SheetcatError::ExternalTimeout {
                    program: self.config.program.clone(),
                    secs: self.config.timeout_secs,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout);
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&collect(stderr)).trim().to_string();
            return Err(SheetcatError::ExternalFailed { code, stderr });
        }
        Ok(stdout)
    }
}

impl ImageExtractionStrategy for ExternalCommandStrategy {
    fn extract(
        &self,
        archive: &mut WorkbookArchive<'_>,
        sheet: &SheetEntry,
    ) -> Result<Vec<EmbeddedImage>, SheetcatError> {
        self.run_on(archive.bytes(), &sheet.name)
    }

    fn name(&self) -> &str {
        "external"
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn decode_images(output: ExternalOutput, sheet: &str) -> Result<Vec<EmbeddedImage>, SheetcatError> {
    if output.images.is_empty() {
        if let Some(error) = output.error {
            return Err(SheetcatError::ImageExtraction(error));
        }
    }

    let mut images = Vec::new();
    for (i, image) in output.images.into_iter().enumerate() {
        if image.sheet.as_deref().is_some_and(|s| s != sheet) {
            continue;
        }
        // Tolerate data URIs as well as bare base64.
        let payload = image
            .image_base64
            .split_once("base64,")
            .map(|(_, data)| data)
            .unwrap_or(&image.image_base64);
        let bytes = match STANDARD.decode(payload.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("external image {i}: invalid base64: {e}");
                continue;
            }
        };
        images.push(EmbeddedImage {
            bytes,
            source: image
                .image_filename
                .unwrap_or_else(|| format!("external-{}", i + 1)),
            anchor_row: image.anchor_row,
        });
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy(program: &str, args: &[&str], timeout_secs: u64) -> ExternalCommandStrategy {
        ExternalCommandStrategy::new(ExternalExtractorConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout_secs,
        })
    }

    #[test]
    fn test_decode_filters_by_sheet() {
        let output: ExternalOutput = serde_json::from_str(
            r#"{"images": [
                {"image_base64": "aGVsbG8=", "anchor_row": 4, "image_filename": "a.png", "sheet": "Plan1"},
                {"image_base64": "d29ybGQ=", "anchor_row": 2, "sheet": "Plan2"},
                {"image_base64": "data:image/png;base64,Zm9v"}
            ]}"#,
        )
        .unwrap();
        let images = decode_images(output, "Plan1").unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].bytes, b"hello");
        assert_eq!(images[0].anchor_row, Some(4));
        assert_eq!(images[0].source, "a.png");
        assert_eq!(images[1].bytes, b"foo");
        assert_eq!(images[1].anchor_row, None);
        assert_eq!(images[1].source, "external-3");
    }

    #[test]
    fn test_reported_error_without_images() {
        let output: ExternalOutput =
            serde_json::from_str(r#"{"images": [], "error": "no drawing found"}"#).unwrap();
        let err = decode_images(output, "Plan1").unwrap_err();
        assert!(err.to_string().contains("no drawing found"));
    }

    #[test]
    fn test_program_not_found() {
        let s = strategy("sheetcat-no-such-extractor", &[], 5);
        let err = s.run_on(b"PK", "Plan1").unwrap_err();
        assert!(matches!(err, SheetcatError::ExternalNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_success_with_input_placeholder() {
        let script = r#"test -s "$0" && printf '{"images":[{"image_base64":"aGVsbG8=","anchor_row":3}]}'"#;
        let s = strategy("sh", &["-c", script, "{input}"], 10);
        let images = s.run_on(b"workbook bytes", "Plan1").unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].anchor_row, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit() {
        let s = strategy("sh", &["-c", "echo boom >&2; exit 3"], 10);
        let err = s.run_on(b"x", "Plan1").unwrap_err();
        match err {
            SheetcatError::ExternalFailed { code, stderr } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let s = strategy("sh", &["-c", "sleep 5"], 1);
        let started = Instant::now();
        let err = s.run_on(b"x", "Plan1").unwrap_err();
        assert!(matches!(err, SheetcatError::ExternalTimeout { secs: 1, .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
