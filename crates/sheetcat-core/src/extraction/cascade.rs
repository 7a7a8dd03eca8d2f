use crate::associate::{associate, Binding};
use crate::extraction::archive::WorkbookArchive;
use crate::extraction::ooxml::SheetEntry;
use crate::extraction::ImageExtractionStrategy;
use crate::model::{EmbeddedImage, StrategyAttempt};

/// Ordered list of image strategies, tried until one yields usable images.
pub struct ImageCascade {
    strategies: Vec<Box<dyn ImageExtractionStrategy>>,
}

/// What the cascade settled on for one sheet.
#[derive(Debug, Default)]
pub struct CascadeOutcome {
    pub images: Vec<EmbeddedImage>,
    pub bindings: Vec<Binding>,
    /// Name of the strategy whose images were kept.
    pub winner: Option<String>,
    pub attempts: Vec<StrategyAttempt>,
}

impl ImageCascade {
    pub fn new(strategies: Vec<Box<dyn ImageExtractionStrategy>>) -> Self {
        ImageCascade { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the strategies for one sheet and bind the winning images to records.
    ///
    /// A strategy that errors, or comes back empty while the sheet should
    /// have images, hands over to the next one. Running out of strategies
    /// is not an error.
    pub fn run(
        &self,
        archive: &mut WorkbookArchive<'_>,
        sheet: &SheetEntry,
        record_rows: &[u32],
        tolerance: u32,
    ) -> CascadeOutcome {
        let expects_images = archive.sheet_expects_images(sheet);
        let mut outcome = CascadeOutcome::default();

        for strategy in &self.strategies {
            let name = strategy.name().to_string();
            let images = match strategy.extract(archive, sheet) {
                Ok(images) => images,
                Err(e) => {
                    tracing::warn!("{}: image strategy '{name}' failed: {e}", sheet.name);
                    outcome.attempts.push(StrategyAttempt {
                        strategy: name,
                        images: 0,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };
            outcome.attempts.push(StrategyAttempt {
                strategy: name.clone(),
                images: images.len(),
                error: None,
            });

            if images.is_empty() {
                if expects_images {
                    tracing::debug!("{}: '{name}' found no images, trying next", sheet.name);
                    continue;
                }
                break;
            }

            let bindings = associate(record_rows, &images, tolerance);

            tracing::info!(
                "{}: {} images from '{name}', {} bound",
                sheet.name,
                images.len(),
                bindings.len()
            );
            outcome.images = images;
            outcome.bindings = bindings;
            outcome.winner = Some(name);
            break;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SheetcatError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        name: &'static str,
        result: fn() -> Result<Vec<EmbeddedImage>, SheetcatError>,
        calls: Arc<AtomicUsize>,
    }

    impl ImageExtractionStrategy for Fixed {
        fn extract(
            &self,
            _archive: &mut WorkbookArchive<'_>,
            _sheet: &SheetEntry,
        ) -> Result<Vec<EmbeddedImage>, SheetcatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn one_image() -> Result<Vec<EmbeddedImage>, SheetcatError> {
        Ok(vec![EmbeddedImage {
            bytes: vec![1, 2, 3],
            source: "fixed".into(),
            anchor_row: Some(2),
        }])
    }

    fn failing() -> Result<Vec<EmbeddedImage>, SheetcatError> {
        Err(SheetcatError::ImageExtraction("boom".into()))
    }

    fn empty() -> Result<Vec<EmbeddedImage>, SheetcatError> {
        Ok(Vec::new())
    }

    /// Minimal workbook with one sheet and no media.
    fn bare_workbook() -> Vec<u8> {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let opts = SimpleFileOptions::default();
            zip.start_file("xl/workbook.xml", opts).unwrap();
            zip.write_all(
                br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Plan1" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            )
            .unwrap();
            zip.start_file("xl/_rels/workbook.xml.rels", opts).unwrap();
            zip.write_all(
                br#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
            )
            .unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    fn fixed(
        name: &'static str,
        result: fn() -> Result<Vec<EmbeddedImage>, SheetcatError>,
    ) -> (Box<dyn ImageExtractionStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Fixed {
            name,
            result,
            calls: Arc::clone(&calls),
        };
        (Box::new(strategy), calls)
    }

    #[test]
    fn test_failure_falls_through() {
        let bytes = bare_workbook();
        let mut archive = WorkbookArchive::open(&bytes).unwrap();
        let sheet = archive.sheets()[0].clone();
        let (first, _) = fixed("first", failing);
        let (second, _) = fixed("second", one_image);
        let cascade = ImageCascade::new(vec![first, second]);

        let outcome = cascade.run(&mut archive, &sheet, &[2, 3], 5);
        assert_eq!(outcome.winner.as_deref(), Some("second"));
        assert_eq!(outcome.images.len(), 1);
        assert_eq!(outcome.bindings.len(), 1);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(outcome.attempts[0].error.is_some());
    }

    #[test]
    fn test_empty_without_expected_images_stops() {
        let bytes = bare_workbook();
        let mut archive = WorkbookArchive::open(&bytes).unwrap();
        let sheet = archive.sheets()[0].clone();
        let (first, _) = fixed("first", empty);
        let (second, second_calls) = fixed("second", one_image);
        let cascade = ImageCascade::new(vec![first, second]);

        let outcome = cascade.run(&mut archive, &sheet, &[2], 5);
        assert!(outcome.winner.is_none());
        assert!(outcome.images.is_empty());
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_exhausted_cascade_is_not_an_error() {
        let bytes = bare_workbook();
        let mut archive = WorkbookArchive::open(&bytes).unwrap();
        let sheet = archive.sheets()[0].clone();
        let (first, _) = fixed("first", failing);
        let (second, _) = fixed("second", failing);
        let cascade = ImageCascade::new(vec![first, second]);

        let outcome = cascade.run(&mut archive, &sheet, &[2], 5);
        assert!(outcome.winner.is_none());
        assert!(outcome.bindings.is_empty());
        assert_eq!(outcome.attempts.len(), 2);
    }

    #[test]
    fn test_images_kept_for_sheet_without_records() {
        let bytes = bare_workbook();
        let mut archive = WorkbookArchive::open(&bytes).unwrap();
        let sheet = archive.sheets()[0].clone();
        let (only, _) = fixed("only", one_image);
        let cascade = ImageCascade::new(vec![only]);

        let outcome = cascade.run(&mut archive, &sheet, &[], 5);
        assert_eq!(outcome.winner.as_deref(), Some("only"));
        assert_eq!(outcome.images.len(), 1);
        assert!(outcome.bindings.is_empty());
    }
}
