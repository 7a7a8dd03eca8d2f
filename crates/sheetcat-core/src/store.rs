use crate::error::SheetcatError;
use crate::model::{CatalogExtraction, ImageAsset};

/// Durable home for extracted images, implemented by the caller.
pub trait ImageStore {
    /// Store one asset and return the URL (or path) records should point at.
    fn store(&self, asset: &ImageAsset) -> Result<String, SheetcatError>;
}

impl CatalogExtraction {
    /// Hand every asset to `store` and point the owning records at the
    /// returned location. A failed store leaves the record's suggested
    /// filename in place and adds a warning to its sheet. Returns the number
    /// of assets stored.
    pub fn persist_images(&mut self, store: &dyn ImageStore) -> usize {
        let mut stored = 0;
        for asset in &self.assets {
            let Some(sheet) = self.sheets.iter_mut().find(|s| s.sheet_name == asset.sheet_name) else {
                continue;
            };
            match store.store(asset) {
                Ok(location) => {
                    stored += 1;
                    for record in sheet.records.iter_mut().filter(|r| {
                        r.code == asset.record_code
                            && r.image_reference.as_deref() == Some(asset.suggested_filename.as_str())
                    }) {
                        record.image_reference = Some(location.clone());
                    }
                }
                Err(e) => {
                    tracing::warn!("{}: could not store {}: {e}", asset.sheet_name, asset.suggested_filename);
                    sheet
                        .report
                        .warnings
                        .push(format!("image {} not stored: {e}", asset.suggested_filename));
                }
            }
        }
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtractionReport, ProductRecord, SheetExtraction};

    struct Prefixing;

    impl ImageStore for Prefixing {
        fn store(&self, asset: &ImageAsset) -> Result<String, SheetcatError> {
            if asset.record_code == "BAD" {
                return Err(SheetcatError::Store {
                    filename: asset.suggested_filename.clone(),
                    reason: "disk full".into(),
                });
            }
            Ok(format!("https://cdn.example.com/{}", asset.suggested_filename))
        }
    }

    fn record(code: &str) -> ProductRecord {
        ProductRecord {
            name: format!("Produto {code}"),
            code: code.to_string(),
            price_cents: 100,
            description: None,
            category: None,
            colors: Vec::new(),
            materials: Vec::new(),
            sizes: None,
            dimensions: None,
            quantity: None,
            manufacturer: None,
            location: None,
            source_row: 2,
            image_reference: Some(format!("{code}.png")),
        }
    }

    fn asset(code: &str) -> ImageAsset {
        ImageAsset {
            sheet_name: "Plan1".into(),
            record_code: code.to_string(),
            suggested_filename: format!("{code}.png"),
            byte_count: 3,
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_persist_rewrites_references() {
        let mut catalog = CatalogExtraction {
            sheets: vec![SheetExtraction {
                sheet_name: "Plan1".into(),
                records: vec![record("CAD-001"), record("BAD")],
                report: ExtractionReport::default(),
                error: None,
            }],
            assets: vec![asset("CAD-001"), asset("BAD")],
        };

        let stored = catalog.persist_images(&Prefixing);
        assert_eq!(stored, 1);
        let sheet = &catalog.sheets[0];
        assert_eq!(
            sheet.records[0].image_reference.as_deref(),
            Some("https://cdn.example.com/CAD-001.png")
        );
        assert_eq!(sheet.records[1].image_reference.as_deref(), Some("BAD.png"));
        assert_eq!(sheet.report.warnings.len(), 1);
        assert!(sheet.report.warnings[0].contains("disk full"));
    }
}
