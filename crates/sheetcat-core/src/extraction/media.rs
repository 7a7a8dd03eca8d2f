use crate::error::SheetcatError;
use crate::extraction::archive::WorkbookArchive;
use crate::extraction::ooxml::{basename, SheetEntry};
use crate::extraction::ImageExtractionStrategy;
use crate::model::EmbeddedImage;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp", "emf", "wmf"];

/// Last-resort sweep of `xl/media`, ignoring drawings entirely.
///
/// Every file with an image extension, at least `min_bytes` long and
/// recognised by its magic bytes is emitted without an anchor. Media a
/// drawing assigns to another sheet is left alone.
pub struct MediaSweepStrategy {
    min_bytes: usize,
}

impl MediaSweepStrategy {
    pub fn new(min_bytes: usize) -> Self {
        MediaSweepStrategy { min_bytes }
    }
}

impl ImageExtractionStrategy for MediaSweepStrategy {
    fn extract(
        &self,
        archive: &mut WorkbookArchive<'_>,
        sheet: &SheetEntry,
    ) -> Result<Vec<EmbeddedImage>, SheetcatError> {
        let owners = archive.media_owners().unwrap_or_default();
        let mut images = Vec::new();

        for path in archive.media_paths() {
            let name = basename(&path);
            if !has_image_extension(name) {
                continue;
            }
            if owners.get(name).is_some_and(|owner| *owner != sheet.index) {
                continue;
            }
            let Some(bytes) = archive.read_part(&path)? else {
                continue;
            };
            if bytes.len() < self.min_bytes {
                tracing::debug!("{path}: {} bytes, below the minimum", bytes.len());
                continue;
            }
            if sniff_extension(&bytes).is_none() {
                tracing::debug!("{path}: not a recognised image");
                continue;
            }
            images.push(EmbeddedImage {
                bytes,
                source: path,
                anchor_row: None,
            });
        }

        Ok(images)
    }

    fn name(&self) -> &str {
        "media_sweep"
    }
}

fn has_image_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// File extension for image bytes, judged from their magic bytes.
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(bytes) {
        return format.extensions_str().first().copied();
    }
    // Windows metafiles: placeable WMF key, or an EMF header record.
    if bytes.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) {
        return Some("wmf");
    }
    if bytes.len() >= 44 && bytes[..4] == [1, 0, 0, 0] && &bytes[40..44] == b" EMF" {
        return Some("emf");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_sniff_extension() {
        assert_eq!(sniff_extension(PNG_MAGIC), Some("png"));
        assert_eq!(sniff_extension(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some("jpg"));
        assert_eq!(sniff_extension(b"GIF89a...."), Some("gif"));
        assert_eq!(sniff_extension(&[0xD7, 0xCD, 0xC6, 0x9A, 0, 0]), Some("wmf"));
        assert_eq!(sniff_extension(b"plain text"), None);
    }

    #[test]
    fn test_image_extensions() {
        assert!(has_image_extension("image1.PNG"));
        assert!(has_image_extension("image2.jpeg"));
        assert!(!has_image_extension("vbaProject.bin"));
        assert!(!has_image_extension("noext"));
    }
}
