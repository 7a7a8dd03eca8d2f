use crate::model::EmbeddedImage;
use serde::{Deserialize, Serialize};

/// How an image was matched to its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// Anchor row within tolerance of the record's source row.
    Proximity,
    /// Paired by order after proximity matching was exhausted.
    Sequential,
}

/// Image `image` (index into the image list) belongs to record `record`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub record: usize,
    pub image: usize,
    pub kind: BindingKind,
}

/// Match images to records by anchor row, then pair leftovers in order.
///
/// `record_rows` are the records' source rows, in record order. Each record
/// and each image is used at most once.
pub fn associate(record_rows: &[u32], images: &[EmbeddedImage], tolerance: u32) -> Vec<Binding> {
    let mut record_taken = vec![false; record_rows.len()];
    let mut image_taken = vec![false; images.len()];
    let mut bindings = Vec::new();

    for (image_index, image) in images.iter().enumerate() {
        let Some(anchor) = image.anchor_row else {
            continue;
        };
        let nearest = record_rows
            .iter()
            .enumerate()
            .filter(|(i, _)| !record_taken[*i])
            .map(|(i, row)| (i, row.abs_diff(anchor)))
            .filter(|(_, distance)| *distance <= tolerance)
            .min_by_key(|(i, distance)| (*distance, record_rows[*i]));
        if let Some((record_index, _)) = nearest {
            record_taken[record_index] = true;
            image_taken[image_index] = true;
            bindings.push(Binding {
                record: record_index,
                image: image_index,
                kind: BindingKind::Proximity,
            });
        }
    }

    let free_records = (0..record_rows.len()).filter(|i| !record_taken[*i]);
    let free_images = (0..images.len()).filter(|i| !image_taken[*i]);
    for (record, image) in free_records.zip(free_images) {
        bindings.push(Binding {
            record,
            image,
            kind: BindingKind::Sequential,
        });
    }

    bindings
}
