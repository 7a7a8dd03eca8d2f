pub mod archive;
pub mod cascade;
pub mod external;
pub mod media;
pub mod ooxml;
pub mod sheet;

use crate::error::SheetcatError;
use crate::model::EmbeddedImage;

pub use archive::{ArchiveStrategy, WorkbookArchive};
pub use cascade::{CascadeOutcome, ImageCascade};
pub use external::ExternalCommandStrategy;
pub use media::MediaSweepStrategy;
pub use ooxml::SheetEntry;

/// Trait for image extraction backends.
///
/// Strategies are tried in order by [`ImageCascade`]; an error or an empty
/// result on a sheet that should carry images moves on to the next one.
pub trait ImageExtractionStrategy: Send + Sync {
    /// Images belonging to `sheet`, with anchor rows where the backend knows them.
    fn extract(
        &self,
        archive: &mut WorkbookArchive<'_>,
        sheet: &SheetEntry,
    ) -> Result<Vec<EmbeddedImage>, SheetcatError>;

    /// Name of this backend (for reports and logs).
    fn name(&self) -> &str;
}
