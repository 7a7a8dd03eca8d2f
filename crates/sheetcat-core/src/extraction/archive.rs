use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::SheetcatError;
use crate::extraction::ooxml::{
    self, basename, parse_relationships, parse_workbook_sheets, part_dir, rels_path_for,
    Relationship, SheetEntry,
};
use crate::extraction::ImageExtractionStrategy;
use crate::model::EmbeddedImage;

pub const MEDIA_DIR: &str = "xl/media/";

/// Upper bound on buffer space reserved from a zip header's declared size.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Owned handle over the workbook's zip container.
///
/// Opened once per run and dropped with it; every strategy reads parts
/// through this handle instead of re-opening the file.
pub struct WorkbookArchive<'a> {
    bytes: &'a [u8],
    zip: ZipArchive<Cursor<&'a [u8]>>,
    sheets: Vec<SheetEntry>,
}

fn prealloc_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// Image placement read from a drawing part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingAnchor {
    /// Relationship id from `blip@r:embed`.
    pub embed: String,
    /// 1-based anchor row, `None` for absolute anchors.
    pub row: Option<u32>,
}

/// A sheet's drawing: its anchors and the media its relationships point at.
#[derive(Debug, Clone, Default)]
pub struct SheetDrawing {
    pub anchors: Vec<DrawingAnchor>,
    /// Relationship id -> media archive path.
    pub media: BTreeMap<String, String>,
}

impl<'a> WorkbookArchive<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self, SheetcatError> {
        let zip = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| SheetcatError::Archive(format!("not a zip container: {e}")))?;
        let mut archive = WorkbookArchive {
            bytes,
            zip,
            sheets: Vec::new(),
        };

        let workbook = archive
            .read_text(ooxml::workbook_part())?
            .ok_or_else(|| SheetcatError::Archive("missing xl/workbook.xml".into()))?;
        let rels = match archive.read_text(ooxml::workbook_rels_part())? {
            Some(xml) => parse_relationships(&xml, "xl")?,
            None => Vec::new(),
        };
        archive.sheets = parse_workbook_sheets(&workbook, &rels)?;
        Ok(archive)
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn sheets(&self) -> &[SheetEntry] {
        &self.sheets
    }

    /// Raw bytes of an archive part; lookup ignores case and backslashes.
    pub fn read_part(&mut self, path: &str) -> Result<Option<Vec<u8>>, SheetcatError> {
        let wanted = path.replace('\\', "/");
        let Some(found) = self
            .zip
            .file_names()
            .find(|name| name.replace('\\', "/").eq_ignore_ascii_case(&wanted))
            .map(str::to_owned)
        else {
            return Ok(None);
        };

        let mut file = match self.zip.by_name(&found) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut buf = Vec::with_capacity(prealloc_capacity(file.size()));
        file.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    pub fn read_text(&mut self, path: &str) -> Result<Option<String>, SheetcatError> {
        Ok(self
            .read_part(path)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Every entry under `xl/media/`, in archive order.
    pub fn media_paths(&self) -> Vec<String> {
        self.zip
            .file_names()
            .filter(|name| name.replace('\\', "/").starts_with(MEDIA_DIR))
            .filter(|name| !name.ends_with('/'))
            .map(str::to_owned)
            .collect()
    }

    /// Relationships declared by `part`, resolved against its directory.
    pub fn relationships_of(&mut self, part: &str) -> Result<Vec<Relationship>, SheetcatError> {
        match self.read_text(&rels_path_for(part))? {
            Some(xml) => parse_relationships(&xml, part_dir(part)),
            None => Ok(Vec::new()),
        }
    }

    /// The drawing attached to a sheet, if any.
    pub fn sheet_drawing(&mut self, sheet: &SheetEntry) -> Result<Option<SheetDrawing>, SheetcatError> {
        let rels = self.relationships_of(&sheet.part)?;
        let Some(drawing_rel) = rels.into_iter().find(|r| r.is_kind("drawing")) else {
            return Ok(None);
        };
        let Some(xml) = self.read_text(&drawing_rel.target)? else {
            tracing::warn!("{}: drawing part {} is missing", sheet.name, drawing_rel.target);
            return Ok(None);
        };

        let media = self
            .relationships_of(&drawing_rel.target)?
            .into_iter()
            .filter(|r| r.is_kind("image"))
            .map(|r| (r.id, r.target))
            .collect();
        let anchors = parse_drawing_anchors(&xml)?;
        Ok(Some(SheetDrawing { anchors, media }))
    }

    /// Media basenames referenced by any sheet's drawing, mapped to the
    /// lowest sheet index that references them.
    pub fn media_owners(&mut self) -> Result<BTreeMap<String, usize>, SheetcatError> {
        let mut owners = BTreeMap::new();
        for sheet in self.sheets.clone() {
            let drawing = match self.sheet_drawing(&sheet) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("{}: unreadable drawing: {e}", sheet.name);
                    None
                }
            };
            for target in drawing.iter().flat_map(|d| d.media.values()) {
                owners.entry(basename(target).to_string()).or_insert(sheet.index);
            }
        }
        Ok(owners)
    }

    /// True when the archive holds images this sheet should end up with:
    /// its drawing references media, or it is the first sheet and there is
    /// media no drawing claims.
    pub fn sheet_expects_images(&mut self, sheet: &SheetEntry) -> bool {
        let media = self.media_paths();
        if media.is_empty() {
            return false;
        }
        let Ok(owners) = self.media_owners() else {
            return sheet.index == 0;
        };
        let owned_here = owners.values().any(|i| *i == sheet.index);
        let orphans = media.iter().any(|m| !owners.contains_key(basename(m)));
        owned_here || (sheet.index == 0 && orphans)
    }
}

/// Placements from a drawing part, in document order.
///
/// The anchor row comes from `to/row` when present, else `from/row`; both
/// are zero-based in the file.
pub fn parse_drawing_anchors(xml: &str) -> Result<Vec<DrawingAnchor>, SheetcatError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Marker {
        None,
        From,
        To,
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut anchors = Vec::new();
    let mut in_anchor = false;
    let mut marker = Marker::None;
    let mut in_row = false;
    let mut from_row: Option<u32> = None;
    let mut to_row: Option<u32> = None;
    let mut embed: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"twoCellAnchor" | b"oneCellAnchor" | b"absoluteAnchor" => {
                    in_anchor = true;
                    from_row = None;
                    to_row = None;
                    embed = None;
                }
                b"from" if in_anchor => marker = Marker::From,
                b"to" if in_anchor => marker = Marker::To,
                b"row" if marker != Marker::None => in_row = true,
                b"blip" if in_anchor => embed = ooxml::attribute(&e, b"embed")?,
                _ => {}
            },
            Event::Empty(e) if in_anchor && e.local_name().as_ref() == b"blip" => {
                embed = ooxml::attribute(&e, b"embed")?;
            }
            Event::Text(t) if in_row => {
                let value = t.unescape()?.trim().parse::<u32>().ok();
                match marker {
                    Marker::From => from_row = value,
                    Marker::To => to_row = value,
                    Marker::None => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"row" => in_row = false,
                b"from" | b"to" => marker = Marker::None,
                b"twoCellAnchor" | b"oneCellAnchor" | b"absoluteAnchor" => {
                    in_anchor = false;
                    if let Some(embed) = embed.take() {
                        anchors.push(DrawingAnchor {
                            embed,
                            row: to_row.or(from_row).map(|r| r + 1),
                        });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(anchors)
}

/// Reads images through the sheet's drawing relationships.
pub struct ArchiveStrategy;

impl ArchiveStrategy {
    pub fn new() -> Self {
        ArchiveStrategy
    }
}

impl Default for ArchiveStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageExtractionStrategy for ArchiveStrategy {
    fn extract(
        &self,
        archive: &mut WorkbookArchive<'_>,
        sheet: &SheetEntry,
    ) -> Result<Vec<EmbeddedImage>, SheetcatError> {
        let drawing = match archive.sheet_drawing(sheet) {
            Ok(d) => d.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("{}: malformed drawing, no placements read: {e}", sheet.name);
                SheetDrawing::default()
            }
        };
        let owners = archive.media_owners()?;
        let media_by_name: BTreeMap<String, String> = archive
            .media_paths()
            .into_iter()
            .map(|p| (basename(&p).to_string(), p))
            .collect();

        let mut images = Vec::new();
        let mut emitted: BTreeSet<String> = BTreeSet::new();

        for anchor in &drawing.anchors {
            let Some(target) = drawing.media.get(&anchor.embed) else {
                tracing::debug!("{}: anchor {} has no image relationship", sheet.name, anchor.embed);
                continue;
            };
            let name = basename(target).to_string();
            let Some(path) = media_by_name.get(&name) else {
                continue;
            };
            if let Some(bytes) = archive.read_part(path)? {
                images.push(EmbeddedImage {
                    bytes,
                    source: path.clone(),
                    anchor_row: anchor.row,
                });
                emitted.insert(name);
            }
        }

        // Referenced by this drawing but never placed.
        for target in drawing.media.values() {
            let name = basename(target).to_string();
            if emitted.contains(&name) {
                continue;
            }
            if let Some(path) = media_by_name.get(&name) {
                if let Some(bytes) = archive.read_part(path)? {
                    images.push(EmbeddedImage {
                        bytes,
                        source: path.clone(),
                        anchor_row: None,
                    });
                    emitted.insert(name);
                }
            }
        }

        if sheet.index == 0 {
            for (name, path) in &media_by_name {
                if owners.contains_key(name) || emitted.contains(name) {
                    continue;
                }
                if let Some(bytes) = archive.read_part(path)? {
                    images.push(EmbeddedImage {
                        bytes,
                        source: path.clone(),
                        anchor_row: None,
                    });
                }
            }
        }

        Ok(images)
    }

    fn name(&self) -> &str {
        "archive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAWING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing"
          xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <xdr:twoCellAnchor editAs="oneCell">
    <xdr:from><xdr:col>7</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>1</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
    <xdr:to><xdr:col>8</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>2</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
    <xdr:pic>
      <xdr:blipFill><a:blip r:embed="rId2"/></xdr:blipFill>
    </xdr:pic>
    <xdr:clientData/>
  </xdr:twoCellAnchor>
  <xdr:oneCellAnchor>
    <xdr:from><xdr:col>7</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>4</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
    <xdr:ext cx="100" cy="100"/>
    <xdr:pic>
      <xdr:blipFill><a:blip r:embed="rId1"><a:extLst/></a:blip></xdr:blipFill>
    </xdr:pic>
    <xdr:clientData/>
  </xdr:oneCellAnchor>
  <xdr:twoCellAnchor>
    <xdr:from><xdr:col>1</xdr:col><xdr:row>9</xdr:row></xdr:from>
    <xdr:to><xdr:col>3</xdr:col><xdr:row>12</xdr:row></xdr:to>
    <xdr:sp><xdr:txBody/></xdr:sp>
  </xdr:twoCellAnchor>
</xdr:wsDr>"#;

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(prealloc_capacity(2048), 2048);
        assert_eq!(prealloc_capacity(u64::MAX), MAX_PREALLOC as usize);
    }

    #[test]
    fn test_parse_drawing_anchors() {
        let anchors = parse_drawing_anchors(DRAWING).unwrap();
        assert_eq!(
            anchors,
            vec![
                DrawingAnchor {
                    embed: "rId2".into(),
                    row: Some(3),
                },
                DrawingAnchor {
                    embed: "rId1".into(),
                    row: Some(5),
                },
            ]
        );
    }

    #[test]
    fn test_malformed_drawing_is_an_error() {
        assert!(parse_drawing_anchors("<xdr:wsDr><xdr:twoCellAnchor></xdr:wsDr>").is_err());
    }

    #[test]
    fn test_open_without_workbook_part() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("hello.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            std::io::Write::write_all(&mut zip, b"hi").unwrap();
            zip.finish().unwrap();
        }
        let bytes = buf.into_inner();
        let err = WorkbookArchive::open(&bytes).err().unwrap();
        assert!(matches!(err, SheetcatError::Archive(_)));
    }
}
