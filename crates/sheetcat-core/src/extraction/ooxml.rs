use crate::error::SheetcatError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// One `<Relationship>` entry with its target resolved to an archive path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub kind: String,
    pub target: String,
}

impl Relationship {
    /// Relationship type suffix, e.g. `drawing` or `image`.
    pub fn is_kind(&self, suffix: &str) -> bool {
        self.kind.rsplit('/').next() == Some(suffix)
    }
}

/// A worksheet as declared by the workbook part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub name: String,
    /// Position in workbook order, starting at 0.
    pub index: usize,
    /// Archive path of the worksheet part.
    pub part: String,
}

pub fn workbook_part() -> &'static str {
    WORKBOOK_PART
}

pub fn workbook_rels_part() -> &'static str {
    WORKBOOK_RELS_PART
}

/// Path of the `_rels` part that belongs to `part`.
///
/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Directory holding `part`, without a trailing slash.
pub fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the directory of its source part.
///
/// Absolute targets (`/xl/media/image1.png`) are taken from the archive root;
/// relative ones may climb with `..`.
pub fn resolve_part_path(base_dir: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base_dir.is_empty() => target,
        None => format!("{base_dir}/{target}"),
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Final path component.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parse a `.rels` part. External targets (hyperlinks) are skipped.
pub fn parse_relationships(xml: &str, base_dir: &str) -> Result<Vec<Relationship>, SheetcatError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut out = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attribute(&e, b"Id")?;
                let kind = attribute(&e, b"Type")?.unwrap_or_default();
                let target = attribute(&e, b"Target")?;
                let external = attribute(&e, b"TargetMode")?
                    .map(|m| m.eq_ignore_ascii_case("external"))
                    .unwrap_or(false);
                if external {
                    continue;
                }
                if let Some((id, target)) = id.zip(target) {
                    out.push(Relationship {
                        id,
                        kind,
                        target: resolve_part_path(base_dir, &target),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// Sheets in workbook order, with their parts taken from the workbook rels.
pub fn parse_workbook_sheets(
    workbook_xml: &str,
    rels: &[Relationship],
) -> Result<Vec<SheetEntry>, SheetcatError> {
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, b"name")?;
                let rel_id = attribute(&e, b"id")?;
                let (Some(name), Some(rel_id)) = (name, rel_id) else {
                    continue;
                };
                match rels.iter().find(|r| r.id == rel_id) {
                    Some(rel) => sheets.push(SheetEntry {
                        name,
                        index: sheets.len(),
                        part: rel.target.clone(),
                    }),
                    None => tracing::warn!("sheet '{name}' points at unknown relationship {rel_id}"),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

/// Unescaped value of the attribute whose local name is `name`.
///
/// Matching on the local name lets `r:id` and `r:embed` be found without
/// caring which prefix the producer bound to the relationships namespace.
pub(crate) fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, SheetcatError> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Móveis" sheetId="1" r:id="rId2"/>
    <sheet name="Resumo &amp; Totais" sheetId="2" r:id="rId1"/>
  </sheets>
</workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet1.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_resolve_part_path() {
        assert_eq!(resolve_part_path("xl/worksheets", "../drawings/drawing1.xml"), "xl/drawings/drawing1.xml");
        assert_eq!(resolve_part_path("xl/drawings", "../media/image1.png"), "xl/media/image1.png");
        assert_eq!(resolve_part_path("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_part_path("xl/drawings", "/xl/media/image2.jpeg"), "xl/media/image2.jpeg");
        assert_eq!(resolve_part_path("xl", "./styles.xml"), "xl/styles.xml");
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for("xl/worksheets/sheet1.xml"), "xl/worksheets/_rels/sheet1.xml.rels");
        assert_eq!(rels_path_for("xl/drawings/drawing3.xml"), "xl/drawings/_rels/drawing3.xml.rels");
    }

    #[test]
    fn test_parse_relationships_skips_external() {
        let rels = parse_relationships(WORKBOOK_RELS, "xl").unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].target, "xl/worksheets/sheet2.xml");
        assert_eq!(rels[1].target, "xl/worksheets/sheet1.xml");
        assert!(rels[0].is_kind("worksheet"));
        assert!(!rels[0].is_kind("drawing"));
    }

    #[test]
    fn test_workbook_sheets_follow_relationships() {
        let rels = parse_relationships(WORKBOOK_RELS, "xl").unwrap();
        let sheets = parse_workbook_sheets(WORKBOOK, &rels).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Móveis");
        assert_eq!(sheets[0].part, "xl/worksheets/sheet1.xml");
        assert_eq!(sheets[1].name, "Resumo & Totais");
        assert_eq!(sheets[1].index, 1);
        assert_eq!(sheets[1].part, "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("xl/media/image1.png"), "image1.png");
        assert_eq!(basename("image1.png"), "image1.png");
    }
}
