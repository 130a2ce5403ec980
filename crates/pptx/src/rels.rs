//! Package relationship (`.rels`) parsing and part-name resolution.

use crate::shapes::local_name;
use deck2pdf_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Relationship type of a presentation's slides.
pub const SLIDE_REL_TYPE_SUFFIX: &str = "/slide";

/// Relationship type of embedded pictures.
pub const IMAGE_REL_TYPE_SUFFIX: &str = "/image";

/// One `<Relationship>` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `TargetMode="External"`: the target is a URL, not a package part.
    pub external: bool,
}

impl Relationship {
    pub fn is_slide(&self) -> bool {
        self.rel_type.ends_with(SLIDE_REL_TYPE_SUFFIX)
    }

    pub fn is_image(&self) -> bool {
        self.rel_type.ends_with(IMAGE_REL_TYPE_SUFFIX)
    }
}

/// Parse every relationship of a `.rels` part.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                    external: false,
                };

                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map_err(|e| Error::XmlError(format!("Bad relationship attribute: {}", e)))?;
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value.into_owned(),
                        b"Type" => rel.rel_type = value.into_owned(),
                        b"Target" => rel.target = value.into_owned(),
                        b"TargetMode" => rel.external = value.eq_ignore_ascii_case("external"),
                        _ => {}
                    }
                }

                if !rel.id.is_empty() {
                    relationships.push(rel);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Path of the relationships part belonging to `part`.
///
/// `ppt/slides/slide1.xml` becomes `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it.
///
/// Absolute targets lose their leading slash; relative targets are joined to
/// the source part's directory with `.` and `..` segments folded.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout2.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="https://example.com/a&amp;b.png" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_relationships() {
        let rels = parse_relationships(SLIDE_RELS).unwrap();

        assert_eq!(rels.len(), 3);
        assert!(!rels[0].is_image());
        assert!(!rels[0].is_slide());
        assert_eq!(rels[1].id, "rId2");
        assert!(rels[1].is_image());
        assert_eq!(rels[1].target, "../media/image1.png");
        assert!(!rels[1].external);
        assert!(rels[2].external);
        assert_eq!(rels[2].target, "https://example.com/a&b.png");
    }

    #[test]
    fn test_slide_relationship_type() {
        let rel = Relationship {
            id: "rId2".into(),
            rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide".into(),
            target: "slides/slide1.xml".into(),
            external: false,
        };
        assert!(rel.is_slide());

        let master = Relationship {
            rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster".into(),
            ..rel
        };
        assert!(!master.is_slide());
    }

    #[test]
    fn test_parse_relationships_rejects_malformed_xml() {
        let err = parse_relationships("<Relationships><Relationship Id=\"x\"></Oops>").unwrap_err();
        assert!(matches!(err, Error::XmlError(_)));
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels_path_for("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
        assert_eq!(rels_path_for("root.xml"), "_rels/root.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "../media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_target("ppt/presentation.xml", "slides/slide3.xml"), "ppt/slides/slide3.xml");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "/ppt/media/x.jpeg"), "ppt/media/x.jpeg");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "./local.png"), "ppt/slides/local.png");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "../../../up.png"), "up.png");
    }
}
