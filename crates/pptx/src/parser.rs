//! PPTX file parser implementation.

use crate::rels::{parse_relationships, rels_path_for, resolve_target, Relationship};
use crate::shapes::{attribute, local_name, parse_shape_tree};
use deck2pdf_core::{Error, Presentation, PresentationFormat, Result, Shape, SourceSlide};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Largest uncompressed size accepted for a single archive part.
pub const MAX_PART_BYTES: u64 = 128 * 1024 * 1024;

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse an in-memory file, checking its magic bytes first.
    ///
    /// Legacy binary PPT files are recognised and rejected with
    /// [`Error::UnsupportedFormat`].
    pub fn parse_bytes(&self, data: &[u8], filename: &str) -> Result<Presentation> {
        let format = PresentationFormat::from_magic(data)
            .or_else(|| PresentationFormat::from_path(filename));

        match format {
            Some(PresentationFormat::Pptx) => self.parse(Cursor::new(data), filename),
            Some(PresentationFormat::Ppt) => Err(Error::UnsupportedFormat(format!(
                "{}: legacy binary PPT files are not supported, save it as .pptx",
                filename
            ))),
            None => Err(Error::UnsupportedFormat(format!(
                "{}: not a PowerPoint file",
                filename
            ))),
        }
    }

    /// Parse a PPTX file from a reader.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Presentation> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut presentation = Presentation::new(filename, PresentationFormat::Pptx);

        let slide_order = self.get_slide_order(&mut archive)?;
        log::debug!("{}: {} slides", filename, slide_order.len());

        for slide_path in &slide_order {
            let slide = self.parse_slide(&mut archive, slide_path)?;
            presentation.add_slide(slide);
        }

        Ok(presentation)
    }

    /// Get the ordered list of slide part names.
    ///
    /// Uses the `<p:sldIdLst>` of presentation.xml; when it is missing, falls
    /// back to every slide relationship ordered by its trailing number.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, &rels_path_for(PRESENTATION_PART))?;
        let slide_rels: Vec<Relationship> = parse_relationships(&rels_content)?
            .into_iter()
            .filter(|rel| rel.is_slide() && !rel.external)
            .collect();

        let presentation_xml = self.read_file_from_archive(archive, PRESENTATION_PART)?;
        let listed = slide_list_ids(&presentation_xml)?;

        if !listed.is_empty() {
            let by_id: HashMap<&str, &Relationship> =
                slide_rels.iter().map(|rel| (rel.id.as_str(), rel)).collect();

            let mut order = Vec::with_capacity(listed.len());
            for id in &listed {
                match by_id.get(id.as_str()) {
                    Some(rel) => order.push(resolve_target(PRESENTATION_PART, &rel.target)),
                    None => log::warn!("Slide list entry {} has no slide relationship", id),
                }
            }
            return Ok(order);
        }

        log::debug!("No slide list in presentation.xml, ordering slides by relationship");

        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .iter()
            .map(|rel| {
                let order_num = extract_slide_number(&rel.target).or_else(|| extract_slide_number(&rel.id));
                (resolve_target(PRESENTATION_PART, &rel.target), order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide and attach its picture payloads.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
    ) -> Result<SourceSlide> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let mut shapes = parse_shape_tree(&content)?;

        // A slide without pictures may also lack a rels part.
        let rels_path = rels_path_for(slide_path);
        let rels = if archive.file_names().any(|name| name == rels_path) {
            parse_relationships(&self.read_file_from_archive(archive, &rels_path)?)?
        } else {
            Vec::new()
        };

        self.attach_payloads(archive, slide_path, &rels, &mut shapes);

        Ok(SourceSlide::new(shapes))
    }

    fn attach_payloads<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        rels: &[Relationship],
        shapes: &mut [Shape],
    ) {
        for shape in shapes {
            match shape {
                Shape::Picture(picture) => {
                    let Some(embed_id) = picture.embed_id.as_deref() else {
                        continue;
                    };
                    let Some(rel) = rels.iter().find(|rel| rel.id == embed_id) else {
                        log::warn!("{}: no relationship {} for picture {:?}", slide_path, embed_id, picture.name);
                        continue;
                    };
                    if rel.external {
                        log::debug!("{}: picture {:?} is linked to {}", slide_path, picture.name, rel.target);
                        continue;
                    }
                    if !rel.is_image() {
                        log::warn!("{}: picture {:?} points at a {} part", slide_path, picture.name, rel.rel_type);
                        continue;
                    }

                    let media_path = resolve_target(slide_path, &rel.target);
                    match self.read_bytes_from_archive(archive, &media_path) {
                        Ok(data) => picture.data = Some(data),
                        Err(e) => log::warn!("{}: {}", slide_path, e),
                    }
                }
                Shape::Group(children) => self.attach_payloads(archive, slide_path, rels, children),
                Shape::Text(_) | Shape::Other => {}
            }
        }
    }

    /// Read a text file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let declared = file.size();
        let data = read_part(&mut file, declared, MAX_PART_BYTES, path)?;
        let mut content = String::from_utf8(data)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        if let Some(stripped) = content.strip_prefix('\u{FEFF}') {
            content = stripped.to_string();
        }

        Ok(content)
    }

    /// Read a binary file from the ZIP archive.
    fn read_bytes_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<Vec<u8>> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let declared = file.size();
        read_part(&mut file, declared, MAX_PART_BYTES, path)
    }
}

/// Read at most `limit` bytes of a part, rejecting parts that declare or
/// expand to more.
fn read_part<R: Read>(reader: R, declared: u64, limit: u64, path: &str) -> Result<Vec<u8>> {
    if declared > limit {
        return Err(Error::ZipError(format!(
            "'{}' declares {} bytes, above the {} byte limit",
            path, declared, limit
        )));
    }

    let mut data = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut data)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

    if data.len() as u64 > limit {
        return Err(Error::ZipError(format!(
            "'{}' expands past the {} byte limit",
            path, limit
        )));
    }

    Ok(data)
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Relationship ids of `<p:sldId>` entries, in list order.
fn slide_list_ids(presentation_xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(presentation_xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                // The relationship id is the namespaced `r:id`; the bare `id`
                // is the numeric slide id.
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref() != b"id" && local_name(attr.key.as_ref()) == b"id")
                    .map(|attr| attr.unescape_value().map(|v| v.into_owned()))
                    .transpose()
                    .map_err(|e| Error::XmlError(format!("Bad slide list entry: {}", e)))?;

                match rel_id {
                    Some(id) => ids.push(id),
                    None => {
                        if let Some(id) = attribute(e, b"id")? {
                            log::warn!("Slide list entry {} has no relationship id", id);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
