//! In-memory PPTX builders for tests.
//!
//! Produces minimal but well-formed packages: content types, a presentation
//! part with its slide list, slide parts, their relationships and media.

use image::{DynamicImage, ImageFormat};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Encode a black RGB picture of the given size as PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode fixture png");
    buffer.into_inner()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Debug, Clone)]
enum Media {
    Embedded(Vec<u8>),
    Linked(String),
}

/// One slide's shape tree under construction.
#[derive(Debug, Clone, Default)]
pub struct FixtureSlide {
    shapes: Vec<String>,
    media: Vec<Media>,
    next_id: u32,
}

impl FixtureSlide {
    pub fn new() -> Self {
        Self {
            next_id: 2,
            ..Self::default()
        }
    }

    fn shape_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn media_rel(&mut self, media: Media) -> String {
        self.media.push(media);
        // rId1 is the slide layout.
        format!("rId{}", self.media.len() + 1)
    }

    /// A text box with one paragraph per entry; `\n` inside an entry becomes
    /// a line break.
    pub fn text_box(mut self, paragraphs: &[&str]) -> Self {
        let id = self.shape_id();
        let body: String = paragraphs
            .iter()
            .map(|paragraph| {
                if paragraph.is_empty() {
                    return r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#.to_string();
                }
                let runs: Vec<String> = paragraph
                    .split('\n')
                    .map(|line| format!(r#"<a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r>"#, escape(line)))
                    .collect();
                format!("<a:p>{}</a:p>", runs.join("<a:br/>"))
            })
            .collect();

        self.shapes.push(format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{body}</p:txBody></p:sp>"#
        ));
        self
    }

    /// A native picture embedding `data`.
    pub fn picture(mut self, data: Vec<u8>) -> Self {
        let rel = self.media_rel(Media::Embedded(data));
        let id = self.shape_id();
        self.push_picture(id, &rel);
        self
    }

    /// A picture whose relationship points outside the package.
    pub fn linked_picture(mut self, url: &str) -> Self {
        let rel = self.media_rel(Media::Linked(url.to_string()));
        let id = self.shape_id();
        self.push_picture(id, &rel);
        self
    }

    /// An empty picture placeholder inherited from the layout.
    pub fn placeholder_picture(mut self) -> Self {
        let id = self.shape_id();
        self.shapes.push(format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture Placeholder {id}"/><p:cNvPicPr/><p:nvPr><p:ph type="pic" idx="1"/></p:nvPr></p:nvPicPr><p:blipFill/><p:spPr/></p:pic>"#
        ));
        self
    }

    fn push_picture(&mut self, id: u32, rel: &str) {
        self.shapes.push(format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr/></p:pic>"#
        ));
    }

    /// A one-cell table.
    pub fn table(mut self, cell: &str) -> Self {
        let id = self.shape_id();
        self.shapes.push(format!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tr h="370840"><a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></a:txBody></a:tc></a:tr></a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
            escape(cell)
        ));
        self
    }

    /// Raw XML placed as-is into the shape tree.
    pub fn raw(mut self, xml: &str) -> Self {
        self.shapes.push(xml.to_string());
        self
    }

    /// A group shape whose children are built by `build`.
    pub fn group(mut self, build: impl FnOnce(FixtureSlide) -> FixtureSlide) -> Self {
        let id = self.shape_id();
        let inner = FixtureSlide {
            shapes: Vec::new(),
            media: std::mem::take(&mut self.media),
            next_id: self.next_id,
        };
        let inner = build(inner);

        self.media = inner.media;
        self.next_id = inner.next_id;
        self.shapes.push(format!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="{id}" name="Group {id}"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:grpSp>"#,
            inner.shapes.concat()
        ));
        self
    }

    fn xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
            self.shapes.concat()
        )
    }
}

/// Builds a whole PPTX package in memory.
#[derive(Debug, Clone, Default)]
pub struct PptxBuilder {
    slides: Vec<FixtureSlide>,
    reversed_part_names: bool,
    without_slide_list: bool,
}

impl PptxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, slide: FixtureSlide) -> Self {
        self.slides.push(slide);
        self
    }

    /// Name the slide parts in reverse, so `slide1.xml` is the last slide.
    pub fn reversed_part_names(mut self) -> Self {
        self.reversed_part_names = true;
        self
    }

    /// Omit `<p:sldIdLst>` from presentation.xml.
    pub fn without_slide_list(mut self) -> Self {
        self.without_slide_list = true;
        self
    }

    fn part_number(&self, index: usize) -> usize {
        if self.reversed_part_names {
            self.slides.len() - index
        } else {
            index + 1
        }
    }

    /// Write the package and return its bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        let mut put = |name: &str, data: &[u8]| {
            zip.start_file(name, options).expect("start fixture part");
            zip.write_all(data).expect("write fixture part");
        };

        put("[Content_Types].xml", self.content_types().as_bytes());
        put("ppt/presentation.xml", self.presentation().as_bytes());
        put("ppt/_rels/presentation.xml.rels", self.presentation_rels().as_bytes());

        let mut media_index = 0;
        for (index, slide) in self.slides.iter().enumerate() {
            let number = self.part_number(index);
            put(&format!("ppt/slides/slide{}.xml", number), slide.xml().as_bytes());

            let mut rels = vec![format!(
                r#"<Relationship Id="rId1" Type="{REL_NS}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#
            )];
            for (offset, media) in slide.media.iter().enumerate() {
                let rel_id = offset + 2;
                match media {
                    Media::Embedded(data) => {
                        media_index += 1;
                        let name = format!("image{}.png", media_index);
                        put(&format!("ppt/media/{}", name), data);
                        rels.push(format!(
                            r#"<Relationship Id="rId{rel_id}" Type="{REL_NS}/image" Target="../media/{name}"/>"#
                        ));
                    }
                    Media::Linked(url) => rels.push(format!(
                        r#"<Relationship Id="rId{rel_id}" Type="{REL_NS}/image" Target="{}" TargetMode="External"/>"#,
                        escape(url)
                    )),
                }
            }
            put(
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                relationships(&rels).as_bytes(),
            );
        }

        zip.finish().expect("finish fixture zip").into_inner()
    }

    fn content_types(&self) -> String {
        let overrides: String = (0..self.slides.len())
            .map(|index| {
                format!(
                    r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                    self.part_number(index)
                )
            })
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>{overrides}</Types>"#
        )
    }

    fn presentation(&self) -> String {
        let list = if self.without_slide_list {
            String::new()
        } else {
            let ids: String = (0..self.slides.len())
                .map(|index| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + index, index + 2))
                .collect();
            format!("<p:sldIdLst>{}</p:sldIdLst>", ids)
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{list}<p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
        )
    }

    fn presentation_rels(&self) -> String {
        let mut rels = vec![format!(
            r#"<Relationship Id="rId1" Type="{REL_NS}/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#
        )];
        rels.extend((0..self.slides.len()).map(|index| {
            format!(
                r#"<Relationship Id="rId{}" Type="{REL_NS}/slide" Target="slides/slide{}.xml"/>"#,
                index + 2,
                self.part_number(index)
            )
        }));
        relationships(&rels)
    }
}

fn relationships(entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PKG_REL_NS}">{}</Relationships>"#,
        entries.concat()
    )
}
