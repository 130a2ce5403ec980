//! Domain types for representing presentation content on its way to a summary.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A parsed presentation: its source filename and its slides in document order.
#[derive(Debug, Clone)]
pub struct Presentation {
    /// Original filename (without path).
    pub filename: String,

    /// Detected format of the source file.
    pub format: PresentationFormat,

    /// Slides in presentation order.
    pub slides: Vec<SourceSlide>,
}

impl Presentation {
    /// Create a new presentation with the given filename and format.
    pub fn new(filename: impl Into<String>, format: PresentationFormat) -> Self {
        Self {
            filename: filename.into(),
            format,
            slides: Vec::new(),
        }
    }

    /// Add a slide to the presentation.
    pub fn add_slide(&mut self, slide: SourceSlide) {
        self.slides.push(slide);
    }

    /// Number of slides in the presentation.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }
}

/// The format of the source presentation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary).
    Ppt,
}

impl PresentationFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Detect format from the extension of a file name or path.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Ppt);
        }

        None
    }
}

/// One slide of the source document: its shapes in document order.
#[derive(Debug, Clone, Default)]
pub struct SourceSlide {
    pub shapes: Vec<Shape>,
}

impl SourceSlide {
    pub fn new(shapes: Vec<Shape>) -> Self {
        Self { shapes }
    }
}

/// A node of a slide's shape tree, resolved once at ingestion.
#[derive(Debug, Clone)]
pub enum Shape {
    /// A shape with a text frame.
    Text(TextShape),
    /// A native (non-placeholder) picture.
    Picture(PictureShape),
    /// A group of shapes, children in document order.
    Group(Vec<Shape>),
    /// Tables, connectors, charts, placeholder pictures and anything else.
    Other,
}

/// Text content of a shape's text frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextShape {
    /// Paragraph texts in order, including empty ones.
    pub paragraphs: Vec<String>,
}

impl TextShape {
    pub fn new<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paragraphs: paragraphs.into_iter().map(Into::into).collect(),
        }
    }

    /// The whole-shape text: all paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs.join("\n")
    }
}

/// A picture shape and its embedded payload.
#[derive(Debug, Clone, Default)]
pub struct PictureShape {
    /// Shape name from the non-visual properties, if any.
    pub name: String,

    /// Relationship id of the embedded image.
    pub embed_id: Option<String>,

    /// Raw encoded image bytes. `None` for linked or missing media.
    pub data: Option<Vec<u8>>,
}

impl PictureShape {
    pub fn with_data(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            embed_id: None,
            data: Some(data),
        }
    }
}

/// Normalized content of a single slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideContent {
    /// 1-based slide number.
    pub slide_number: usize,

    /// The slide title, if a short leading text fragment was found.
    pub title: Option<String>,

    /// Raw text fragments in shape traversal order.
    pub paragraphs: Vec<String>,

    /// Extracted images in shape traversal order.
    pub images: Vec<ExtractedImage>,
}

impl SlideContent {
    /// Create an empty slide record with the given number.
    pub fn new(slide_number: usize) -> Self {
        Self {
            slide_number,
            title: None,
            paragraphs: Vec::new(),
            images: Vec::new(),
        }
    }
}

/// A decoded, downscaled picture ready for embedding.
///
/// Pixels are 8-bit RGB, row-major, with any alpha already composited onto
/// white.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// Unique name within one conversion run.
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl fmt::Debug for ExtractedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractedImage")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgb.len())
            .finish()
    }
}

/// A normalized text fragment, tagged by how it should be laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextBlock {
    /// A bullet item with its marker stripped.
    Bullet(String),
    /// A plain paragraph.
    Paragraph(String),
}

/// Title-page metadata prefixed to the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub title: String,
    pub source_name: String,
    pub slide_count: usize,
    pub generated_at: DateTime<Local>,
}

impl FrontMatter {
    /// Front matter for `source_name`, titled "Summary of <stem>" and stamped now.
    pub fn new(source_name: impl Into<String>, slide_count: usize) -> Self {
        let source_name = source_name.into();
        let title = default_title(&source_name);
        Self {
            title,
            source_name,
            slide_count,
            generated_at: Local::now(),
        }
    }

    /// Use an explicit title. Blank titles keep the default.
    pub fn with_title(mut self, title: Option<&str>) -> Self {
        if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
            self.title = title.to_string();
        }
        self
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Local>) -> Self {
        self.generated_at = generated_at;
        self
    }
}

fn default_title(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_name);
    format!("Summary of {}", stem)
}

/// One unit of the assembled summary, consumed in order by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBlock {
    TitlePage(FrontMatter),
    SlideHeading {
        number: usize,
        title: Option<String>,
    },
    Paragraph(String),
    Bullet(String),
    Image(ExtractedImage),
    Spacer,
    PageBreak,
}

impl DocumentBlock {
    pub fn is_image(&self) -> bool {
        matches!(self, DocumentBlock::Image(_))
    }
}

impl From<TextBlock> for DocumentBlock {
    fn from(block: TextBlock) -> Self {
        match block {
            TextBlock::Bullet(text) => DocumentBlock::Bullet(text),
            TextBlock::Paragraph(text) => DocumentBlock::Paragraph(text),
        }
    }
}
