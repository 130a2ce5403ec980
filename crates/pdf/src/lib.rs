//! PDF rendering backend.
//!
//! Turns an assembled [`DocumentBlock`] sequence into a paginated A4 PDF
//! using the standard Helvetica fonts, with pictures embedded in memory.

pub mod metrics;
pub mod style;
mod writer;

pub use style::{PageStyle, Rgb, TextStyle};

use deck2pdf_core::{DocumentBlock, Error, Result};
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use metrics::{encode_win_ansi, Font};
use std::path::Path;
use writer::PageWriter;

/// Renders document blocks with a fixed [`PageStyle`].
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    style: PageStyle,
}

impl PdfRenderer {
    /// Create a renderer with the default page style.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: PageStyle) -> Self {
        self.style = style;
        self
    }

    /// Render the blocks and return the PDF bytes.
    pub fn render(&self, blocks: &[DocumentBlock]) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in [Font::Regular, Font::Bold] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }

        let mut writer = PageWriter::new(&self.style, &mut doc);
        for block in blocks {
            writer.write(block);
        }
        let (pages, images) = writer.finish();

        let mut xobjects = Dictionary::new();
        for (name, id) in images {
            xobjects.set(name, id);
        }
        let resources_id = doc.add_object(dictionary! {
            "Font" => fonts,
            "XObject" => xobjects,
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for operations in pages {
            let content = Content { operations }
                .encode()
                .map_err(|e| Error::RenderError(format!("Failed to encode page content: {}", e)))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        let page_count = kids.len();

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.style.page_width.into(),
                self.style.page_height.into(),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::String(b"deck2pdf".to_vec(), StringFormat::Literal),
        };
        if let Some(DocumentBlock::TitlePage(front)) = blocks.first() {
            info.set(
                "Title",
                Object::String(encode_win_ansi(&front.title), StringFormat::Literal),
            );
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);

        if self.style.compress {
            doc.compress();
        }

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::RenderError(format!("Failed to write PDF: {}", e)))?;

        log::debug!(
            "Rendered {} blocks onto {} pages ({} bytes)",
            blocks.len(),
            page_count,
            output.len()
        );

        Ok(output)
    }

    /// Render the blocks into a file at `path`, returning the number of
    /// bytes written.
    pub fn render_to_file(&self, blocks: &[DocumentBlock], path: impl AsRef<Path>) -> Result<usize> {
        let bytes = self.render(blocks)?;
        std::fs::write(path.as_ref(), &bytes)?;
        Ok(bytes.len())
    }
}
