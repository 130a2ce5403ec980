//! The conversion pipeline: parse, classify, assemble, render.

use deck2pdf_core::{
    DocumentBlock, FrontMatter, ImageCounter, LayoutAssembler, Presentation, Result,
    ShapeClassifier, SlideContent,
};
use deck2pdf_pdf::PdfRenderer;
use deck2pdf_pptx::PptxParser;
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Caller-supplied settings for one conversion.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Title-page title; `None` or blank means "Summary of <stem>".
    pub title: Option<String>,

    /// Whether slide pictures are placed in the summary.
    pub include_images: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            title: None,
            include_images: true,
        }
    }
}

/// What a finished conversion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub slide_count: usize,
    pub image_count: usize,
    pub block_count: usize,
    pub bytes: usize,
}

/// Convert an in-memory presentation named `filename` into PDF bytes.
pub fn convert_bytes(
    data: &[u8],
    filename: &str,
    options: &ConversionOptions,
) -> Result<(Vec<u8>, ConversionReport)> {
    let presentation = PptxParser::new().parse_bytes(data, filename)?;
    log::info!(
        "Loaded {} ({} slides)",
        presentation.filename,
        presentation.slide_count()
    );

    let blocks = summary_blocks(&presentation, filename, options);
    let pdf = PdfRenderer::new().render(&blocks)?;

    let report = ConversionReport {
        slide_count: presentation.slide_count(),
        image_count: blocks.iter().filter(|block| block.is_image()).count(),
        block_count: blocks.len(),
        bytes: pdf.len(),
    };
    Ok((pdf, report))
}

/// Classify every slide with one image counter and assemble the summary.
fn summary_blocks(
    presentation: &Presentation,
    filename: &str,
    options: &ConversionOptions,
) -> Vec<DocumentBlock> {
    let classifier = ShapeClassifier::new().with_image_extraction(options.include_images);
    let mut counter = ImageCounter::new();

    let slides: Vec<SlideContent> = presentation
        .slides
        .iter()
        .enumerate()
        .map(|(index, slide)| {
            let number = index + 1;
            log::info!("Processing slide {}...", number);
            classifier.classify(slide, number, &mut counter)
        })
        .collect();

    let front_matter = FrontMatter::new(filename, presentation.slide_count())
        .with_title(options.title.as_deref());
    LayoutAssembler::new()
        .with_images(options.include_images)
        .assemble(front_matter, slides)
}

/// Convert a presentation read from `reader`.
pub fn convert_reader<R: Read>(
    mut reader: R,
    filename: &str,
    options: &ConversionOptions,
) -> Result<(Vec<u8>, ConversionReport)> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    convert_bytes(&data, filename, options)
}

/// Convert the file at `input` and write the summary to `output`, creating
/// the output directory when needed.
pub fn convert_file(
    input: &Path,
    output: &Path,
    options: &ConversionOptions,
) -> Result<ConversionReport> {
    let filename = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("presentation.pptx");

    let data = fs::read(input)?;
    let (pdf, report) = convert_bytes(&data, filename, options)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, &pdf)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck2pdf_core::Error;
    use deck2pdf_pptx::fixture::{png_bytes, FixtureSlide, PptxBuilder};
    use lopdf::{Document, Object};

    const LONG_STATEMENT: &str = "A long opening statement that runs well past the title \
                                  threshold, so it cannot be mistaken for a heading of any sort at all.";

    fn two_slide_deck() -> Vec<u8> {
        PptxBuilder::new()
            .slide(
                FixtureSlide::new()
                    .text_box(&["Intro"])
                    .text_box(&["- point one\n- point two"]),
            )
            .slide(FixtureSlide::new().text_box(&[LONG_STATEMENT]).picture(png_bytes(800, 600)))
            .build()
    }

    fn image_streams(pdf: &[u8]) -> usize {
        let doc = Document::load_mem(pdf).unwrap();
        doc.objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .filter(|stream| {
                stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .map(|name| name == b"Image")
                    .unwrap_or(false)
            })
            .count()
    }

    #[test]
    fn test_convert_bytes_end_to_end() {
        let (pdf, report) =
            convert_bytes(&two_slide_deck(), "deck.pptx", &ConversionOptions::default()).unwrap();

        assert_eq!(report.slide_count, 2);
        assert_eq!(report.image_count, 1);
        assert_eq!(report.bytes, pdf.len());
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(image_streams(&pdf), 1);

        let doc = Document::load_mem(&pdf).unwrap();
        assert!(doc.get_pages().len() >= 2);
    }

    #[test]
    fn test_summary_blocks_follow_the_deck() {
        let presentation = PptxParser::new()
            .parse_bytes(&two_slide_deck(), "deck.pptx")
            .unwrap();
        let blocks = summary_blocks(&presentation, "deck.pptx", &ConversionOptions::default());

        let DocumentBlock::TitlePage(front) = &blocks[0] else {
            panic!("expected title page, got {:?}", blocks[0]);
        };
        assert_eq!(front.title, "Summary of deck");
        assert_eq!(front.slide_count, 2);

        let paragraph = |text: &str| DocumentBlock::Paragraph(text.to_string());
        let bullet = |text: &str| DocumentBlock::Bullet(text.to_string());
        // Every text box contributes its whole text and then each paragraph.
        assert_eq!(
            blocks[1..12],
            [
                DocumentBlock::PageBreak,
                DocumentBlock::SlideHeading {
                    number: 1,
                    title: Some("Intro".to_string()),
                },
                paragraph("Intro"),
                bullet("point one"),
                bullet("point two"),
                bullet("point one"),
                bullet("point two"),
                DocumentBlock::Spacer,
                DocumentBlock::SlideHeading {
                    number: 2,
                    title: None,
                },
                paragraph(LONG_STATEMENT),
                paragraph(LONG_STATEMENT),
            ]
        );

        assert_eq!(blocks.len(), 16);
        assert_eq!(blocks[12], DocumentBlock::Spacer);
        match &blocks[13] {
            DocumentBlock::Image(image) => {
                assert_eq!(image.name, "image_2_1");
                assert_eq!((image.width, image.height), (400, 300));
            }
            other => panic!("expected image, got {:?}", other),
        }
        assert_eq!(blocks[14..], [DocumentBlock::Spacer, DocumentBlock::Spacer]);
    }

    #[test]
    fn test_without_images() {
        let options = ConversionOptions {
            include_images: false,
            ..ConversionOptions::default()
        };
        let (pdf, report) = convert_bytes(&two_slide_deck(), "deck.pptx", &options).unwrap();
        let (_, with_images) =
            convert_bytes(&two_slide_deck(), "deck.pptx", &ConversionOptions::default()).unwrap();

        assert_eq!(report.image_count, 0);
        assert_eq!(image_streams(&pdf), 0);
        // One image block and its two spacers.
        assert_eq!(report.block_count + 3, with_images.block_count);
    }

    #[test]
    fn test_custom_title_lands_in_document_info() {
        let options = ConversionOptions {
            title: Some("Board Review".to_string()),
            ..ConversionOptions::default()
        };
        let (pdf, _) = convert_bytes(&two_slide_deck(), "deck.pptx", &options).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let info_id = doc.trailer.get(b"Info").and_then(Object::as_reference).unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        match info.get(b"Title").unwrap() {
            Object::String(bytes, _) => assert_eq!(bytes.as_slice(), b"Board Review"),
            other => panic!("unexpected title {:?}", other),
        }
    }

    #[test]
    fn test_convert_file_creates_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("deck.pptx");
        fs::write(&input, two_slide_deck()).unwrap();
        let output = dir.path().join("nested").join("out").join("deck_summary.pdf");

        let report = convert_file(&input, &output, &ConversionOptions::default()).unwrap();

        let written = fs::read(&output).unwrap();
        assert_eq!(written.len(), report.bytes);
        assert!(written.starts_with(b"%PDF"));
    }

    #[test]
    fn test_convert_reader() {
        let deck = two_slide_deck();
        let (pdf, report) =
            convert_reader(deck.as_slice(), "deck.pptx", &ConversionOptions::default()).unwrap();
        assert_eq!(report.slide_count, 2);
        assert_eq!(report.bytes, pdf.len());
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_file(
            &dir.path().join("absent.pptx"),
            &dir.path().join("out.pdf"),
            &ConversionOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_legacy_ppt_is_rejected() {
        let mut data = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        data.resize(1024, 0);

        let err = convert_bytes(&data, "old.ppt", &ConversionOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_corrupt_package_fails() {
        let err = convert_bytes(b"PK\x03\x04 truncated", "broken.pptx", &ConversionOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::ZipError(_)));
    }

    #[test]
    fn test_undecodable_picture_does_not_fail_conversion() {
        let deck = PptxBuilder::new()
            .slide(FixtureSlide::new().text_box(&["Title"]).picture(b"not a png".to_vec()))
            .build();

        let (_, report) = convert_bytes(&deck, "deck.pptx", &ConversionOptions::default()).unwrap();
        assert_eq!(report.slide_count, 1);
        assert_eq!(report.image_count, 0);
    }
}
