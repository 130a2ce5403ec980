//! Shape classification: turns a slide's shape tree into a [`SlideContent`].

use crate::picture::{self, MAX_IMAGE_HEIGHT, MAX_IMAGE_WIDTH};
use crate::types::{PictureShape, Shape, SlideContent, SourceSlide, TextShape};

/// Text fragments shorter than this many characters may become a slide title.
pub const TITLE_MAX_CHARS: usize = 100;

/// Per-run counter used to give every extracted picture a unique name.
///
/// Owned by a single conversion; independent conversions each start their own.
#[derive(Debug, Default, Clone)]
pub struct ImageCounter {
    next: u32,
}

impl ImageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for the next picture found on `slide_number`.
    pub fn next_name(&mut self, slide_number: usize) -> String {
        self.next += 1;
        format!("image_{}_{}", slide_number, self.next)
    }

    /// How many names have been handed out.
    pub fn issued(&self) -> u32 {
        self.next
    }
}

/// Decides which shapes supply a slide's title, body text and pictures.
#[derive(Debug, Clone)]
pub struct ShapeClassifier {
    /// Fragments with fewer characters than this may become the title.
    title_max_chars: usize,

    /// Whether picture payloads are decoded at all.
    extract_images: bool,
}

impl Default for ShapeClassifier {
    fn default() -> Self {
        Self {
            title_max_chars: TITLE_MAX_CHARS,
            extract_images: true,
        }
    }
}

impl ShapeClassifier {
    /// Create a classifier with the default title threshold and image bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether picture payloads are decoded.
    pub fn with_image_extraction(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Classify one slide.
    ///
    /// Shapes are visited in document order. The first non-empty text
    /// fragment of a top-level shape becomes the title when it is shorter
    /// than [`TITLE_MAX_CHARS`]; every other fragment is a paragraph. Text
    /// inside groups is flattened straight into the paragraphs. Only
    /// top-level pictures are decoded; pictures inside groups are ignored.
    pub fn classify(
        &self,
        slide: &SourceSlide,
        slide_number: usize,
        counter: &mut ImageCounter,
    ) -> SlideContent {
        let mut content = SlideContent::new(slide_number);
        let mut title_decided = false;

        for shape in &slide.shapes {
            match shape {
                Shape::Text(text) => {
                    for fragment in text_fragments(text) {
                        if !title_decided {
                            title_decided = true;
                            if fragment.chars().count() < self.title_max_chars {
                                content.title = Some(fragment);
                                continue;
                            }
                        }
                        content.paragraphs.push(fragment);
                    }
                }
                Shape::Picture(picture) => {
                    if self.extract_images {
                        self.extract_picture(picture, &mut content, counter);
                    }
                }
                Shape::Group(children) => collect_group_text(children, &mut content.paragraphs),
                Shape::Other => {}
            }
        }

        log::debug!(
            "Slide {}: title={:?}, {} paragraphs, {} images",
            slide_number,
            content.title,
            content.paragraphs.len(),
            content.images.len()
        );

        content
    }

    fn extract_picture(
        &self,
        picture: &PictureShape,
        content: &mut SlideContent,
        counter: &mut ImageCounter,
    ) {
        let Some(data) = picture.data.as_deref() else {
            log::warn!(
                "Could not extract image from slide {}: picture {:?} has no embedded data",
                content.slide_number,
                picture.name
            );
            return;
        };

        let name = counter.next_name(content.slide_number);
        match picture::decode_and_fit(data, name, MAX_IMAGE_WIDTH, MAX_IMAGE_HEIGHT) {
            Ok(image) => content.images.push(image),
            Err(e) => log::warn!(
                "Could not extract image from slide {}: {}",
                content.slide_number,
                e
            ),
        }
    }
}

/// Text fragments of one text shape: the whole-shape text, then each
/// non-empty paragraph. Both are kept even when they repeat each other.
fn text_fragments(shape: &TextShape) -> Vec<String> {
    let mut fragments = Vec::new();

    let whole = shape.text();
    let whole = whole.trim();
    if !whole.is_empty() {
        fragments.push(whole.to_string());
    }

    fragments.extend(
        shape
            .paragraphs
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string),
    );

    fragments
}

fn collect_group_text(children: &[Shape], paragraphs: &mut Vec<String>) {
    for child in children {
        match child {
            Shape::Text(text) => paragraphs.extend(text_fragments(text)),
            Shape::Group(nested) => collect_group_text(nested, paragraphs),
            Shape::Picture(_) | Shape::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn text(paragraphs: &[&str]) -> Shape {
        Shape::Text(TextShape::new(paragraphs.iter().copied()))
    }

    fn picture(data: Vec<u8>) -> Shape {
        Shape::Picture(PictureShape::with_data("Picture 1", data))
    }

    fn classify(shapes: Vec<Shape>) -> SlideContent {
        ShapeClassifier::new().classify(&SourceSlide::new(shapes), 1, &mut ImageCounter::new())
    }

    #[test]
    fn test_short_first_fragment_becomes_title() {
        let content = classify(vec![text(&["Intro"]), text(&["Body text"])]);

        assert_eq!(content.title.as_deref(), Some("Intro"));
        // The paragraph accessor repeats the whole-shape text.
        assert_eq!(content.paragraphs, vec!["Intro", "Body text", "Body text"]);
    }

    #[test]
    fn test_long_first_fragment_is_a_paragraph() {
        let long = "x".repeat(100);
        let content = classify(vec![text(&[&long]), text(&["Short"])]);

        assert_eq!(content.title, None);
        assert_eq!(content.paragraphs[0], long);
        assert!(content.paragraphs.contains(&"Short".to_string()));
    }

    #[test]
    fn test_title_threshold_counts_characters() {
        let ninety_nine = "é".repeat(99);
        let content = classify(vec![text(&[&ninety_nine])]);
        assert_eq!(content.title.as_deref(), Some(ninety_nine.as_str()));
    }

    #[test]
    fn test_multi_paragraph_shape_fragments() {
        let content = classify(vec![text(&["Agenda", "", "Wrap-up"])]);

        assert_eq!(content.title.as_deref(), Some("Agenda\n\nWrap-up"));
        assert_eq!(content.paragraphs, vec!["Agenda", "Wrap-up"]);
    }

    #[test]
    fn test_empty_shapes_do_not_claim_title() {
        let content = classify(vec![text(&["", "   "]), text(&["Real title"])]);

        assert_eq!(content.title.as_deref(), Some("Real title"));
        assert_eq!(content.paragraphs, vec!["Real title"]);
    }

    #[test]
    fn test_group_text_is_flattened_into_paragraphs() {
        let group = Shape::Group(vec![
            text(&["Grouped"]),
            Shape::Group(vec![text(&["Nested"])]),
            Shape::Other,
        ]);
        let content = classify(vec![group, text(&["Heading"])]);

        assert_eq!(content.title.as_deref(), Some("Heading"));
        assert_eq!(
            content.paragraphs,
            vec!["Grouped", "Grouped", "Nested", "Nested", "Heading"]
        );
    }

    #[test]
    fn test_top_level_picture_is_extracted() {
        let mut counter = ImageCounter::new();
        let slide = SourceSlide::new(vec![picture(png(800, 600)), picture(png(10, 10))]);
        let content = ShapeClassifier::new().classify(&slide, 2, &mut counter);

        assert_eq!(content.images.len(), 2);
        assert_eq!(content.images[0].name, "image_2_1");
        assert_eq!((content.images[0].width, content.images[0].height), (400, 300));
        assert_eq!(content.images[1].name, "image_2_2");
        assert_eq!(counter.issued(), 2);
    }

    #[test]
    fn test_grouped_picture_is_ignored() {
        let group = Shape::Group(vec![picture(png(20, 20)), text(&["Caption"])]);
        let content = classify(vec![group]);

        assert!(content.images.is_empty());
        assert_eq!(content.paragraphs, vec!["Caption", "Caption"]);
    }

    #[test]
    fn test_undecodable_picture_is_skipped() {
        let content = classify(vec![
            text(&["Title"]),
            picture(b"not an image".to_vec()),
            Shape::Picture(PictureShape::default()),
            picture(png(4, 3)),
        ]);

        assert_eq!(content.title.as_deref(), Some("Title"));
        assert_eq!(content.images.len(), 1);
        assert_eq!((content.images[0].width, content.images[0].height), (4, 3));
    }

    #[test]
    fn test_image_extraction_can_be_disabled() {
        let classifier = ShapeClassifier::new().with_image_extraction(false);
        let slide = SourceSlide::new(vec![picture(png(4, 3))]);
        let mut counter = ImageCounter::new();

        let content = classifier.classify(&slide, 1, &mut counter);
        assert!(content.images.is_empty());
        assert_eq!(counter.issued(), 0);
    }

    #[test]
    fn test_counter_spans_slides() {
        let classifier = ShapeClassifier::new();
        let mut counter = ImageCounter::new();
        let slide = SourceSlide::new(vec![picture(png(4, 3))]);

        let first = classifier.classify(&slide, 1, &mut counter);
        let second = classifier.classify(&slide, 2, &mut counter);
        assert_eq!(first.images[0].name, "image_1_1");
        assert_eq!(second.images[0].name, "image_2_2");
    }
}
