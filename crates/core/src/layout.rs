//! Layout assembly: front matter plus classified slides into an ordered
//! sequence of document blocks for the renderer.

use crate::normalize::TextNormalizer;
use crate::types::{DocumentBlock, FrontMatter, SlideContent};

/// Builds the block sequence of a summary document.
#[derive(Debug, Clone)]
pub struct LayoutAssembler {
    /// Whether extracted pictures are placed in the output.
    include_images: bool,

    normalizer: TextNormalizer,
}

impl Default for LayoutAssembler {
    fn default() -> Self {
        Self {
            include_images: true,
            normalizer: TextNormalizer::new(),
        }
    }
}

impl LayoutAssembler {
    /// Create an assembler that includes images.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether pictures are emitted, for every slide of the document.
    pub fn with_images(mut self, include: bool) -> Self {
        self.include_images = include;
        self
    }

    /// Assemble the full block sequence.
    ///
    /// Emits the title page and a page break, then for every slide its
    /// heading, its text blocks, its images bracketed by spacers (when
    /// enabled) and a closing spacer.
    pub fn assemble<I>(&self, front_matter: FrontMatter, slides: I) -> Vec<DocumentBlock>
    where
        I: IntoIterator<Item = SlideContent>,
    {
        let mut blocks = vec![DocumentBlock::TitlePage(front_matter), DocumentBlock::PageBreak];

        for slide in slides {
            self.push_slide(&mut blocks, slide);
        }

        blocks
    }

    fn push_slide(&self, blocks: &mut Vec<DocumentBlock>, slide: SlideContent) {
        let title = slide
            .title
            .as_deref()
            .map(|t| self.normalizer.normalize(t))
            .filter(|t| !t.is_empty());

        blocks.push(DocumentBlock::SlideHeading {
            number: slide.slide_number,
            title,
        });

        for fragment in &slide.paragraphs {
            blocks.extend(
                self.normalizer
                    .classify(fragment)
                    .into_iter()
                    .map(DocumentBlock::from),
            );
        }

        if self.include_images {
            for image in slide.images {
                blocks.push(DocumentBlock::Spacer);
                blocks.push(DocumentBlock::Image(image));
                blocks.push(DocumentBlock::Spacer);
            }
        }

        blocks.push(DocumentBlock::Spacer);
    }
}
