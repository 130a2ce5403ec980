//! Core domain types, text normalization, shape classification and layout
//! assembly for turning presentations into paginated summaries.

pub mod classify;
pub mod error;
pub mod layout;
pub mod normalize;
pub mod picture;
pub mod types;

pub use classify::{ImageCounter, ShapeClassifier};
pub use error::{Error, Result};
pub use layout::LayoutAssembler;
pub use normalize::TextNormalizer;
pub use types::{
    DocumentBlock, ExtractedImage, FrontMatter, PictureShape, Presentation, PresentationFormat,
    Shape, SlideContent, SourceSlide, TextBlock, TextShape,
};
