//! PPTX (Office Open XML) ingestion backend.
//!
//! Parses .pptx files, which are ZIP archives of XML parts, into slides of
//! typed shapes with their embedded picture payloads attached.

pub mod parser;
pub mod rels;
pub mod shapes;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use parser::PptxParser;
