//! Text normalization for slide text.
//!
//! Collapses whitespace, strips PowerPoint glyph artifacts and control
//! characters, and splits fragments into bullet items or plain paragraphs.

use crate::types::TextBlock;
use regex::Regex;
use std::sync::LazyLock;

/// Regex to collapse every whitespace run (newlines included) into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Leading characters that mark a line as a bullet item.
pub const BULLET_MARKERS: &[char] = &['•', '-', '*', '○'];

/// Returns true for characters that carry no text: control characters other
/// than whitespace, and private-use glyphs left behind by symbol-font bullets.
fn is_artifact(c: char) -> bool {
    (c.is_control() && !c.is_whitespace()) || ('\u{E000}'..='\u{F8FF}').contains(&c)
}

/// Text normalizer for slide text fragments.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Characters recognised as bullet markers at the start of a line.
    markers: Vec<char>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            markers: BULLET_MARKERS.to_vec(),
        }
    }
}

impl TextNormalizer {
    /// Create a normalizer with the default bullet markers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a fragment to a single line.
    ///
    /// - Removes control characters and private-use glyph artifacts
    /// - Collapses whitespace runs (including newlines) to single spaces
    /// - Trims leading/trailing whitespace
    pub fn normalize(&self, text: &str) -> String {
        let cleaned: String = text.chars().filter(|&c| !is_artifact(c)).collect();
        WHITESPACE_COLLAPSE_REGEX
            .replace_all(&cleaned, " ")
            .trim()
            .to_string()
    }

    /// Whether a single line starts with a bullet marker.
    pub fn is_bullet_line(&self, line: &str) -> bool {
        let line = line.trim_start_matches(|c: char| c.is_whitespace() || is_artifact(c));
        line.starts_with(self.markers.as_slice())
    }

    /// Classify a raw fragment into text blocks.
    ///
    /// Lines are examined before whitespace collapse. When any line starts
    /// with a bullet marker the whole fragment is bullet-style and every
    /// non-empty line becomes a [`TextBlock::Bullet`] with leading markers
    /// stripped. Otherwise the fragment is one [`TextBlock::Paragraph`].
    /// Fragments that are empty after cleaning yield nothing.
    pub fn classify(&self, fragment: &str) -> Vec<TextBlock> {
        let fragment = fragment.replace("\r\n", "\n").replace('\r', "\n");

        if fragment.lines().any(|line| self.is_bullet_line(line)) {
            return fragment
                .lines()
                .map(|line| self.strip_marker(line))
                .filter(|line| !line.is_empty())
                .map(TextBlock::Bullet)
                .collect();
        }

        let text = self.normalize(&fragment);
        if text.is_empty() {
            Vec::new()
        } else {
            vec![TextBlock::Paragraph(text)]
        }
    }

    fn strip_marker(&self, line: &str) -> String {
        let line = self.normalize(line);
        line.trim_start_matches(|c: char| c == ' ' || self.markers.contains(&c))
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bullet(text: &str) -> TextBlock {
        TextBlock::Bullet(text.to_string())
    }

    fn paragraph(text: &str) -> TextBlock {
        TextBlock::Paragraph(text.to_string())
    }

    #[test]
    fn test_collapse_whitespace() {
        let normalizer = TextNormalizer::new();

        assert_eq!(normalizer.normalize("Hello    world"), "Hello world");
        assert_eq!(normalizer.normalize("  Hello  "), "Hello");
        assert_eq!(normalizer.normalize("\t\tHello\t\t"), "Hello");
        assert_eq!(normalizer.normalize("Line one\nLine two"), "Line one Line two");
        assert_eq!(normalizer.normalize("a\r\n\r\nb"), "a b");
    }

    #[test]
    fn test_remove_artifacts() {
        let normalizer = TextNormalizer::new();

        assert_eq!(normalizer.normalize("\u{F0B7}Item"), "Item");
        assert_eq!(normalizer.normalize("Soft\u{000B}break"), "Soft break");
        assert_eq!(normalizer.normalize("bell\u{0007}less"), "bellless");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = TextNormalizer::new();
        let samples = [
            "",
            "   ",
            "plain",
            "  spaced \t out\n\nlines  ",
            "\u{F0A7} glyph \u{0001}ctl",
            "• already • bullets",
            "\u{00A0}nbsp\u{2003}em space",
        ];

        for sample in samples {
            let once = normalizer.normalize(sample);
            assert_eq!(normalizer.normalize(&once), once, "sample {:?}", sample);
        }
    }

    #[test]
    fn test_dash_lines_become_bullets() {
        let normalizer = TextNormalizer::new();

        assert_eq!(
            normalizer.classify("- point one\n- point two"),
            vec![bullet("point one"), bullet("point two")]
        );
        assert_eq!(
            normalizer.classify("-   spaced\n\n-\ttabbed  "),
            vec![bullet("spaced"), bullet("tabbed")]
        );
    }

    #[test]
    fn test_other_markers() {
        let normalizer = TextNormalizer::new();

        assert_eq!(
            normalizer.classify("• alpha\n* beta\n○ gamma"),
            vec![bullet("alpha"), bullet("beta"), bullet("gamma")]
        );
        assert_eq!(normalizer.classify("-• doubled"), vec![bullet("doubled")]);
    }

    #[test]
    fn test_bullet_fragment_promotes_every_line() {
        let normalizer = TextNormalizer::new();

        assert_eq!(
            normalizer.classify("- first\nsecond without marker\n\nthird"),
            vec![
                bullet("first"),
                bullet("second without marker"),
                bullet("third")
            ]
        );
        assert_eq!(
            normalizer.classify("Intro line\n- detail"),
            vec![bullet("Intro line"), bullet("detail")]
        );
    }

    #[test]
    fn test_plain_paragraph() {
        let normalizer = TextNormalizer::new();

        assert_eq!(
            normalizer.classify("Revenue grew\n  across   all regions."),
            vec![paragraph("Revenue grew across all regions.")]
        );
        assert_eq!(
            normalizer.classify("Temperatures of -5 are rare"),
            vec![paragraph("Temperatures of -5 are rare")]
        );
    }

    #[test]
    fn test_empty_fragments_yield_nothing() {
        let normalizer = TextNormalizer::new();

        assert!(normalizer.classify("").is_empty());
        assert!(normalizer.classify("   \n\t ").is_empty());
        assert!(normalizer.classify("\u{F0B7}").is_empty());
        assert!(normalizer.classify("-\n*\n").is_empty());
    }

    #[test]
    fn test_marker_after_glyph_artifact() {
        let normalizer = TextNormalizer::new();

        assert_eq!(normalizer.classify("\u{F0B7} - item"), vec![bullet("item")]);
    }
}
