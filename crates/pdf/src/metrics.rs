//! Helvetica glyph metrics, WinAnsi encoding and line wrapping.

use encoding_rs::WINDOWS_1252;
use textwrap::core::Fragment;
use textwrap::wrap_algorithms::wrap_first_fit;

/// Advance widths (1/1000 em) of Helvetica for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Advance widths (1/1000 em) of Helvetica-Bold for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// The two standard fonts the renderer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    pub fn for_style(bold: bool) -> Self {
        if bold {
            Font::Bold
        } else {
            Font::Regular
        }
    }

    /// Name of the font in the page resources.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }

    /// Advance width of `ch` in 1/1000 em.
    pub fn char_width(self, ch: char) -> u16 {
        let table = match self {
            Font::Regular => &HELVETICA_WIDTHS,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
        };

        match ch {
            ' '..='~' => table[ch as usize - 32],
            '\u{2022}' => 350,
            '\u{2013}' => 556,
            '\u{2014}' | '\u{2026}' | '\u{2030}' => 1000,
            '\u{2018}' | '\u{2019}' | '\u{201A}' => 222,
            '\u{201C}' | '\u{201D}' | '\u{201E}' => 333,
            _ => 556,
        }
    }

    /// Width of `text` set at `size` points.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|ch| u32::from(self.char_width(ch))).sum();
        units as f32 * size / 1000.0
    }
}

/// Encode text for a WinAnsiEncoding font. Characters outside Windows-1252
/// become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];

    for ch in text.chars() {
        if ch.is_ascii() {
            bytes.push(ch as u8);
            continue;
        }
        let (encoded, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if unmappable || encoded.len() != 1 {
            bytes.push(b'?');
        } else {
            bytes.extend_from_slice(&encoded);
        }
    }

    bytes
}

#[derive(Debug)]
struct Word {
    text: String,
    width: f64,
    whitespace: f64,
}

impl Fragment for Word {
    fn width(&self) -> f64 {
        self.width
    }

    fn whitespace_width(&self) -> f64 {
        self.whitespace
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

/// Break `text` into lines no wider than `max_width` points.
///
/// Words are packed greedily; a single word wider than a line is split
/// between characters.
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let space = f64::from(font.text_width(" ", size));
    let max = f64::from(max_width.max(1.0));

    let mut words = Vec::new();
    for word in text.split_whitespace() {
        let width = f64::from(font.text_width(word, size));
        if width <= max {
            words.push(Word {
                text: word.to_string(),
                width,
                whitespace: space,
            });
            continue;
        }

        let mut piece = String::new();
        let mut piece_width = 0.0;
        for ch in word.chars() {
            let ch_width = f64::from(font.char_width(ch)) * f64::from(size) / 1000.0;
            if !piece.is_empty() && piece_width + ch_width > max {
                words.push(Word {
                    text: std::mem::take(&mut piece),
                    width: piece_width,
                    whitespace: 0.0,
                });
                piece_width = 0.0;
            }
            piece.push(ch);
            piece_width += ch_width;
        }
        words.push(Word {
            text: piece,
            width: piece_width,
            whitespace: space,
        });
    }

    wrap_first_fit(&words, &[max])
        .into_iter()
        .map(|line| {
            let mut out = String::new();
            for (i, word) in line.iter().enumerate() {
                if i > 0 && line[i - 1].whitespace > 0.0 {
                    out.push(' ');
                }
                out.push_str(&word.text);
            }
            out
        })
        .collect()
}
