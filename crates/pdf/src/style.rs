//! Page geometry and typographic settings.

/// Points per centimetre.
pub const CM: f32 = 72.0 / 2.54;

/// Points per inch.
pub const INCH: f32 = 72.0;

/// An RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const DARK_BLUE: Rgb = Rgb(0.0, 0.0, 0.545);
    pub const DARK_GRAY: Rgb = Rgb(0.663, 0.663, 0.663);
    pub const LIGHT_GRAY: Rgb = Rgb(0.941, 0.941, 0.941);
}

/// Settings for one kind of text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    /// Line height as a multiple of the font size.
    pub leading: f32,
    pub bold: bool,
    pub color: Rgb,
    pub space_before: f32,
    pub space_after: f32,
}

impl TextStyle {
    pub fn line_height(&self) -> f32 {
        self.font_size * self.leading
    }
}

/// Complete layout configuration of a summary document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageStyle {
    pub page_width: f32,
    pub page_height: f32,

    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,

    /// Centered document title on the first page.
    pub title: TextStyle,
    /// Gap between the title and the summary lines below it.
    pub title_gap: f32,

    /// "Slide N: ..." headings, drawn on a bordered box.
    pub heading: TextStyle,
    pub heading_fill: Rgb,
    pub heading_border: Rgb,
    pub heading_border_width: f32,
    pub heading_padding: f32,

    pub body: TextStyle,

    pub bullet: TextStyle,
    /// Offset of the bullet glyph from the left margin.
    pub bullet_indent: f32,
    /// Offset of the bullet text from the left margin.
    pub bullet_text_indent: f32,

    /// Box pictures are scaled into, preserving their aspect ratio.
    pub image_max_width: f32,
    pub image_max_height: f32,

    pub spacer_height: f32,

    /// Flate-compress content and image streams.
    pub compress: bool,
}

impl Default for PageStyle {
    fn default() -> Self {
        let body = TextStyle {
            font_size: 11.0,
            leading: 1.4,
            bold: false,
            color: Rgb::BLACK,
            space_before: 4.0,
            space_after: 8.0,
        };

        Self {
            // A4
            page_width: 595.28,
            page_height: 841.89,

            margin_left: 2.0 * CM,
            margin_right: 2.0 * CM,
            margin_top: 2.5 * CM,
            margin_bottom: 2.0 * CM,

            title: TextStyle {
                font_size: 24.0,
                leading: 1.2,
                bold: true,
                color: Rgb::DARK_BLUE,
                space_before: 20.0,
                space_after: 30.0,
            },
            title_gap: 0.5 * INCH,

            heading: TextStyle {
                font_size: 16.0,
                leading: 1.2,
                bold: true,
                color: Rgb::DARK_BLUE,
                space_before: 20.0,
                space_after: 12.0,
            },
            heading_fill: Rgb::LIGHT_GRAY,
            heading_border: Rgb::DARK_GRAY,
            heading_border_width: 1.0,
            heading_padding: 8.0,

            bullet: TextStyle {
                space_after: 4.0,
                ..body.clone()
            },
            body,
            bullet_indent: 8.0,
            bullet_text_indent: 20.0,

            image_max_width: 4.0 * INCH,
            image_max_height: 3.0 * INCH,

            spacer_height: 0.1 * INCH,

            compress: true,
        }
    }
}

impl PageStyle {
    /// Width available to text between the side margins.
    pub fn content_width(&self) -> f32 {
        self.page_width - self.margin_left - self.margin_right
    }

    /// Baseline cursor position at the top of a fresh page.
    pub fn content_top(&self) -> f32 {
        self.page_height - self.margin_top
    }

    /// Scale a `width` x `height` pixel picture into the image box.
    pub fn fit_image(&self, width: u32, height: u32) -> (f32, f32) {
        if width == 0 || height == 0 {
            return (0.0, 0.0);
        }
        let (w, h) = (width as f32, height as f32);
        let scale = f32::min(self.image_max_width / w, self.image_max_height / h);
        (w * scale, h * scale)
    }
}
