//! Flow layout of document blocks onto pages.

use crate::metrics::{encode_win_ansi, wrap, Font};
use crate::style::{PageStyle, Rgb, TextStyle};
use deck2pdf_core::{DocumentBlock, ExtractedImage, FrontMatter};
use lopdf::content::Operation;
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Lays blocks out top to bottom, starting a new page whenever the next
/// line, heading box or picture does not fit above the bottom margin.
pub(crate) struct PageWriter<'a> {
    style: &'a PageStyle,
    doc: &'a mut Document,

    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,

    /// Top of the free area on the current page.
    cursor: f32,
    /// Nothing has been drawn on the current page yet.
    fresh: bool,

    /// Picture XObjects by resource name.
    images: Vec<(String, ObjectId)>,
}

impl<'a> PageWriter<'a> {
    pub fn new(style: &'a PageStyle, doc: &'a mut Document) -> Self {
        Self {
            style,
            doc,
            pages: Vec::new(),
            current: Vec::new(),
            cursor: style.content_top(),
            fresh: true,
            images: Vec::new(),
        }
    }

    pub fn write(&mut self, block: &DocumentBlock) {
        match block {
            DocumentBlock::TitlePage(front) => self.title_page(front),
            DocumentBlock::SlideHeading { number, title } => {
                let text = match title {
                    Some(title) => format!("Slide {}: {}", number, title),
                    None => format!("Slide {}", number),
                };
                self.heading(&text);
            }
            DocumentBlock::Paragraph(text) => self.paragraph(text),
            DocumentBlock::Bullet(text) => self.bullet(text),
            DocumentBlock::Image(image) => self.image(image),
            DocumentBlock::Spacer => self.spacer(),
            DocumentBlock::PageBreak => {
                if !self.fresh {
                    self.new_page();
                }
            }
        }
    }

    /// Finished pages and the picture resources they reference.
    ///
    /// A trailing empty page is dropped unless it is the only one.
    pub fn finish(mut self) -> (Vec<Vec<Operation>>, Vec<(String, ObjectId)>) {
        if !self.fresh || self.pages.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        (self.pages, self.images)
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor = self.style.content_top();
        self.fresh = true;
    }

    /// Make room for `height` points after a gap of `before`, breaking the
    /// page when they do not fit. Gaps are dropped at the top of a page.
    fn reserve(&mut self, before: f32, height: f32) {
        if self.fresh {
            return;
        }
        if self.cursor - before - height < self.style.margin_bottom {
            self.new_page();
        } else {
            self.cursor -= before;
        }
    }

    fn title_page(&mut self, front: &FrontMatter) {
        let style = self.style;
        let title = &style.title;
        let font = Font::for_style(title.bold);
        let width = style.content_width();

        self.cursor -= title.space_before;
        for line in wrap(&front.title, font, title.font_size, width) {
            self.reserve(0.0, title.line_height());
            let line_width = font.text_width(&line, title.font_size);
            let x = style.margin_left + (width - line_width) / 2.0;
            self.line(&line, font, title, x);
        }
        self.cursor -= title.space_after + style.title_gap;

        let info = [
            format!("Generated from: {}", front.source_name),
            format!("Total slides: {}", front.slide_count),
            format!("Created: {}", front.generated_at.format("%Y-%m-%d %H:%M:%S")),
        ];
        for text in &info {
            self.flow(text, &style.body, style.margin_left, width);
        }
    }

    fn heading(&mut self, text: &str) {
        let style = self.style;
        let heading = &style.heading;
        let font = Font::for_style(heading.bold);
        let padding = style.heading_padding;

        let lines = wrap(text, font, heading.font_size, style.content_width() - 2.0 * padding);
        let box_height = lines.len() as f32 * heading.line_height() + 2.0 * padding;

        self.reserve(heading.space_before, box_height);

        let Rgb(fr, fg, fb) = style.heading_fill;
        let Rgb(sr, sg, sb) = style.heading_border;
        self.current.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![fr.into(), fg.into(), fb.into()]),
            Operation::new("RG", vec![sr.into(), sg.into(), sb.into()]),
            Operation::new("w", vec![style.heading_border_width.into()]),
            Operation::new(
                "re",
                vec![
                    style.margin_left.into(),
                    (self.cursor - box_height).into(),
                    style.content_width().into(),
                    box_height.into(),
                ],
            ),
            Operation::new("B", vec![]),
            Operation::new("Q", vec![]),
        ]);
        self.fresh = false;

        self.cursor -= padding;
        for line in &lines {
            self.line(line, font, heading, style.margin_left + padding);
        }
        self.cursor -= padding + heading.space_after;
    }

    fn paragraph(&mut self, text: &str) {
        let style = self.style;
        self.flow(text, &style.body, style.margin_left, style.content_width());
    }

    fn bullet(&mut self, text: &str) {
        let style = self.style;
        let bullet = &style.bullet;
        let font = Font::for_style(bullet.bold);
        let text_x = style.margin_left + style.bullet_text_indent;
        let lines = wrap(text, font, bullet.font_size, style.content_width() - style.bullet_text_indent);

        for (i, line) in lines.iter().enumerate() {
            let before = if i == 0 { bullet.space_before } else { 0.0 };
            self.reserve(before, bullet.line_height());
            if i == 0 {
                let baseline = self.cursor - bullet.font_size;
                self.show(
                    "\u{2022}",
                    font,
                    bullet,
                    style.margin_left + style.bullet_indent,
                    baseline,
                );
            }
            self.line(line, font, bullet, text_x);
        }
        self.cursor -= bullet.space_after;
    }

    fn image(&mut self, image: &ExtractedImage) {
        let style = self.style;
        let (width, height) = style.fit_image(image.width, image.height);
        if width <= 0.0 || height <= 0.0 {
            log::warn!("Skipping empty picture {}", image.name);
            return;
        }

        self.reserve(0.0, height);

        let name = format!("Im{}", self.images.len() + 1);
        let xobject = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width),
                "Height" => i64::from(image.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.rgb.clone(),
        );
        let id = self.doc.add_object(xobject);
        self.images.push((name.clone(), id));

        let x = style.margin_left + (style.content_width() - width) / 2.0;
        let y = self.cursor - height;
        self.current.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0.into(), 0.into(), height.into(), x.into(), y.into()],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        self.fresh = false;
        self.cursor = y;
    }

    fn spacer(&mut self) {
        if !self.fresh {
            self.cursor -= self.style.spacer_height;
        }
    }

    /// Wrap `text` into the column at `x` and draw it line by line.
    fn flow(&mut self, text: &str, text_style: &TextStyle, x: f32, width: f32) {
        let font = Font::for_style(text_style.bold);
        let lines = wrap(text, font, text_style.font_size, width);

        for (i, line) in lines.iter().enumerate() {
            let before = if i == 0 { text_style.space_before } else { 0.0 };
            self.reserve(before, text_style.line_height());
            self.line(line, font, text_style, x);
        }
        if !lines.is_empty() {
            self.cursor -= text_style.space_after;
        }
    }

    /// Draw one line at the cursor and advance past it.
    fn line(&mut self, text: &str, font: Font, text_style: &TextStyle, x: f32) {
        let baseline = self.cursor - text_style.font_size;
        self.show(text, font, text_style, x, baseline);
        self.cursor -= text_style.line_height();
    }

    fn show(&mut self, text: &str, font: Font, text_style: &TextStyle, x: f32, baseline: f32) {
        let Rgb(r, g, b) = text_style.color;
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![font.resource_name().into(), text_style.font_size.into()],
            ),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Td", vec![x.into(), baseline.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
        self.fresh = false;
    }
}
