//! # Receipt Rasterizer
//!
//! Renders a section snapshot to a PNG image showing what the receipt looks
//! like. Text uses the Spleen bitmap font family; barcodes come from the
//! CODE128 encoder. The output is deterministic for a given snapshot and
//! width, which is what makes the debounced preview snapshot model work.
//!
//! ```text
//! &[SectionInstance] → ReceiptRenderer → GrayImage → PNG bytes
//! ```

mod font;

pub use font::{FontSize, glyph_for};

use image::{GrayImage, Luma};
use std::collections::HashMap;

use crate::editor::{currency_format, divider_line, subtotal_of, tax_of, total_of};
use crate::error::ReceiptError;
use crate::section::{
    Alignment, BarcodeData, HeaderData, SectionData, SectionInstance, TwoColumnData,
};

const MARGIN: usize = 16;
const SECTION_GAP: usize = 10;

/// Streaming top-to-bottom rasterizer. The buffer grows as sections render;
/// trailing blank rows are trimmed at the end.
pub struct ReceiptRenderer {
    width: usize,
    buffer: Vec<u8>,
    height: usize,
    y: usize,
    font_cache: HashMap<(FontSize, char), Vec<u8>>,
}

impl ReceiptRenderer {
    pub fn new(receipt_width: u32) -> Self {
        let width = (receipt_width as usize).max(120);
        let initial_height = 100;
        Self {
            width,
            buffer: vec![0u8; width * initial_height],
            height: initial_height,
            y: MARGIN,
            font_cache: HashMap::new(),
        }
    }

    fn content_width(&self) -> usize {
        self.width - 2 * MARGIN
    }

    fn ensure_height(&mut self, y: usize) {
        let needed = y + 1;
        if needed > self.height {
            let new_height = needed.max(self.height + 100);
            self.buffer.resize(self.width * new_height, 0);
            self.height = new_height;
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize) {
        if x >= self.width {
            return;
        }
        self.ensure_height(y);
        self.buffer[y * self.width + x] = 1;
    }

    fn glyph(&mut self, size: FontSize, ch: char) -> &[u8] {
        self.font_cache
            .entry((size, ch))
            .or_insert_with(|| glyph_for(size, ch))
    }

    /// Draw one already-wrapped line of text at the current cursor.
    fn draw_line(&mut self, text: &str, size: FontSize, align: Alignment, bold: bool) {
        let (cw, ch) = size.metrics();
        let text_width = text.chars().count() * cw;
        let start_x = MARGIN
            + match align {
                Alignment::Left => 0,
                Alignment::Center => self.content_width().saturating_sub(text_width) / 2,
                Alignment::Right => self.content_width().saturating_sub(text_width),
            };

        let y = self.y;
        self.ensure_height(y + ch);
        for (i, c) in text.chars().enumerate() {
            let glyph = self.glyph(size, c).to_vec();
            let gx = start_x + i * cw;
            for row in 0..ch {
                for col in 0..cw {
                    if glyph[row * cw + col] != 0 {
                        self.set_pixel(gx + col, y + row);
                        if bold {
                            self.set_pixel(gx + col + 1, y + row);
                        }
                    }
                }
            }
        }
        self.y += ch + 2;
    }

    /// Draw a block of text, wrapping each source line to the content width.
    fn draw_text(&mut self, text: &str, size: FontSize, align: Alignment, bold: bool) {
        let per_line = self.chars_per_line(size);
        for source_line in text.split('\n') {
            if source_line.is_empty() {
                self.y += size.metrics().1 / 2;
                continue;
            }
            for line in wrap(source_line, per_line) {
                self.draw_line(&line, size, align, bold);
            }
        }
    }

    fn chars_per_line(&self, size: FontSize) -> usize {
        (self.content_width() / size.metrics().0).max(1)
    }

    /// A label row with a right-aligned value, receipt style.
    fn draw_split(&mut self, left: &str, right: &str, size: FontSize, bold: bool) {
        let per_line = self.chars_per_line(size);
        let right_len = right.chars().count().min(per_line);
        let left_budget = per_line.saturating_sub(right_len + 1);
        let left_text: String = left.chars().take(left_budget).collect();

        let y = self.y;
        self.draw_line(&left_text, size, Alignment::Left, bold);
        // Rewind: the right half shares the row.
        self.y = y;
        let right_text: String = right.chars().take(right_len).collect();
        self.draw_line(&right_text, size, Alignment::Right, bold);
    }

    fn draw_divider(&mut self, receipt_width: u32, style: &str) {
        let line = divider_line(receipt_width, style);
        let per_line = self.chars_per_line(FontSize::Small);
        let clipped: String = line.chars().take(per_line).collect();
        self.draw_line(&clipped, FontSize::Small, Alignment::Center, false);
    }

    fn spacer(&mut self, px: usize) {
        self.y += px;
        self.ensure_height(self.y);
    }

    /// Placeholder box where the logo would appear; logos are host-side
    /// assets the rasterizer has no pixels for.
    fn draw_logo_placeholder(&mut self, data: &HeaderData) {
        let size = (data.logo_size as usize).clamp(16, self.content_width());
        let start_x = MARGIN
            + match data.header_alignment {
                Alignment::Left => 0,
                Alignment::Center => (self.content_width() - size) / 2,
                Alignment::Right => self.content_width() - size,
            };
        let y = self.y;
        self.ensure_height(y + size);
        for i in 0..size {
            self.set_pixel(start_x + i, y);
            self.set_pixel(start_x + i, y + size - 1);
            self.set_pixel(start_x, y + i);
            self.set_pixel(start_x + size - 1, y + i);
            self.set_pixel(start_x + i, y + i);
            self.set_pixel(start_x + size - 1 - i, y + i);
        }
        self.y += size + 4;
    }

    fn draw_barcode(&mut self, data: &BarcodeData) {
        if !data.barcode_enabled || data.barcode_value.is_empty() {
            return;
        }
        let bars = crate::barcode::encode_code128(&data.barcode_value);
        if bars.is_empty() {
            return;
        }
        let bar_height = (data.barcode_size as usize).max(20);
        let start_x = MARGIN + self.content_width().saturating_sub(bars.len()) / 2;
        let y = self.y;
        self.ensure_height(y + bar_height);
        for (i, &bar) in bars.iter().enumerate() {
            if bar {
                for dy in 0..bar_height {
                    self.set_pixel(start_x + i, y + dy);
                }
            }
        }
        self.y += bar_height + 4;
        self.draw_line(&data.barcode_value, FontSize::Small, Alignment::Center, false);
    }

    fn draw_two_column(&mut self, data: &TwoColumnData) {
        let left: Vec<String> = data
            .custom_fields
            .iter()
            .filter(|f| f.column != 2)
            .map(|f| format!("{}: {}", f.label, f.value))
            .collect();
        let right: Vec<String> = data
            .custom_fields
            .iter()
            .filter(|f| f.column == 2)
            .map(|f| format!("{}: {}", f.label, f.value))
            .collect();
        for i in 0..left.len().max(right.len()) {
            let l = left.get(i).map(String::as_str).unwrap_or("");
            let r = right.get(i).map(String::as_str).unwrap_or("");
            self.draw_split(l, r, FontSize::Normal, false);
        }
    }

    /// Render the full section list.
    pub fn render(&mut self, sections: &[SectionInstance], receipt_width: u32) {
        for section in sections {
            match &section.data {
                // Settings carries display options only; nothing to draw.
                SectionData::Settings(_) => {}
                SectionData::Header(data) => {
                    if !data.logo_url.is_empty() {
                        self.draw_logo_placeholder(data);
                    }
                    if !data.business_name.is_empty() {
                        self.draw_text(
                            &data.business_name,
                            FontSize::Large,
                            data.header_alignment,
                            true,
                        );
                    }
                    for line in [&data.line1, &data.line2, &data.line3] {
                        if !line.is_empty() {
                            self.draw_text(line, FontSize::Normal, data.header_alignment, false);
                        }
                    }
                    if data.show_header_divider {
                        self.draw_divider(receipt_width, &data.header_divider);
                    }
                }
                SectionData::DateTime(data) => {
                    if !data.date_time.is_empty() {
                        self.draw_text(&data.date_time, FontSize::Normal, data.date_alignment, false);
                    }
                    if data.show_date_divider {
                        self.draw_divider(receipt_width, &data.date_divider);
                    }
                }
                SectionData::TwoColumn(data) => {
                    self.draw_two_column(data);
                    if data.show_info_divider {
                        self.draw_divider(receipt_width, &data.info_divider);
                    }
                }
                SectionData::Items(data) => {
                    for item in &data.items {
                        let qty = item.quantity.as_quantity();
                        let label = if qty > 1.0 {
                            format!("{} x {}", qty, item.name)
                        } else {
                            item.name.clone()
                        };
                        let price = currency_format(sections, item.line_total());
                        self.draw_split(&label, &price, FontSize::Normal, false);
                    }
                    if data.show_items_divider {
                        self.draw_divider(receipt_width, &data.items_divider);
                    }
                }
                SectionData::Payment(data) => {
                    let subtotal = currency_format(sections, subtotal_of(sections));
                    self.draw_split("SUBTOTAL", &subtotal, FontSize::Normal, false);
                    if data.show_tax_rate && data.tax_rate.as_f64() > 0.0 {
                        let tax = currency_format(sections, tax_of(sections));
                        let label = format!("TAX ({}%)", data.tax_rate.as_f64());
                        self.draw_split(&label, &tax, FontSize::Normal, false);
                    }
                    let total = currency_format(sections, total_of(sections));
                    self.draw_split("TOTAL", &total, FontSize::Normal, true);
                    self.spacer(6);
                    for field in &data.payment_fields {
                        self.draw_split(&field.label, &field.value, FontSize::Small, false);
                    }
                    if data.show_payment_divider {
                        self.draw_divider(receipt_width, &data.payment_divider);
                    }
                }
                SectionData::CustomMessage(data) => {
                    if !data.custom_message.is_empty() {
                        self.draw_text(
                            &data.custom_message,
                            FontSize::Small,
                            data.message_alignment,
                            data.message_bold,
                        );
                    }
                    if data.show_message_divider {
                        self.draw_divider(receipt_width, &data.message_divider);
                    }
                }
                SectionData::Barcode(data) => {
                    self.draw_barcode(data);
                }
            }
            self.spacer(SECTION_GAP);
        }
    }

    fn trimmed_height(&self, min: usize) -> usize {
        let mut h = self.height;
        while h > 0 {
            let row = &self.buffer[(h - 1) * self.width..h * self.width];
            if row.iter().all(|&p| p == 0) {
                h -= 1;
            } else {
                break;
            }
        }
        h.max(min)
    }

    /// Finish into an image: white paper, black ink, bottom margin.
    pub fn finish(self) -> GrayImage {
        let content_height = self.trimmed_height(32);
        let total_height = content_height + MARGIN;
        let mut img = GrayImage::from_pixel(self.width as u32, total_height as u32, Luma([255u8]));
        for y in 0..content_height.min(self.height) {
            for x in 0..self.width {
                if self.buffer[y * self.width + x] != 0 {
                    img.put_pixel(x as u32, y as u32, Luma([0u8]));
                }
            }
        }
        img
    }
}

/// Wrap one source line into chunks of at most `per_line` characters.
fn wrap(line: &str, per_line: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for word in line.split(' ') {
        let word_len = word.chars().count();
        if count > 0 && count + 1 + word_len > per_line {
            out.push(std::mem::take(&mut current));
            count = 0;
        }
        if count > 0 {
            current.push(' ');
            count += 1;
        }
        // A single over-long word hard-wraps.
        if word_len > per_line {
            for c in word.chars() {
                if count == per_line {
                    out.push(std::mem::take(&mut current));
                    count = 0;
                }
                current.push(c);
                count += 1;
            }
        } else {
            current.push_str(word);
            count += word_len;
        }
    }
    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
    out
}

/// Render a section snapshot into a grayscale image.
pub fn render_image(sections: &[SectionInstance], receipt_width: u32) -> GrayImage {
    let mut renderer = ReceiptRenderer::new(receipt_width);
    renderer.render(sections, receipt_width);
    renderer.finish()
}

/// Render a section snapshot to PNG bytes.
pub fn render_receipt(
    sections: &[SectionInstance],
    receipt_width: u32,
) -> Result<Vec<u8>, ReceiptError> {
    encode_png(&render_image(sections, receipt_width))
}

/// PNG-encode a grayscale image.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, ReceiptError> {
    use image::ImageEncoder;

    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::L8,
        )
        .map_err(|e| ReceiptError::Render(format!("PNG encoding failed: {}", e)))?;
    Ok(png_bytes)
}
