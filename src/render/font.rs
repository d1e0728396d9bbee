//! Glyph generation for receipt rendering.
//!
//! Uses the Spleen bitmap font family: 6x12 for fine print and 12x24 for the
//! business name. The 8x16 PSF2 data decodes blank for most glyphs, so body
//! text upscales the 6x12 bitmap to the 8x16 cell instead.

use spleen_font::{PSF2Font, FONT_12X24, FONT_6X12};

/// Type scale used on the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontSize {
    Small,
    Normal,
    Large,
}

impl FontSize {
    /// (char_width, char_height) in pixels.
    pub fn metrics(self) -> (usize, usize) {
        match self {
            FontSize::Small => (6, 12),
            FontSize::Normal => (8, 16),
            FontSize::Large => (12, 24),
        }
    }
}

/// Generate a glyph bitmap for a character.
/// Returns a Vec<u8> where each byte is 0 (white) or 1 (black).
pub fn glyph_for(size: FontSize, ch: char) -> Vec<u8> {
    match size {
        FontSize::Small => raster(FONT_6X12, 6, 12, ch),
        FontSize::Normal => scale_up(&raster(FONT_6X12, 6, 12, ch), 6, 12, 8, 16),
        FontSize::Large => raster(FONT_12X24, 12, 24, ch),
    }
}

fn raster(font_data: &'static [u8], width: usize, height: usize, ch: char) -> Vec<u8> {
    let mut glyph = vec![0u8; width * height];

    let mut font = match PSF2Font::new(font_data) {
        Ok(f) => f,
        Err(_) => {
            draw_box(&mut glyph, width, height);
            return glyph;
        }
    };

    let utf8 = ch.to_string();
    if let Some(rows) = font.glyph_for_utf8(utf8.as_bytes()) {
        for (y, row) in rows.enumerate() {
            for (x, on) in row.enumerate() {
                if on && y < height && x < width {
                    glyph[y * width + x] = 1;
                }
            }
        }
    } else {
        // Unknown character: draw a box.
        draw_box(&mut glyph, width, height);
    }

    glyph
}

/// Nearest-neighbor upscale from one glyph cell to a larger one.
fn scale_up(src: &[u8], sw: usize, sh: usize, dw: usize, dh: usize) -> Vec<u8> {
    let mut out = vec![0u8; dw * dh];
    for y in 0..dh {
        let sy = y * sh / dh;
        for x in 0..dw {
            let sx = x * sw / dw;
            out[y * dw + x] = src[sy * sw + sx];
        }
    }
    out
}

/// Draw a box outline in the glyph buffer.
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    for x in 0..width {
        glyph[x] = 1;
        glyph[(height - 1) * width + x] = 1;
    }
    for y in 0..height {
        glyph[y * width] = 1;
        glyph[y * width + width - 1] = 1;
    }
}
