//! Tiled text watermark for unsubscribed image exports.
//!
//! The watermark is burned into the raster itself, so it cannot be separated
//! from the exported pixels. PDF export never uses this path; its watermark is
//! applied server-side.

use image::GrayImage;

use crate::render::{glyph_for, FontSize};

const ANGLE_DEG: f32 = -30.0;
const ALPHA: f32 = 0.18;
const TILE_X: u32 = 200;
const TILE_Y: u32 = 150;

/// Stamp `text` diagonally across the whole image.
pub fn burn_in(img: &mut GrayImage, text: &str) {
    let (char_w, char_h) = FontSize::Large.metrics();
    let glyphs: Vec<Vec<u8>> = text.chars().map(|c| glyph_for(FontSize::Large, c)).collect();

    let angle = ANGLE_DEG.to_radians();
    let (sin, cos) = angle.sin_cos();
    let (width, height) = img.dimensions();

    // Overscan one tile past every edge so rotated stamps cover the corners.
    let mut oy = -(TILE_Y as i64);
    while oy < height as i64 + TILE_Y as i64 {
        // Offset alternate rows by half a tile, brick-style.
        let row = (oy + TILE_Y as i64) / TILE_Y as i64;
        let shift = if row % 2 == 0 { 0 } else { TILE_X as i64 / 2 };
        let mut ox = -(TILE_X as i64) + shift;
        while ox < width as i64 + TILE_X as i64 {
            stamp(img, &glyphs, char_w, char_h, ox, oy, sin, cos);
            ox += TILE_X as i64;
        }
        oy += TILE_Y as i64;
    }
}

fn stamp(
    img: &mut GrayImage,
    glyphs: &[Vec<u8>],
    char_w: usize,
    char_h: usize,
    ox: i64,
    oy: i64,
    sin: f32,
    cos: f32,
) {
    let (width, height) = img.dimensions();
    for (i, glyph) in glyphs.iter().enumerate() {
        for gy in 0..char_h {
            for gx in 0..char_w {
                if glyph[gy * char_w + gx] == 0 {
                    continue;
                }
                let dx = (i * char_w + gx) as f32;
                let dy = gy as f32;
                let x = ox + (dx * cos - dy * sin).round() as i64;
                let y = oy + (dx * sin + dy * cos).round() as i64;
                if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                    continue;
                }
                let px = img.get_pixel_mut(x as u32, y as u32);
                px.0[0] = (px.0[0] as f32 * (1.0 - ALPHA)) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_burn_in_darkens_white_paper() {
        let mut img = GrayImage::from_pixel(400, 300, Luma([255u8]));
        burn_in(&mut img, "FAKE RECEIPT");
        let darkened = img.pixels().filter(|p| p.0[0] < 255).count();
        assert!(darkened > 0);
        // Semi-transparent: nothing goes anywhere near black.
        assert!(img.pixels().all(|p| p.0[0] > 100));
    }

    #[test]
    fn test_burn_in_covers_corners() {
        let mut img = GrayImage::from_pixel(600, 600, Luma([255u8]));
        burn_in(&mut img, "FAKE RECEIPT");
        let corner_touched = |x0: u32, y0: u32| {
            (y0..y0 + 150)
                .flat_map(|y| (x0..x0 + 150).map(move |x| (x, y)))
                .any(|(x, y)| img.get_pixel(x, y).0[0] < 255)
        };
        assert!(corner_touched(0, 0));
        assert!(corner_touched(450, 450));
    }
}
