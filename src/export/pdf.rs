//! Single-page PDF packaging of a rendered receipt.
//!
//! The page is sized to the raster: one CSS pixel maps to 0.264583 mm, plus a
//! footer strip below the image carrying the low-contrast disclosure caption.

use image::GrayImage;
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm,
    PdfDocument, Px, Rgb,
};

use crate::error::ReceiptError;

/// Millimetres per rendered pixel (96 DPI).
pub const MM_PER_PX: f32 = 0.264583;
/// Footer strip under the receipt image.
pub const FOOTER_MM: f32 = 12.0;

const CAPTION: &str = "fake receipt";
const CAPTION_PT: f32 = 7.0;
const CAPTION_MARGIN_MM: f32 = 2.0;

/// Build the PDF bytes for a rendered receipt image.
pub fn build_pdf(img: &GrayImage, title: &str) -> Result<Vec<u8>, ReceiptError> {
    let (width_px, height_px) = img.dimensions();
    let page_width = width_px as f32 * MM_PER_PX;
    let image_height = height_px as f32 * MM_PER_PX;
    let page_height = image_height + FOOTER_MM;

    let (doc, page1, layer1) = PdfDocument::new(title, Mm(page_width), Mm(page_height), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);

    let pdf_image = Image::from(ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Greyscale,
        bits_per_component: ColorBits::Bit8,
        interpolate: false,
        image_data: img.as_raw().clone(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // DPI that maps the pixel grid onto the page at MM_PER_PX.
    let dpi = 25.4 / MM_PER_PX;
    pdf_image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(FOOTER_MM)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReceiptError::Render(format!("PDF font: {}", e)))?;
    layer.set_fill_color(Color::Rgb(Rgb::new(
        180.0 / 255.0,
        180.0 / 255.0,
        180.0 / 255.0,
        None,
    )));
    layer.use_text(
        CAPTION,
        CAPTION_PT,
        Mm(CAPTION_MARGIN_MM),
        Mm(CAPTION_MARGIN_MM),
        &font,
    );

    doc.save_to_bytes()
        .map_err(|e| ReceiptError::Render(format!("PDF save: {}", e)))
}
