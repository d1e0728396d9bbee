//! # Export Pipeline
//!
//! Turns the live receipt into downloadable artifacts. Image export is
//! quality-gated: the small preset is free, the print-grade presets need a
//! subscription, and any unsubscribed raster gets the watermark burned in.
//! PDF export is subscription-only and round-trips through the server's
//! watermarking endpoint, so only server-approved bytes ever reach the user.

pub mod pdf;
pub mod watermark;

use image::imageops::FilterType;
use log::debug;

use crate::client::WatermarkApi;
use crate::error::ReceiptError;
use crate::render::{encode_png, render_image};
use crate::section::SectionInstance;

const WATERMARK_TEXT: &str = "FAKE RECEIPT";

/// Image export quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Preview,
    Standard,
    Hd,
}

impl Quality {
    pub fn parse(s: &str) -> Option<Quality> {
        match s {
            "preview" => Some(Quality::Preview),
            "standard" => Some(Quality::Standard),
            "hd" => Some(Quality::Hd),
            _ => None,
        }
    }

    /// Nominal output width in pixels.
    pub fn target_width(self) -> u32 {
        match self {
            Quality::Preview => 200,
            Quality::Standard => 750,
            Quality::Hd => 1500,
        }
    }

    /// Oversampling multiplier applied on top of the nominal width.
    pub fn supersample(self) -> f32 {
        match self {
            Quality::Preview | Quality::Standard => 1.5,
            Quality::Hd => 3.0,
        }
    }

    pub fn requires_pro(self) -> bool {
        !matches!(self, Quality::Preview)
    }
}

/// Result of an export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// PNG bytes ready for download.
    Image(Vec<u8>),
    /// Watermark-approved PDF bytes ready for download.
    Pdf(Vec<u8>),
    /// The preset needs a subscription; send the user to pricing instead.
    RedirectToPricing,
}

/// Export the receipt as a PNG at the requested quality.
///
/// PRO presets without a subscription redirect before any rasterization
/// happens. Unsubscribed output carries the burned-in watermark.
pub fn export_image(
    sections: &[SectionInstance],
    receipt_width: u32,
    quality: Quality,
    subscribed: bool,
) -> Result<ExportOutcome, ReceiptError> {
    if quality.requires_pro() && !subscribed {
        debug!("{:?} export without subscription, redirecting", quality);
        return Ok(ExportOutcome::RedirectToPricing);
    }

    let rendered = render_image(sections, receipt_width);
    let out_width = (quality.target_width() as f32 * quality.supersample()).round() as u32;
    let out_height = ((rendered.height() as f32 * out_width as f32 / rendered.width() as f32)
        .round() as u32)
        .max(1);
    let mut scaled = image::imageops::resize(&rendered, out_width, out_height, FilterType::Lanczos3);

    if !subscribed {
        watermark::burn_in(&mut scaled, WATERMARK_TEXT);
    }

    Ok(ExportOutcome::Image(encode_png(&scaled)?))
}

/// Export the receipt as a PDF via the server watermarking endpoint.
///
/// No subscription means an immediate pricing redirect; the raster is never
/// produced. On success only the server's watermarked bytes are returned.
pub async fn export_pdf(
    sections: &[SectionInstance],
    receipt_width: u32,
    store_name: &str,
    template_name: &str,
    subscribed: bool,
    api: &impl WatermarkApi,
) -> Result<ExportOutcome, ReceiptError> {
    if !subscribed {
        debug!("PDF export without subscription, redirecting");
        return Ok(ExportOutcome::RedirectToPricing);
    }

    let template_type = if template_name.is_empty() {
        "custom"
    } else {
        template_name
    };
    let rendered = render_image(sections, receipt_width);
    let pdf_bytes = pdf::build_pdf(&rendered, store_name)?;
    let watermarked = api.apply_watermark(pdf_bytes, template_type, store_name).await?;
    Ok(ExportOutcome::Pdf(watermarked))
}
