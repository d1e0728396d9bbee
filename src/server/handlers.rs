//! Preview and export handlers.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::editor::EditorSession;
use crate::export::{self, ExportOutcome, Quality};
use crate::render::render_receipt;
use crate::template::TemplateConfig;

fn default_quality() -> String {
    "preview".to_string()
}

/// Body for POST /api/export/image.
#[derive(Debug, Deserialize)]
pub struct ExportForm {
    pub config: TemplateConfig,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default)]
    pub subscribed: bool,
}

fn session_for(config: &TemplateConfig) -> EditorSession {
    let mut session = EditorSession::new();
    session.load_template(config);
    session
}

fn png_response(png: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], png).into_response()
}

/// Handle GET /api/health.
pub async fn health() -> &'static str {
    "ok"
}

/// Handle POST /api/preview - render a template config to PNG.
pub async fn preview(Json(config): Json<TemplateConfig>) -> Response {
    let session = session_for(&config);
    match render_receipt(session.sections(), session.current_receipt_width) {
        Ok(png) => png_response(png),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("render failed: {}", e),
        )
            .into_response(),
    }
}

/// Handle POST /api/export/image - quality-gated, watermarked export.
pub async fn export_image(Json(form): Json<ExportForm>) -> Response {
    let Some(quality) = Quality::parse(&form.quality) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("unknown quality '{}'", form.quality),
        )
            .into_response();
    };

    let session = session_for(&form.config);
    match export::export_image(
        session.sections(),
        session.current_receipt_width,
        quality,
        form.subscribed,
    ) {
        Ok(ExportOutcome::Image(png)) => png_response(png),
        Ok(ExportOutcome::RedirectToPricing) => (
            StatusCode::PAYMENT_REQUIRED,
            "subscription required for this quality",
        )
            .into_response(),
        Ok(ExportOutcome::Pdf(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "unexpected export kind").into_response()
        }
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("export failed: {}", e),
        )
            .into_response(),
    }
}
