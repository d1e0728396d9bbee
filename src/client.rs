//! HTTP client for the hosted receipt service.
//!
//! Three endpoints: server-side PDF watermarking, template persistence, and
//! the pending-receipt stash used by the remove-watermark checkout flow.

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ReceiptError;
use crate::store::SaveIntent;

/// Server-side watermarking seam, split out so exports are testable without a
/// network.
pub trait WatermarkApi {
    fn apply_watermark(
        &self,
        pdf: Vec<u8>,
        template_type: &str,
        store_name: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, ReceiptError>> + Send;
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the hosted API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Persist a named template. The server answers `{success, error?}`.
    pub async fn save_template(
        &self,
        name: &str,
        description: &str,
        config: &Value,
    ) -> Result<(), ReceiptError> {
        let body = serde_json::json!({
            "name": name,
            "description": description,
            "template_type": "custom",
            "config_json": config,
        });
        let response = self
            .http
            .post(self.url("/api/templates"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ReceiptError::Network(format!("save template: {}", e)))?;
        let status: ApiStatus = response
            .json()
            .await
            .map_err(|e| ReceiptError::Network(format!("save template response: {}", e)))?;
        if status.success {
            debug!("template \"{}\" saved", name);
            Ok(())
        } else {
            Err(ReceiptError::Network(
                status.error.unwrap_or_else(|| "save failed".into()),
            ))
        }
    }

    /// Stash the receipt server-side before a checkout hop.
    pub async fn store_pending_receipt(
        &self,
        intent: SaveIntent,
        name: &str,
        description: &str,
        config: &Value,
    ) -> Result<(), ReceiptError> {
        let body = serde_json::json!({
            "intent": intent,
            "name": name,
            "description": description,
            "config": config,
        });
        let response = self
            .http
            .post(self.url("/api/store-pending-receipt"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ReceiptError::Network(format!("store pending receipt: {}", e)))?;
        if !response.status().is_success() {
            return Err(ReceiptError::Network(format!(
                "store pending receipt: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

impl WatermarkApi for ApiClient {
    /// Upload PDF bytes for server-side watermarking; the response body is
    /// the watermarked document.
    async fn apply_watermark(
        &self,
        pdf: Vec<u8>,
        template_type: &str,
        store_name: &str,
    ) -> Result<Vec<u8>, ReceiptError> {
        let part = reqwest::multipart::Part::bytes(pdf)
            .file_name("receipt.pdf")
            .mime_str("application/pdf")
            .map_err(|e| ReceiptError::Network(format!("watermark upload: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("pdf", part)
            .text("template_type", template_type.to_string())
            .text("store_name", store_name.to_string());

        let response = self
            .http
            .post(self.url("/api/apply-watermark"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReceiptError::Network(format!("watermark: {}", e)))?;
        if !response.status().is_success() {
            return Err(ReceiptError::Network(format!(
                "watermark: HTTP {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReceiptError::Network(format!("watermark body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:5000/");
        assert_eq!(
            client.url("/api/templates"),
            "http://localhost:5000/api/templates"
        );
    }

    #[tokio::test]
    async fn test_apply_watermark_uploads_pdf_field() {
        use axum::{body::Bytes, routing::post, Router};
        use std::sync::Arc;
        use tokio::sync::Mutex;

        let captured = Arc::new(Mutex::new(String::new()));
        let sink = captured.clone();
        let app = Router::new().route(
            "/api/apply-watermark",
            post(move |body: Bytes| {
                let sink = sink.clone();
                async move {
                    *sink.lock().await = String::from_utf8_lossy(&body).into_owned();
                    Bytes::from_static(b"%PDF-stamped")
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = ApiClient::new(format!("http://{}", addr));
        let out = client
            .apply_watermark(b"%PDF-1.4 test".to_vec(), "custom", "Store Express")
            .await
            .unwrap();
        assert_eq!(out, b"%PDF-stamped");

        // The server reads the upload from the `pdf` field.
        let body = captured.lock().await.clone();
        assert!(body.contains("name=\"pdf\""), "unexpected field name: {}", body);
        assert!(body.contains("filename=\"receipt.pdf\""));
        assert!(body.contains("name=\"template_type\""));
        assert!(body.contains("name=\"store_name\""));
    }
}
