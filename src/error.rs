//! # Error Types
//!
//! This module defines error types used throughout the receiptsmith library.

use thiserror::Error;

/// Main error type for receiptsmith operations
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Persistence-level errors (key-value store I/O)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed JSON in a persisted record or config
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Preview rasterization or PDF packaging error
    #[error("Render error: {0}")]
    Render(String),

    /// Server round-trip failure (watermarking, template save)
    #[error("Network error: {0}")]
    Network(String),

    /// A section type's instance cap would be exceeded
    #[error("Maximum {max} {name} section(s) allowed")]
    SectionLimit { name: &'static str, max: u32 },

    /// Aggregate validation failures that block a save-as-template action
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
