//! # Receiptsmith - Receipt Builder Engine
//!
//! Receiptsmith is a Rust library for composing, persisting, previewing, and
//! exporting custom sales receipts. It provides:
//!
//! - **Section model**: a closed registry of typed, reorderable receipt blocks
//! - **Editor session**: explicit mutation API with revision tracking
//! - **Persistence**: auto-save, manual save, and cross-navigation pending
//!   saves with expiry and template-slug matching
//! - **Update pipeline**: debounced preview refresh and auto-save timers
//! - **Rendering**: deterministic PNG preview using Spleen bitmap fonts
//! - **Export**: quality-gated image export with watermarking, and PDF export
//!
//! ## Quick Start
//!
//! ```
//! use receiptsmith::editor::EditorSession;
//! use receiptsmith::render::render_receipt;
//!
//! let mut session = EditorSession::new();
//! session.load_defaults();
//!
//! let png_bytes = render_receipt(session.sections(), session.current_receipt_width)?;
//! # Ok::<(), receiptsmith::ReceiptError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`section`] | Section registry and typed payloads |
//! | [`editor`] | Editor session and derived totals |
//! | [`template`] | Template config loading and normalization |
//! | [`store`] | Key-value persistence and record shapes |
//! | [`restore`] | Startup restore resolution |
//! | [`pipeline`] | Debounced preview/save timers |
//! | [`render`] | Receipt rasterizer |
//! | [`export`] | Image and PDF export |
//! | [`server`] | HTTP facade |
//! | [`error`] | Error types |

pub mod app;
pub mod barcode;
pub mod client;
pub mod drag;
pub mod editor;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod render;
pub mod restore;
pub mod section;
pub mod server;
pub mod store;
pub mod template;

// Re-exports for convenience
pub use editor::EditorSession;
pub use error::ReceiptError;
pub use section::{SectionData, SectionInstance, SectionKind};

/// Receipt width, in pixels, used when a saved receipt predates the width
/// control.
pub const DEFAULT_RECEIPT_WIDTH: u32 = 320;
