//! # Etiqueta - Label Layout & Generation Engine
//!
//! Etiqueta converts abstract label templates (field positions in
//! millimeters, QR/text fields, page presets) into pixel-accurate,
//! multi-page print output. It provides:
//!
//! - **Data model**: templates, fields, page presets, data records
//! - **Grid layout**: cell geometry, fit validation, dynamic sizing
//! - **Asset pre-generation**: batched, deduplicated QR rasters
//! - **Two render backends**: PDF (via `pdf-writer`) and print-ready HTML
//!
//! ## Quick Start
//!
//! ```no_run
//! use etiqueta::assets::QrcodeRenderer;
//! use etiqueta::render;
//! use etiqueta::template::{GeneratePayload, LabelRecord, LabelTemplate, PagePreset};
//!
//! # async fn run() -> Result<(), etiqueta::error::EtiquetaError> {
//! let template = LabelTemplate::new(100.0, 50.0);
//! let records = vec![LabelRecord::from_qr("https://example.com/item/1")];
//!
//! let payload = GeneratePayload {
//!     template,
//!     records,
//!     page_preset: PagePreset::Roll,
//!     ..Default::default()
//! };
//!
//! let renderer = QrcodeRenderer::default();
//! let pdf_bytes = render::generate_pdf(&payload, &renderer).await?;
//! let html = render::generate_html(&payload, &renderer).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`template`] | Label template / record / page preset data model |
//! | [`layout`] | Grid geometry and sizing heuristics |
//! | [`assets`] | QR asset pre-generation |
//! | [`render`] | PDF and HTML render backends |
//! | [`units`] | Millimeter / point / inch conversions |
//! | [`error`] | Error types |
//!
//! Each generation call is self-contained: no state is shared between
//! concurrent calls and nothing outlives a single invocation.

pub mod assets;
pub mod error;
pub mod layout;
pub mod render;
pub mod template;
pub mod units;

// Re-exports for convenience
pub use error::EtiquetaError;
pub use template::{GeneratePayload, LabelRecord, LabelTemplate, PagePreset};
