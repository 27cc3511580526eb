//! # Error Types
//!
//! This module defines error types used throughout the etiqueta library.

use thiserror::Error;

/// Main error type for etiqueta operations
#[derive(Debug, Error)]
pub enum EtiquetaError {
    /// Template/grid geometry mismatch (aggregated per-axis messages)
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// QR asset generation error
    #[error("Asset error: {0}")]
    Asset(String),
}
