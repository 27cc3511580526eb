//! # Unit Conversions
//!
//! Millimeter / point / inch conversions for print geometry.
//!
//! All layout math in this crate is done in millimeters and converted to the
//! output unit (PDF points, CSS mm) at render time only. Converting early
//! would bake a resolution into the grid math; converting late keeps it
//! resolution-independent.

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// PostScript points per inch.
pub const PT_PER_INCH: f64 = 72.0;

/// Convert millimeters to PostScript points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_INCH / MM_PER_INCH
}

/// Convert PostScript points to millimeters. Exact inverse of [`mm_to_pt`].
pub fn pt_to_mm(pt: f64) -> f64 {
    pt * MM_PER_INCH / PT_PER_INCH
}

/// Convert millimeters to inches.
pub fn mm_to_in(mm: f64) -> f64 {
    mm / MM_PER_INCH
}
