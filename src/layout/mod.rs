//! # Grid Layout Engine
//!
//! Cell geometry for sheet presets: cell sizes, template-to-grid fit
//! validation, per-cell page offsets, and QR placement within a label.
//!
//! Everything here is computed in millimeters; callers convert to the
//! output unit (points, CSS mm) at render time. Fractional millimeters are
//! valid and expected — nothing rounds.

pub mod dynamic;

pub use dynamic::{
    DynamicSize, FieldsArea, LayoutDirection, OptimalGrid, SizeBounds, dynamic_label_size,
    fields_area, optimal_a4_grid,
};

use crate::template::QrPosition;

/// Allowed deviation between a template's declared size and its computed
/// grid cell before the mismatch is treated as an error.
pub const DEFAULT_FIT_TOLERANCE_MM: f64 = 0.2;

// ============================================================================
// CELL GEOMETRY
// ============================================================================

/// Computed size of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Compute the cell size for a regular grid on a sheet page.
///
/// Usable area = page dimension minus two margins minus `(count - 1)`
/// gutters, divided evenly by the column/row count.
pub fn cell_size(
    page_width_mm: f64,
    page_height_mm: f64,
    margin_mm: f64,
    columns: u32,
    rows: u32,
    gutter_x_mm: f64,
    gutter_y_mm: f64,
) -> CellSize {
    let columns = columns.max(1) as f64;
    let rows = rows.max(1) as f64;
    let usable_w = page_width_mm - 2.0 * margin_mm - (columns - 1.0) * gutter_x_mm;
    let usable_h = page_height_mm - 2.0 * margin_mm - (rows - 1.0) * gutter_y_mm;
    CellSize {
        width_mm: usable_w / columns,
        height_mm: usable_h / rows,
    }
}

/// Result of checking a template against a grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GridFit {
    pub fits: bool,
    /// One human-readable message per violated axis, with the mm delta.
    pub errors: Vec<String>,
}

/// Validate that a template matches its grid cell within `tolerance_mm` on
/// both axes.
///
/// Used as the pre-flight gate before sheet generation: the renderers fail
/// fast with all accumulated axis errors when `fits` is false.
pub fn validate_template_fits_grid(
    template_width_mm: f64,
    template_height_mm: f64,
    cell_width_mm: f64,
    cell_height_mm: f64,
    tolerance_mm: f64,
) -> GridFit {
    let mut errors = Vec::new();

    let dw = template_width_mm - cell_width_mm;
    if dw.abs() > tolerance_mm {
        errors.push(format!(
            "template width {:.2}mm differs from cell width {:.2}mm by {:.2}mm (tolerance {:.2}mm)",
            template_width_mm,
            cell_width_mm,
            dw.abs(),
            tolerance_mm
        ));
    }

    let dh = template_height_mm - cell_height_mm;
    if dh.abs() > tolerance_mm {
        errors.push(format!(
            "template height {:.2}mm differs from cell height {:.2}mm by {:.2}mm (tolerance {:.2}mm)",
            template_height_mm,
            cell_height_mm,
            dh.abs(),
            tolerance_mm
        ));
    }

    GridFit {
        fits: errors.is_empty(),
        errors,
    }
}

/// Absolute page-space position of one grid cell's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPosition {
    pub x_mm: f64,
    pub y_mm: f64,
    pub row: u32,
    pub col: u32,
}

/// Page-space offset of the cell at `index`, row-major.
///
/// Offsets are unbounded by row count: an index past the last row still
/// produces a geometrically valid (if off-page) position. Callers are
/// responsible for never requesting more cells per page than
/// `columns * rows`.
pub fn cell_position(
    index: usize,
    columns: u32,
    margin_mm: f64,
    cell: CellSize,
    gutter_x_mm: f64,
    gutter_y_mm: f64,
) -> CellPosition {
    let columns = columns.max(1);
    let row = (index / columns as usize) as u32;
    let col = (index % columns as usize) as u32;
    CellPosition {
        x_mm: margin_mm + col as f64 * (cell.width_mm + gutter_x_mm),
        y_mm: margin_mm + row as f64 * (cell.height_mm + gutter_y_mm),
        row,
        col,
    }
}

/// Number of physical pages needed for `count` labels at `per_page` each.
pub fn pages_needed(count: usize, per_page: usize) -> usize {
    count.div_ceil(per_page.max(1))
}

// ============================================================================
// QR PLACEMENT
// ============================================================================

/// A QR code's offset within the label's local coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QrOffset {
    pub x_mm: f64,
    pub y_mm: f64,
}

/// Map a [`QrPosition`] to a padded corner/edge/center offset within a
/// container of the given size.
///
/// Composed with [`cell_position`] (cell offset + intra-label offset) to get
/// a QR's absolute page position.
pub fn qr_position(
    position: QrPosition,
    container_width_mm: f64,
    container_height_mm: f64,
    qr_size_mm: f64,
    padding_mm: f64,
) -> QrOffset {
    let right = container_width_mm - qr_size_mm - padding_mm;
    let bottom = container_height_mm - qr_size_mm - padding_mm;
    let center_x = (container_width_mm - qr_size_mm) / 2.0;
    let center_y = (container_height_mm - qr_size_mm) / 2.0;

    let (x_mm, y_mm) = match position {
        QrPosition::TopLeft => (padding_mm, padding_mm),
        QrPosition::TopRight => (right, padding_mm),
        QrPosition::BottomLeft => (padding_mm, bottom),
        QrPosition::BottomRight => (right, bottom),
        QrPosition::Left => (padding_mm, center_y),
        QrPosition::Right => (right, center_y),
        QrPosition::Center => (center_x, center_y),
    };
    QrOffset { x_mm, y_mm }
}
