//! # Dynamic Sizing Heuristics
//!
//! Content-based label sizing, optimal A4 grid search, and the field-area
//! computation. These are best-effort layout aids: text widths come from a
//! character-count heuristic (`font_size * 0.65` mm per character), not from
//! real font metrics, so callers must not assume pixel-perfect fit.

use crate::template::{FieldType, LabelField, QrPosition};
use serde::{Deserialize, Serialize};

/// Millimeters of estimated width per character, per point of font size.
const CHAR_WIDTH_FACTOR: f64 = 0.65;

/// Millimeters of line height per point of font size.
const LINE_HEIGHT_FACTOR: f64 = 0.5;

/// Vertical spacing between stacked fields, in millimeters.
const FIELD_SPACING_MM: f64 = 2.0;

/// A field whose estimated width exceeds this share of the maximum label
/// width is flagged for reflow.
const REFLOW_THRESHOLD: f64 = 0.7;

/// How the QR code and the field stack are arranged on the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDirection {
    /// QR on the left, fields to its right.
    #[default]
    Row,
    /// QR on the right, fields to its left.
    RowReverse,
    /// QR on top, fields below.
    Column,
    /// QR at the bottom, fields above.
    ColumnReverse,
}

impl LayoutDirection {
    fn is_row(self) -> bool {
        matches!(self, LayoutDirection::Row | LayoutDirection::RowReverse)
    }
}

/// Min/max clamp bounds for [`dynamic_label_size`], in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min_width_mm: f64,
    pub min_height_mm: f64,
    pub max_width_mm: f64,
    pub max_height_mm: f64,
}

/// Result of [`dynamic_label_size`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicSize {
    pub width_mm: f64,
    pub height_mm: f64,
    /// True when some field's estimated width exceeds 70% of the maximum
    /// label width — a hint that the field layout should be revisited.
    pub fields_need_reflow: bool,
}

/// Estimate a label size that fits the given fields plus a QR code.
///
/// Per-field text width is estimated from character count; height from the
/// wrapped-line count at that estimated width. Field heights are summed
/// with 2mm spacing; the QR is combined according to `direction` (row
/// variants sum widths, column variants sum heights). The result is clamped
/// into `bounds` on each axis.
pub fn dynamic_label_size(
    fields: &[LabelField],
    qr_size_mm: f64,
    direction: LayoutDirection,
    padding_mm: f64,
    bounds: SizeBounds,
) -> DynamicSize {
    // Width available to a single field's text before it wraps.
    let mut wrap_width = bounds.max_width_mm - 2.0 * padding_mm;
    if direction.is_row() {
        wrap_width -= qr_size_mm + padding_mm;
    }
    let wrap_width = wrap_width.max(1.0);

    let mut content_width: f64 = 0.0;
    let mut content_height: f64 = 0.0;
    let mut fields_need_reflow = false;
    let mut visible = 0usize;

    for field in fields {
        if field.field_type == FieldType::Unknown {
            continue;
        }
        let text = field
            .field_value
            .as_deref()
            .or(field.field_name.as_deref())
            .unwrap_or("");
        let est_width = text.chars().count() as f64 * field.font_size * CHAR_WIDTH_FACTOR;
        if est_width > REFLOW_THRESHOLD * bounds.max_width_mm {
            fields_need_reflow = true;
        }

        let lines = if est_width <= wrap_width {
            1.0
        } else {
            (est_width / wrap_width).ceil()
        };
        let line_height = field.font_size * LINE_HEIGHT_FACTOR;

        content_width = content_width.max(est_width.min(wrap_width));
        if visible > 0 {
            content_height += FIELD_SPACING_MM;
        }
        content_height += lines * line_height;
        visible += 1;
    }

    let (mut width, mut height) = if direction.is_row() {
        (
            qr_size_mm + padding_mm + content_width,
            qr_size_mm.max(content_height),
        )
    } else {
        (
            qr_size_mm.max(content_width),
            qr_size_mm + padding_mm + content_height,
        )
    };
    width += 2.0 * padding_mm;
    height += 2.0 * padding_mm;

    DynamicSize {
        width_mm: width.clamp(bounds.min_width_mm, bounds.max_width_mm),
        height_mm: height.clamp(bounds.min_height_mm, bounds.max_height_mm),
        fields_need_reflow,
    }
}

// ============================================================================
// OPTIMAL A4 GRID
// ============================================================================

const A4_WIDTH_MM: f64 = 210.0;
const A4_HEIGHT_MM: f64 = 297.0;

/// Default page margin for the A4 grid search.
pub const DEFAULT_A4_MARGIN_MM: f64 = 8.0;

/// Default gutter for the A4 grid search.
pub const DEFAULT_A4_GUTTER_MM: f64 = 3.0;

/// Result of [`optimal_a4_grid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimalGrid {
    pub columns: u32,
    pub rows: u32,
    pub fits: bool,
    /// Share of the usable page area not covered by labels, 0–100.
    pub wasted_space_percent: f64,
}

/// Brute-force search for the best label grid on a fixed A4 sheet.
///
/// Tries columns 1..=4 and rows 1..=8, rejecting configurations whose total
/// footprint exceeds the usable area. Among fitting configurations, picks
/// the one maximizing `label_area*0.5 + labels_per_page*0.3 −
/// wasted_percent*0.01` — larger labels and denser pages win, lightly
/// penalized by wasted area. Returns a `fits: false` default when nothing
/// fits.
pub fn optimal_a4_grid(
    label_width_mm: f64,
    label_height_mm: f64,
    margin_mm: f64,
    gutter_mm: f64,
) -> OptimalGrid {
    let usable_w = A4_WIDTH_MM - 2.0 * margin_mm;
    let usable_h = A4_HEIGHT_MM - 2.0 * margin_mm;
    let usable_area = usable_w * usable_h;
    let label_area = label_width_mm * label_height_mm;

    let mut best: Option<(f64, OptimalGrid)> = None;

    for columns in 1..=4u32 {
        for rows in 1..=8u32 {
            let footprint_w =
                columns as f64 * label_width_mm + (columns - 1) as f64 * gutter_mm;
            let footprint_h = rows as f64 * label_height_mm + (rows - 1) as f64 * gutter_mm;
            if footprint_w > usable_w || footprint_h > usable_h {
                continue;
            }

            let per_page = (columns * rows) as f64;
            let wasted = (1.0 - per_page * label_area / usable_area) * 100.0;
            let score = label_area * 0.5 + per_page * 0.3 - wasted * 0.01;

            let candidate = OptimalGrid {
                columns,
                rows,
                fits: true,
                wasted_space_percent: wasted,
            };
            if best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, candidate));
            }
        }
    }

    best.map(|(_, grid)| grid).unwrap_or(OptimalGrid {
        columns: 1,
        rows: 1,
        fits: false,
        wasted_space_percent: 100.0,
    })
}

// ============================================================================
// FIELDS AREA
// ============================================================================

/// Minimum extent of the field area on each axis, in millimeters.
const MIN_FIELDS_AXIS_MM: f64 = 10.0;

/// The rectangular sub-region available for non-QR fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldsArea {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Compute the region left for fields once the QR code is placed.
///
/// Row directions carve the QR's column out of the width; column directions
/// carve its row out of the height. Corner/edge QR positions pick which side
/// the fields land on. Both axes are clamped to a 10mm minimum.
pub fn fields_area(
    label_width_mm: f64,
    label_height_mm: f64,
    qr_size_mm: f64,
    qr_position: QrPosition,
    direction: LayoutDirection,
    padding_mm: f64,
) -> FieldsArea {
    let full_w = label_width_mm - 2.0 * padding_mm;
    let full_h = label_height_mm - 2.0 * padding_mm;

    let qr_on_leading_edge = matches!(
        qr_position,
        QrPosition::TopLeft | QrPosition::BottomLeft | QrPosition::Left
    );

    let (x, y, w, h) = if direction.is_row() {
        let w = full_w - qr_size_mm - padding_mm;
        let x = if qr_on_leading_edge || direction == LayoutDirection::Row {
            padding_mm + qr_size_mm + padding_mm
        } else {
            padding_mm
        };
        (x, padding_mm, w, full_h)
    } else {
        let h = full_h - qr_size_mm - padding_mm;
        let qr_on_top = matches!(
            qr_position,
            QrPosition::TopLeft | QrPosition::TopRight | QrPosition::Center
        );
        let y = if qr_on_top || direction == LayoutDirection::Column {
            padding_mm + qr_size_mm + padding_mm
        } else {
            padding_mm
        };
        (padding_mm, y, full_w, h)
    };

    FieldsArea {
        x_mm: x,
        y_mm: y,
        width_mm: w.max(MIN_FIELDS_AXIS_MM),
        height_mm: h.max(MIN_FIELDS_AXIS_MM),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::LabelField;
    use pretty_assertions::assert_eq;

    fn bounds() -> SizeBounds {
        SizeBounds {
            min_width_mm: 30.0,
            min_height_mm: 20.0,
            max_width_mm: 150.0,
            max_height_mm: 100.0,
        }
    }

    fn text_field(text: &str, font_size: f64) -> LabelField {
        LabelField {
            field_value: Some(text.to_string()),
            font_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_dynamic_size_clamps_to_min() {
        let size = dynamic_label_size(&[], 10.0, LayoutDirection::Row, 2.0, bounds());
        assert!(size.width_mm >= 30.0);
        assert!(size.height_mm >= 20.0);
        assert!(!size.fields_need_reflow);
    }

    #[test]
    fn test_dynamic_size_clamps_to_max() {
        let fields = vec![text_field(&"X".repeat(400), 12.0)];
        let size = dynamic_label_size(&fields, 20.0, LayoutDirection::Row, 2.0, bounds());
        assert!(size.width_mm <= 150.0);
        assert!(size.height_mm <= 100.0);
        assert!(size.fields_need_reflow);
    }

    #[test]
    fn test_dynamic_size_row_sums_widths() {
        // One short field: row layout adds QR width, column layout doesn't.
        let fields = vec![text_field("AB", 10.0)];
        let row = dynamic_label_size(&fields, 20.0, LayoutDirection::Row, 2.0, bounds());
        let col = dynamic_label_size(&fields, 20.0, LayoutDirection::Column, 2.0, bounds());
        assert!(row.width_mm > col.width_mm);
        assert!(col.height_mm > row.height_mm);
    }

    #[test]
    fn test_dynamic_size_monotonic_in_font_size() {
        let text = "Batch 42 / Warehouse East";
        let mut last_height = 0.0;
        for font_size in [6.0, 8.0, 10.0, 12.0, 16.0, 24.0] {
            let fields = vec![text_field(text, font_size)];
            let size =
                dynamic_label_size(&fields, 15.0, LayoutDirection::Column, 2.0, bounds());
            assert!(
                size.height_mm >= last_height,
                "height decreased at font size {font_size}"
            );
            last_height = size.height_mm;
        }
    }

    #[test]
    fn test_dynamic_size_field_spacing() {
        let one = dynamic_label_size(
            &[text_field("A", 10.0)],
            10.0,
            LayoutDirection::Column,
            2.0,
            bounds(),
        );
        let two = dynamic_label_size(
            &[text_field("A", 10.0), text_field("B", 10.0)],
            10.0,
            LayoutDirection::Column,
            2.0,
            bounds(),
        );
        // Second field adds its line height plus 2mm spacing.
        assert!((two.height_mm - one.height_mm - (5.0 + 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_optimal_a4_grid_small_label() {
        let grid = optimal_a4_grid(60.0, 30.0, DEFAULT_A4_MARGIN_MM, DEFAULT_A4_GUTTER_MM);
        assert!(grid.fits);
        // 60mm labels: 3 columns of 60+gutters = 186 <= 194 usable; 4 don't fit.
        assert_eq!(grid.columns, 3);
        assert_eq!(grid.rows, 8);
        assert!(grid.wasted_space_percent > 0.0);
    }

    #[test]
    fn test_optimal_a4_grid_oversized_label() {
        let grid = optimal_a4_grid(250.0, 350.0, DEFAULT_A4_MARGIN_MM, DEFAULT_A4_GUTTER_MM);
        assert!(!grid.fits);
        assert_eq!((grid.columns, grid.rows), (1, 1));
        assert_eq!(grid.wasted_space_percent, 100.0);
    }

    #[test]
    fn test_optimal_a4_grid_prefers_denser_page() {
        // A tiny label fits in every configuration; density should win out.
        let grid = optimal_a4_grid(20.0, 20.0, DEFAULT_A4_MARGIN_MM, DEFAULT_A4_GUTTER_MM);
        assert!(grid.fits);
        assert_eq!((grid.columns, grid.rows), (4, 8));
    }

    #[test]
    fn test_fields_area_row_carves_qr_column() {
        let area = fields_area(
            100.0,
            50.0,
            20.0,
            QrPosition::Left,
            LayoutDirection::Row,
            2.0,
        );
        assert!((area.x_mm - 24.0).abs() < 1e-9);
        assert!((area.width_mm - 74.0).abs() < 1e-9);
        assert!((area.height_mm - 46.0).abs() < 1e-9);
    }

    #[test]
    fn test_fields_area_column_carves_qr_row() {
        let area = fields_area(
            100.0,
            50.0,
            20.0,
            QrPosition::TopLeft,
            LayoutDirection::Column,
            2.0,
        );
        assert!((area.y_mm - 24.0).abs() < 1e-9);
        assert!((area.height_mm - 24.0).abs() < 1e-9);
        assert!((area.width_mm - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_fields_area_minimum_axis() {
        // QR nearly as large as the label: axes clamp to 10mm.
        let area = fields_area(
            30.0,
            30.0,
            25.0,
            QrPosition::Left,
            LayoutDirection::Row,
            2.0,
        );
        assert_eq!(area.width_mm, 10.0);
    }
}
