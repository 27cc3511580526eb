//! # Document Plan
//!
//! The backend-neutral layout plan both renderers consume. Templates and
//! records compile to positioned primitives (pages, label boxes, QR
//! placements, resolved fields) here; the PDF and HTML backends only
//! translate those primitives into their output format. Keeping one plan
//! builder is what guarantees the two backends lay out identically.
//!
//! All coordinates are millimeters in page space (top-left origin); font
//! sizes are points.

use std::collections::HashMap;

use crate::error::EtiquetaError;
use crate::layout::{self, CellSize, DEFAULT_FIT_TOLERANCE_MM};
use crate::template::{
    FieldType, GeneratePayload, HorizontalAlign, LabelRecord, LabelTemplate, PagePreset,
    VerticalAlign, substitute,
};

use super::{Rgb, parse_color};

/// Minimum rendered font size in points, applied to both backends.
/// Below this, label text is illegible on common thermal/laser stock.
pub const MIN_FONT_SIZE_PT: f64 = 8.0;

/// Padding between the label edge and an enum-placed QR code.
pub const QR_PADDING_MM: f64 = 2.0;

/// Fallback text for fields with neither a value template nor a name.
const SAMPLE_TEXT: &str = "Sample text";

/// The complete layout plan for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    pub pages: Vec<PagePlan>,
    /// Resolved font family (payload override → template → Helvetica).
    pub font_family: String,
    pub embed_fonts: bool,
    /// Grid-cell outlines for the HTML debug overlay (sheet presets only).
    pub debug_grid: Option<Vec<CellRect>>,
}

/// One physical output page.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub width_mm: f64,
    pub height_mm: f64,
    pub labels: Vec<LabelPlan>,
}

/// One grid cell outline, page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRect {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// One label, absolutely positioned on its page.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlan {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub background: Option<Rgb>,
    pub border: Option<BorderPlan>,
    /// The label's primary QR code. Always present; `data_url` is `None`
    /// when the asset failed to render (backends draw a placeholder box).
    pub qr: QrPlan,
    /// Resolved fields in render order. Empty when the template's
    /// `show_additional_info` is false.
    pub fields: Vec<FieldPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderPlan {
    pub color: Rgb,
    pub width_mm: f64,
}

/// A placed QR image, label-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct QrPlan {
    pub x_mm: f64,
    pub y_mm: f64,
    pub size_mm: f64,
    pub data_url: Option<String>,
}

/// A resolved field, label-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub content: FieldContent,
}

/// What a resolved field draws.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldContent {
    Text {
        text: String,
        font_size_pt: f64,
        bold: bool,
        color: Rgb,
        background: Option<Rgb>,
        border: Option<Rgb>,
        align: HorizontalAlign,
        vertical_align: VerticalAlign,
    },
    /// A bottom-border rule only (blank/handwriting fields).
    Rule { color: Rgb },
    /// An embedded QR image filling the field box (contain fit).
    Qr { data_url: Option<String> },
}

/// Resolved page-level geometry for a payload.
struct PageGeometry {
    page_width_mm: f64,
    page_height_mm: f64,
    /// Grid cell size for sheet presets, `None` on a roll.
    cell: Option<CellSize>,
    /// Page margin; cell offsets start here. Zero on a roll.
    origin_mm: f64,
}

/// Resolve the payload's page geometry, running the full pre-flight gate:
/// template invariants plus, for sheet presets, the grid fit check within
/// [`DEFAULT_FIT_TOLERANCE_MM`] — every violated axis in one message. The
/// preset's own grid is the single source of truth for per-page capacity
/// and page size.
fn resolve_page_geometry(payload: &GeneratePayload) -> Result<PageGeometry, EtiquetaError> {
    let template = &payload.template;
    template.validate()?;

    match &payload.page_preset {
        PagePreset::Sheet { page, grid } => {
            if grid.columns < 1 || grid.rows < 1 {
                return Err(EtiquetaError::Geometry(format!(
                    "sheet grid must have at least one column and row, got {}x{}",
                    grid.columns, grid.rows
                )));
            }
            let cell = layout::cell_size(
                page.width_mm,
                page.height_mm,
                page.margin_mm,
                grid.columns,
                grid.rows,
                grid.gutter_x_mm,
                grid.gutter_y_mm,
            );
            let fit = layout::validate_template_fits_grid(
                template.width_mm,
                template.height_mm,
                cell.width_mm,
                cell.height_mm,
                DEFAULT_FIT_TOLERANCE_MM,
            );
            if !fit.fits {
                return Err(EtiquetaError::Geometry(fit.errors.join("; ")));
            }
            Ok(PageGeometry {
                page_width_mm: page.width_mm,
                page_height_mm: page.height_mm,
                cell: Some(cell),
                origin_mm: page.margin_mm,
            })
        }
        PagePreset::Roll => Ok(PageGeometry {
            page_width_mm: template.width_mm,
            page_height_mm: template.height_mm,
            cell: None,
            origin_mm: 0.0,
        }),
    }
}

/// Run the geometry gate without building a plan.
///
/// Entry points call this before QR asset generation so an unprintable
/// batch is rejected before any rendering work is spent on it.
pub fn validate_geometry(payload: &GeneratePayload) -> Result<(), EtiquetaError> {
    resolve_page_geometry(payload).map(|_| ())
}

/// Build the layout plan for a generation payload.
///
/// Runs the same geometry gate as [`validate_geometry`], then resolves
/// every record into positioned label primitives.
pub fn build_plan(
    payload: &GeneratePayload,
    assets: &HashMap<String, String>,
) -> Result<DocumentPlan, EtiquetaError> {
    let template = &payload.template;
    let geometry = resolve_page_geometry(payload)?;
    let per_page = payload.page_preset.labels_per_page();
    let (page_width, page_height, cell, origin) = (
        geometry.page_width_mm,
        geometry.page_height_mm,
        geometry.cell,
        geometry.origin_mm,
    );

    let mut pages = Vec::with_capacity(layout::pages_needed(payload.records.len(), per_page));
    for (page_index, chunk) in payload.records.chunks(per_page).enumerate() {
        let mut labels = Vec::with_capacity(chunk.len());
        for (slot, record) in chunk.iter().enumerate() {
            let record_index = page_index * per_page + slot;
            let (x_mm, y_mm) = match (&payload.page_preset, cell) {
                (PagePreset::Sheet { grid, .. }, Some(cell)) => {
                    let pos = layout::cell_position(
                        slot,
                        grid.columns,
                        origin,
                        cell,
                        grid.gutter_x_mm,
                        grid.gutter_y_mm,
                    );
                    (pos.x_mm, pos.y_mm)
                }
                _ => (0.0, 0.0),
            };
            labels.push(build_label(template, record, record_index, x_mm, y_mm, assets));
        }
        pages.push(PagePlan {
            width_mm: page_width,
            height_mm: page_height,
            labels,
        });
    }

    let debug_grid = match (&payload.page_preset, cell, payload.debug_grid) {
        (PagePreset::Sheet { page, grid }, Some(cell), true) => {
            let cells = (0..per_page)
                .map(|i| {
                    let pos = layout::cell_position(
                        i,
                        grid.columns,
                        page.margin_mm,
                        cell,
                        grid.gutter_x_mm,
                        grid.gutter_y_mm,
                    );
                    CellRect {
                        x_mm: pos.x_mm,
                        y_mm: pos.y_mm,
                        width_mm: cell.width_mm,
                        height_mm: cell.height_mm,
                    }
                })
                .collect();
            Some(cells)
        }
        _ => None,
    };

    Ok(DocumentPlan {
        pages,
        font_family: payload
            .font_family
            .clone()
            .or_else(|| template.font_family.clone())
            .unwrap_or_else(|| "Helvetica".to_string()),
        embed_fonts: payload.embed_fonts,
        debug_grid,
    })
}

/// Resolve one label: primary QR placement plus fields.
fn build_label(
    template: &LabelTemplate,
    record: &LabelRecord,
    record_index: usize,
    x_mm: f64,
    y_mm: f64,
    assets: &HashMap<String, String>,
) -> LabelPlan {
    let background = template.background_color.as_deref().and_then(parse_color);
    let border = if template.border_enabled {
        Some(BorderPlan {
            color: template
                .border_color
                .as_deref()
                .and_then(parse_color)
                .unwrap_or(Rgb::BLACK),
            width_mm: template.border_width_mm,
        })
    } else {
        None
    };

    // Explicit pixel override from template_config wins over the enum.
    let (qr_x, qr_y) = match template.qr_position_override() {
        Some(point) => (point.x, point.y),
        None => {
            let offset = layout::qr_position(
                template.qr_position,
                template.width_mm,
                template.height_mm,
                template.qr_size_mm,
                QR_PADDING_MM,
            );
            (offset.x_mm, offset.y_mm)
        }
    };
    let qr = QrPlan {
        x_mm: qr_x,
        y_mm: qr_y,
        size_mm: template.qr_size_mm,
        data_url: assets.get(&record.qr_payload(record_index)).cloned(),
    };

    let mut fields = Vec::new();
    if template.show_additional_info {
        // Ascending sort order; the stable sort keeps array order on ties.
        let mut ordered: Vec<&_> = template.fields.iter().collect();
        ordered.sort_by_key(|f| f.sort_order);

        for field in ordered {
            let content = match field.field_type {
                FieldType::Text => {
                    let raw = field
                        .field_value
                        .as_deref()
                        .or(field.field_name.as_deref())
                        .unwrap_or(SAMPLE_TEXT);
                    FieldContent::Text {
                        text: substitute(raw, record),
                        font_size_pt: field.font_size.max(MIN_FONT_SIZE_PT),
                        bold: field.font_weight == crate::template::FontWeight::Bold,
                        color: field
                            .text_color
                            .as_deref()
                            .or(template.text_color.as_deref())
                            .and_then(parse_color)
                            .unwrap_or(Rgb::BLACK),
                        background: field.background_color.as_deref().and_then(parse_color),
                        border: field.border_color.as_deref().and_then(parse_color),
                        align: field.align,
                        vertical_align: field.vertical_align,
                    }
                }
                FieldType::Blank => FieldContent::Rule {
                    color: field
                        .border_color
                        .as_deref()
                        .or(template.border_color.as_deref())
                        .and_then(parse_color)
                        .unwrap_or(Rgb::BLACK),
                },
                FieldType::QrCode => {
                    let name = field.field_name.as_deref().unwrap_or("qr_code");
                    let payload = record.field_qr_payload(name, record_index);
                    FieldContent::Qr {
                        data_url: assets.get(&payload).cloned(),
                    }
                }
                FieldType::Unknown => {
                    log::warn!(
                        "skipping field {:?} with unknown type",
                        field.field_name.as_deref().unwrap_or("<unnamed>")
                    );
                    continue;
                }
            };
            fields.push(FieldPlan {
                x_mm: field.position_x,
                y_mm: field.position_y,
                width_mm: field.width_mm,
                height_mm: field.height_mm,
                content,
            });
        }
    }

    LabelPlan {
        x_mm,
        y_mm,
        width_mm: template.width_mm,
        height_mm: template.height_mm,
        background,
        border,
        qr,
        fields,
    }
}
