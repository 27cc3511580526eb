//! # Label Template Data Model
//!
//! A single type hierarchy that is both the Rust API and the JSON API.
//! `GeneratePayload` is constructible in Rust and deserializable from JSON.
//!
//! ```ignore
//! use etiqueta::template::*;
//!
//! // Rust construction
//! let payload = GeneratePayload {
//!     template: LabelTemplate::new(100.0, 50.0),
//!     records: vec![LabelRecord::from_qr("https://example.com")],
//!     page_preset: PagePreset::Roll,
//!     ..Default::default()
//! };
//!
//! // JSON deserialization
//! let preset: PagePreset = serde_json::from_str(r#"{"kind":"roll"}"#).unwrap();
//! ```
//!
//! Templates are authored once and read many times during generation; they
//! are never mutated during a single generation run. Records are created
//! fresh per call and never mutated after creation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::EtiquetaError;

fn default_true() -> bool {
    true
}

fn default_font_size() -> f64 {
    10.0
}

fn default_qr_size() -> f64 {
    20.0
}

fn default_border_width() -> f64 {
    0.2
}

// ============================================================================
// FIELDS
// ============================================================================

/// The kind of content a [`LabelField`] renders.
///
/// Unknown type strings deserialize to [`FieldType::Unknown`]; renderers log
/// and skip such fields rather than failing the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Text content with `{key}` placeholder substitution.
    #[default]
    Text,
    /// A bottom-border rule only, no text (e.g. a handwriting line).
    Blank,
    /// An embedded QR code, distinct from the label's primary QR.
    QrCode,
    /// Unrecognized type. Logged and skipped at render time.
    #[serde(other)]
    Unknown,
}

/// Horizontal text alignment within a field box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical text alignment within a field box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Font weight for field text. Unrecognized values fall back to normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    Bold,
    #[default]
    #[serde(other)]
    Normal,
}

/// One positioned element inside a label template.
///
/// Positions and sizes are millimeters relative to the label's top-left
/// corner. Overflow past the label edge is a caller error, not validated —
/// there is no automatic clipping guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelField {
    #[serde(default)]
    pub field_type: FieldType,
    /// Fallback display text, and the record lookup key for `qr_code` fields.
    #[serde(default)]
    pub field_name: Option<String>,
    /// Template string; `{key}` placeholders are substituted from the record.
    #[serde(default)]
    pub field_value: Option<String>,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default)]
    pub width_mm: f64,
    #[serde(default)]
    pub height_mm: f64,
    /// Font size in points.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    /// Text color (`#rgb`/`#rrggbb`). Falls back to the template's, then black.
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
    #[serde(default)]
    pub align: HorizontalAlign,
    #[serde(default)]
    pub vertical_align: VerticalAlign,
    /// Render order, ascending. Ties keep array order.
    #[serde(default)]
    pub sort_order: i32,
}

impl Default for LabelField {
    fn default() -> Self {
        Self {
            field_type: FieldType::Text,
            field_name: None,
            field_value: None,
            position_x: 0.0,
            position_y: 0.0,
            width_mm: 0.0,
            height_mm: 0.0,
            font_size: default_font_size(),
            font_weight: FontWeight::Normal,
            text_color: None,
            background_color: None,
            border_color: None,
            align: HorizontalAlign::Left,
            vertical_align: VerticalAlign::Top,
            sort_order: 0,
        }
    }
}

impl LabelField {
    /// Create a text field with the given value template.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            field_value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create an embedded QR field looking up `name` in the data record.
    pub fn qr(name: impl Into<String>) -> Self {
        Self {
            field_type: FieldType::QrCode,
            field_name: Some(name.into()),
            ..Default::default()
        }
    }
}

// ============================================================================
// QR PLACEMENT
// ============================================================================

/// Placement of the label's primary QR code within the label box.
///
/// Defaults to `left`; unrecognized strings deserialize to `center`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QrPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    #[default]
    Left,
    Right,
    #[serde(other)]
    Center,
}

/// An explicit millimeter position, overriding enum-based QR placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QrPoint {
    pub x: f64,
    pub y: f64,
}

/// Structured template configuration.
///
/// The source model carried this as a free-form JSON blob; here the one
/// field the engine consumes is explicit so the geometry input stays fully
/// typed. Unknown keys in the incoming JSON are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Explicit QR position in label-local millimeters. When set, wins over
    /// [`LabelTemplate::qr_position`].
    #[serde(default)]
    pub qr_position: Option<QrPoint>,
}

// ============================================================================
// TEMPLATE
// ============================================================================

/// A reusable label design, independent of any specific data record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelTemplate {
    /// Physical label width in millimeters. Must be > 0.
    pub width_mm: f64,
    /// Physical label height in millimeters. Must be > 0.
    pub height_mm: f64,
    #[serde(default)]
    pub bleed_mm: Option<f64>,
    #[serde(default)]
    pub safe_area_mm: Option<f64>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default = "default_border_width")]
    pub border_width_mm: f64,
    #[serde(default)]
    pub border_enabled: bool,
    /// Primary QR code edge length in millimeters.
    #[serde(default = "default_qr_size")]
    pub qr_size_mm: f64,
    #[serde(default)]
    pub qr_position: QrPosition,
    /// When false, only the primary QR code renders; fields are skipped.
    #[serde(default = "default_true")]
    pub show_additional_info: bool,
    #[serde(default)]
    pub fields: Vec<LabelField>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub template_config: Option<TemplateConfig>,
}

impl LabelTemplate {
    /// Create a template with the given physical size and defaults otherwise.
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
            bleed_mm: None,
            safe_area_mm: None,
            background_color: None,
            border_color: None,
            text_color: None,
            border_width_mm: default_border_width(),
            border_enabled: false,
            qr_size_mm: default_qr_size(),
            qr_position: QrPosition::default(),
            show_additional_info: true,
            fields: Vec::new(),
            font_family: None,
            template_config: None,
        }
    }

    /// Check the template's own invariants (positive physical size).
    pub fn validate(&self) -> Result<(), EtiquetaError> {
        if self.width_mm <= 0.0 || self.height_mm <= 0.0 {
            return Err(EtiquetaError::Geometry(format!(
                "template size must be positive, got {}mm x {}mm",
                self.width_mm, self.height_mm
            )));
        }
        Ok(())
    }

    /// The explicit QR position override from `template_config`, if any.
    pub fn qr_position_override(&self) -> Option<QrPoint> {
        self.template_config.as_ref().and_then(|c| c.qr_position)
    }
}

// ============================================================================
// DATA RECORDS
// ============================================================================

/// One label's worth of substitution data: string keys to string values.
///
/// The keys `qr` and `qrData` are reserved as the QR payload source, in that
/// fallback order; records with neither get a generated `label-{n}`
/// placeholder payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelRecord {
    pub values: HashMap<String, String>,
}

impl LabelRecord {
    /// Create a record whose QR payload is `payload`.
    pub fn from_qr(payload: impl Into<String>) -> Self {
        let mut values = HashMap::new();
        values.insert("qr".to_string(), payload.into());
        Self { values }
    }

    /// Look up a substitution value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// The record's primary QR payload: `qr`, then `qrData`, then a
    /// generated placeholder unique to the record's position in the batch
    /// (`index` is 0-based; the placeholder is 1-based).
    pub fn qr_payload(&self, index: usize) -> String {
        self.get("qr")
            .or_else(|| self.get("qrData"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("label-{}", index + 1))
    }

    /// The payload for an embedded `qr_code` field: the named record value,
    /// then the record's `qr`, then a field-name placeholder.
    pub fn field_qr_payload(&self, field_name: &str, index: usize) -> String {
        self.get(field_name)
            .or_else(|| self.get("qr"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", field_name, index + 1))
    }
}

// ============================================================================
// PAGE PRESETS
// ============================================================================

/// Physical page dimensions and margin for a sheet preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SheetPage {
    pub width_mm: f64,
    pub height_mm: f64,
    #[serde(default)]
    pub margin_mm: f64,
}

/// Regular label grid on a sheet page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SheetGrid {
    /// Columns of labels per page. Must be >= 1.
    pub columns: u32,
    /// Rows of labels per page. Must be >= 1.
    pub rows: u32,
    #[serde(default)]
    pub gutter_x_mm: f64,
    #[serde(default)]
    pub gutter_y_mm: f64,
}

/// The physical output medium: a fixed sheet with a label grid, or a roll
/// printing one label per page (page size = label size).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PagePreset {
    Sheet { page: SheetPage, grid: SheetGrid },
    Roll,
}

impl PagePreset {
    /// A4 sheet (210×297mm) with the given grid.
    pub fn a4_sheet(columns: u32, rows: u32, margin_mm: f64, gutter_mm: f64) -> Self {
        PagePreset::Sheet {
            page: SheetPage {
                width_mm: 210.0,
                height_mm: 297.0,
                margin_mm,
            },
            grid: SheetGrid {
                columns,
                rows,
                gutter_x_mm: gutter_mm,
                gutter_y_mm: gutter_mm,
            },
        }
    }

    /// US Letter sheet (215.9×279.4mm) with the given grid.
    pub fn letter_sheet(columns: u32, rows: u32, margin_mm: f64, gutter_mm: f64) -> Self {
        PagePreset::Sheet {
            page: SheetPage {
                width_mm: 215.9,
                height_mm: 279.4,
                margin_mm,
            },
            grid: SheetGrid {
                columns,
                rows,
                gutter_x_mm: gutter_mm,
                gutter_y_mm: gutter_mm,
            },
        }
    }

    /// Labels per physical page: `columns * rows` for sheets, 1 for rolls.
    pub fn labels_per_page(&self) -> usize {
        match self {
            PagePreset::Sheet { grid, .. } => (grid.columns as usize) * (grid.rows as usize),
            PagePreset::Roll => 1,
        }
    }
}

// ============================================================================
// GENERATION PAYLOAD
// ============================================================================

/// The top-level generation request: the unit of work for one call.
///
/// Stateless and never persisted; each call is independent of any other
/// concurrent call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePayload {
    pub template: LabelTemplate,
    pub records: Vec<LabelRecord>,
    pub page_preset: PagePreset,
    /// Overrides the template's font family for this run.
    #[serde(default)]
    pub font_family: Option<String>,
    /// Emit `@font-face` declarations in HTML output.
    #[serde(default)]
    pub embed_fonts: bool,
    /// Draw grid-cell outlines in HTML output (layout debugging).
    #[serde(default)]
    pub debug_grid: bool,
}

impl Default for GeneratePayload {
    fn default() -> Self {
        Self {
            template: LabelTemplate::new(100.0, 50.0),
            records: Vec::new(),
            page_preset: PagePreset::Roll,
            font_family: None,
            embed_fonts: false,
            debug_grid: false,
        }
    }
}

// ============================================================================
// VARIABLE SUBSTITUTION
// ============================================================================

/// Replace `{key}` placeholders with values from the record.
///
/// For each record key, the first matching occurrence is replaced
/// (case-sensitive). Matches are located against the original text, so
/// substituted values are never re-expanded. Placeholders with no matching
/// record key stay verbatim — silent removal would hide data errors on
/// printed labels.
pub fn substitute(text: &str, record: &LabelRecord) -> String {
    // (byte offset, placeholder length, replacement value)
    let mut matches: Vec<(usize, usize, &str)> = Vec::new();
    for (key, value) in &record.values {
        let placeholder = format!("{{{}}}", key);
        if let Some(pos) = text.find(&placeholder) {
            matches.push((pos, placeholder.len(), value.as_str()));
        }
    }
    matches.sort_by_key(|&(pos, _, _)| pos);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (pos, len, value) in matches {
        if pos < cursor {
            continue;
        }
        out.push_str(&text[cursor..pos]);
        out.push_str(value);
        cursor = pos + len;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_substitute_basic() {
        let record = LabelRecord::default().with("sku", "A1").with("lot", "77");
        assert_eq!(substitute("SKU-{sku}-{lot}", &record), "SKU-A1-77");
    }

    #[test]
    fn test_substitute_unmatched_key_stays_verbatim() {
        let record = LabelRecord::default().with("sku", "A1");
        assert_eq!(substitute("{sku}/{missing}", &record), "A1/{missing}");
    }

    #[test]
    fn test_substitute_first_occurrence_only() {
        let record = LabelRecord::default().with("x", "1");
        assert_eq!(substitute("{x} {x}", &record), "1 {x}");
    }

    #[test]
    fn test_substitute_no_recursion() {
        let record = LabelRecord::default().with("a", "{b}").with("b", "2");
        // The value substituted for {a} must not be re-expanded.
        assert_eq!(substitute("{a}", &record), "{b}");
    }

    #[test]
    fn test_qr_payload_fallback_order() {
        let rec = LabelRecord::from_qr("PAYLOAD");
        assert_eq!(rec.qr_payload(0), "PAYLOAD");

        let rec = LabelRecord::default().with("qrData", "ALT");
        assert_eq!(rec.qr_payload(0), "ALT");

        let rec = LabelRecord::default();
        assert_eq!(rec.qr_payload(2), "label-3");
    }

    #[test]
    fn test_field_qr_payload_fallback_order() {
        let rec = LabelRecord::default().with("serial", "S-9").with("qr", "Q");
        assert_eq!(rec.field_qr_payload("serial", 0), "S-9");
        assert_eq!(rec.field_qr_payload("absent", 0), "Q");

        let rec = LabelRecord::default();
        assert_eq!(rec.field_qr_payload("serial", 0), "serial-1");
    }

    #[test]
    fn test_unknown_field_type_deserializes() {
        let field: LabelField =
            serde_json::from_str(r#"{"field_type":"barcode_39"}"#).unwrap();
        assert_eq!(field.field_type, FieldType::Unknown);
    }

    #[test]
    fn test_unknown_qr_position_falls_back_to_center() {
        #[derive(Deserialize)]
        struct Holder {
            pos: QrPosition,
        }
        let h: Holder = serde_json::from_str(r#"{"pos":"diagonal"}"#).unwrap();
        assert_eq!(h.pos, QrPosition::Center);
    }

    #[test]
    fn test_qr_position_default_is_left() {
        assert_eq!(QrPosition::default(), QrPosition::Left);
    }

    #[test]
    fn test_page_preset_json_round_trip() {
        let preset = PagePreset::a4_sheet(3, 8, 8.0, 3.0);
        let json = serde_json::to_string(&preset).unwrap();
        assert!(json.contains(r#""kind":"sheet""#));
        let back: PagePreset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, preset);

        let roll: PagePreset = serde_json::from_str(r#"{"kind":"roll"}"#).unwrap();
        assert_eq!(roll, PagePreset::Roll);
        assert_eq!(roll.labels_per_page(), 1);
    }

    #[test]
    fn test_labels_per_page_sheet() {
        assert_eq!(PagePreset::a4_sheet(2, 5, 8.0, 3.0).labels_per_page(), 10);
    }

    #[test]
    fn test_template_validate() {
        assert!(LabelTemplate::new(100.0, 50.0).validate().is_ok());
        assert!(LabelTemplate::new(0.0, 50.0).validate().is_err());
        assert!(LabelTemplate::new(100.0, -1.0).validate().is_err());
    }

    #[test]
    fn test_template_config_override() {
        let mut template = LabelTemplate::new(80.0, 40.0);
        assert_eq!(template.qr_position_override(), None);

        template.template_config = Some(TemplateConfig {
            qr_position: Some(QrPoint { x: 5.0, y: 7.5 }),
        });
        assert_eq!(
            template.qr_position_override(),
            Some(QrPoint { x: 5.0, y: 7.5 })
        );
    }

    #[test]
    fn test_template_config_ignores_unknown_keys() {
        let config: TemplateConfig =
            serde_json::from_str(r#"{"qr_position":{"x":1.0,"y":2.0},"legacy_flag":true}"#)
                .unwrap();
        assert_eq!(config.qr_position, Some(QrPoint { x: 1.0, y: 2.0 }));
    }

    #[test]
    fn test_field_defaults() {
        let field: LabelField = serde_json::from_str("{}").unwrap();
        assert_eq!(field.field_type, FieldType::Text);
        assert_eq!(field.font_size, 10.0);
        assert_eq!(field.sort_order, 0);
        assert_eq!(field.align, HorizontalAlign::Left);
    }
}
