//! # Rendering Backends
//!
//! Turns a [`GeneratePayload`] into final output. Both backends consume the
//! same [`plan::DocumentPlan`], so a PDF and an HTML rendering of the same
//! payload place every label, QR code, and field identically.
//!
//! | Backend | Output | Use |
//! |---------|--------|-----|
//! | [`pdf`] | `Vec<u8>` | Download / archival, one file per batch |
//! | [`html`] | `String` | Browser print dialog, self-contained page |

pub mod html;
pub mod pdf;
pub mod plan;

pub use plan::{DocumentPlan, build_plan};

use crate::assets::{self, QrImageRenderer};
use crate::error::EtiquetaError;
use crate::template::GeneratePayload;

/// Generate a multi-page PDF for the payload.
///
/// Runs the geometry gate first, then pre-renders all QR assets, builds the
/// shared layout plan, and emits the document. An unprintable batch is
/// rejected before any QR rendering work is spent on it.
pub async fn generate_pdf(
    payload: &GeneratePayload,
    renderer: &dyn QrImageRenderer,
) -> Result<Vec<u8>, EtiquetaError> {
    plan::validate_geometry(payload)?;
    let assets = assets::generate_all_assets(&payload.template, &payload.records, renderer).await;
    let plan = plan::build_plan(payload, &assets)?;
    log::info!(
        "rendering PDF: {} pages, {} labels",
        plan.pages.len(),
        payload.records.len()
    );
    Ok(pdf::render_pdf(&plan))
}

/// Generate a self-contained print-ready HTML document for the payload.
/// Same pipeline as [`generate_pdf`]: geometry gate, assets, plan, emit.
pub async fn generate_html(
    payload: &GeneratePayload,
    renderer: &dyn QrImageRenderer,
) -> Result<String, EtiquetaError> {
    plan::validate_geometry(payload)?;
    let assets = assets::generate_all_assets(&payload.template, &payload.records, renderer).await;
    let plan = plan::build_plan(payload, &assets)?;
    log::info!(
        "rendering HTML: {} pages, {} labels",
        plan.pages.len(),
        payload.records.len()
    );
    Ok(html::render_html(&plan))
}

// ============================================================================
// COLORS
// ============================================================================

/// An opaque RGB color, parsed once at plan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// CSS hex form, `#rrggbb`.
    pub fn css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Unit-range components for PDF `rg` operators.
    pub fn unit(&self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// Parse a `#rgb` or `#rrggbb` color string. Anything else is `None`, which
/// callers map to their context's fallback color.
pub fn parse_color(value: &str) -> Option<Rgb> {
    let hex = value.trim().strip_prefix('#')?;
    match hex.len() {
        3 => {
            let expand = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v * 17);
            Some(Rgb {
                r: expand(&hex[0..1])?,
                g: expand(&hex[1..2])?,
                b: expand(&hex[2..3])?,
            })
        }
        6 => Some(Rgb {
            r: u8::from_str_radix(&hex[0..2], 16).ok()?,
            g: u8::from_str_radix(&hex[2..4], 16).ok()?,
            b: u8::from_str_radix(&hex[4..6], 16).ok()?,
        }),
        _ => None,
    }
}

/// Escape text for inclusion in HTML element content or attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_color_six_digit() {
        assert_eq!(
            parse_color("#1a2b3c"),
            Some(Rgb {
                r: 0x1a,
                g: 0x2b,
                b: 0x3c
            })
        );
    }

    #[test]
    fn test_parse_color_three_digit_expands() {
        assert_eq!(
            parse_color("#f0a"),
            Some(Rgb {
                r: 0xff,
                g: 0x00,
                b: 0xaa
            })
        );
    }

    #[test]
    fn test_parse_color_rejects_garbage() {
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#gggggg"), None);
        assert_eq!(parse_color(""), None);
    }

    #[test]
    fn test_rgb_css_round_trip() {
        let color = Rgb {
            r: 255,
            g: 128,
            b: 0,
        };
        assert_eq!(color.css(), "#ff8000");
        assert_eq!(parse_color(&color.css()), Some(color));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"A&B"</b>"#),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
