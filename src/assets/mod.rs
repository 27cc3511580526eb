//! # QR Asset Pre-generation
//!
//! Batched, deduplicated QR raster generation. QR rendering is the most
//! expensive step per label, so the whole batch's distinct payloads are
//! collected first and each is rendered exactly once, concurrently with a
//! bounded fan-out, before any layout work begins.
//!
//! The raster backend is a black box behind [`QrImageRenderer`]: payload
//! string in, raster data URL out. [`QrcodeRenderer`] is the default
//! implementation. A failing payload is logged and omitted from the asset
//! map — consumers treat a missing entry as "render without a QR image",
//! never as a batch failure.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::stream::{self, StreamExt};
use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::EtiquetaError;
use crate::template::{FieldType, LabelRecord, LabelTemplate};

/// Maximum number of QR rasters rendered concurrently per batch.
const MAX_CONCURRENT_RENDERS: usize = 8;

fn default_width_px() -> u32 {
    200
}

fn default_dark() -> String {
    "#000000".to_string()
}

fn default_light() -> String {
    "#ffffff".to_string()
}

/// Options passed to the QR raster backend.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QrRenderOptions {
    /// Target edge length in pixels.
    #[serde(default = "default_width_px")]
    pub width_px: u32,
    /// Quiet-zone margin in modules.
    #[serde(default)]
    pub margin: u32,
    /// Dark module color (`#rgb`/`#rrggbb`).
    #[serde(default = "default_dark")]
    pub dark: String,
    /// Light module color (`#rgb`/`#rrggbb`).
    #[serde(default = "default_light")]
    pub light: String,
}

impl Default for QrRenderOptions {
    fn default() -> Self {
        Self {
            width_px: default_width_px(),
            margin: 0,
            dark: default_dark(),
            light: default_light(),
        }
    }
}

/// Raster backend turning a payload string into an image data URL.
///
/// The engine treats this as an external collaborator: it never inspects the
/// returned URL and tolerates per-payload failures.
#[async_trait]
pub trait QrImageRenderer: Sync {
    async fn render(
        &self,
        payload: &str,
        opts: &QrRenderOptions,
    ) -> Result<String, EtiquetaError>;
}

/// Default QR raster backend built on the `qrcode` crate.
///
/// Encodes with medium error correction, scales the module matrix to
/// approximately `width_px` pixels, and returns a PNG data URL.
#[derive(Debug, Clone, Default)]
pub struct QrcodeRenderer;

/// Map a `#rgb`/`#rrggbb` color to an 8-bit gray level (mean of channels).
fn hex_to_gray(color: &str, fallback: u8) -> u8 {
    let hex = color.trim_start_matches('#');
    let expand = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v * 17);
    let (r, g, b) = match hex.len() {
        3 => (
            expand(&hex[0..1]),
            expand(&hex[1..2]),
            expand(&hex[2..3]),
        ),
        6 => (
            u8::from_str_radix(&hex[0..2], 16).ok(),
            u8::from_str_radix(&hex[2..4], 16).ok(),
            u8::from_str_radix(&hex[4..6], 16).ok(),
        ),
        _ => (None, None, None),
    };
    match (r, g, b) {
        (Some(r), Some(g), Some(b)) => {
            ((r as u16 + g as u16 + b as u16) / 3) as u8
        }
        _ => fallback,
    }
}

#[async_trait]
impl QrImageRenderer for QrcodeRenderer {
    async fn render(
        &self,
        payload: &str,
        opts: &QrRenderOptions,
    ) -> Result<String, EtiquetaError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
            .map_err(|e| EtiquetaError::Asset(format!("QR encode failed: {}", e)))?;

        let modules = code.width();
        let colors = code.to_colors();
        let quiet = opts.margin as usize;
        let total_modules = modules + 2 * quiet;
        let scale = ((opts.width_px as usize) / total_modules).max(1) as u32;
        let size = total_modules as u32 * scale;

        let dark = hex_to_gray(&opts.dark, 0);
        let light = hex_to_gray(&opts.light, 255);

        let mut img = GrayImage::from_pixel(size, size, Luma([light]));
        for (i, color) in colors.iter().enumerate() {
            if *color != Color::Dark {
                continue;
            }
            let mx = (i % modules + quiet) as u32;
            let my = (i / modules + quiet) as u32;
            for dy in 0..scale {
                for dx in 0..scale {
                    img.put_pixel(mx * scale + dx, my * scale + dy, Luma([dark]));
                }
            }
        }

        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| EtiquetaError::Asset(format!("PNG encode failed: {}", e)))?;

        Ok(format!("data:image/png;base64,{}", BASE64.encode(&png)))
    }
}

/// Collect the distinct QR payloads needed across the whole batch, in first
/// appearance order.
///
/// One payload per record (`qr` → `qrData` → generated placeholder), plus
/// one per `qr_code`-type field per record (`record[field_name]` →
/// `record.qr` → field-name placeholder).
pub fn collect_payloads(template: &LabelTemplate, records: &[LabelRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut payloads = Vec::new();
    let mut push = |payload: String| {
        if seen.insert(payload.clone()) {
            payloads.push(payload);
        }
    };

    for (index, record) in records.iter().enumerate() {
        push(record.qr_payload(index));
        for field in &template.fields {
            if field.field_type != FieldType::QrCode {
                continue;
            }
            let name = field.field_name.as_deref().unwrap_or("qr_code");
            push(record.field_qr_payload(name, index));
        }
    }
    payloads
}

/// Render every distinct payload in the batch once and return the
/// payload → data URL map.
///
/// Rendering calls are independent, so they run concurrently up to a
/// bounded fan-out and are joined before returning — layout for every page
/// depends on the completed map. A payload whose rendering fails is logged
/// and simply absent from the map.
pub async fn generate_all_assets(
    template: &LabelTemplate,
    records: &[LabelRecord],
    renderer: &dyn QrImageRenderer,
) -> HashMap<String, String> {
    let payloads = collect_payloads(template, records);
    let opts = QrRenderOptions::default();

    let results: Vec<(String, Result<String, EtiquetaError>)> = stream::iter(payloads)
        .map(|payload| {
            let opts = &opts;
            async move {
                let result = renderer.render(&payload, opts).await;
                (payload, result)
            }
        })
        .buffer_unordered(MAX_CONCURRENT_RENDERS)
        .collect()
        .await;

    let mut assets = HashMap::new();
    for (payload, result) in results {
        match result {
            Ok(data_url) => {
                assets.insert(payload, data_url);
            }
            Err(e) => {
                log::warn!("QR render failed for payload {:?}: {}", payload, e);
            }
        }
    }
    assets
}
