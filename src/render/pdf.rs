//! PDF backend built on `pdf-writer`.
//!
//! Output uses the base-14 Helvetica fonts, so no font embedding is needed
//! and the files stay small. QR rasters are decoded from their data URLs
//! once per distinct payload and embedded as grayscale image XObjects shared
//! by every page that shows them.
//!
//! PDF's coordinate origin is the bottom-left corner; the plan's is the
//! top-left. Every y coordinate flips through `page_height - y - height`.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};

use super::plan::{DocumentPlan, FieldContent, LabelPlan};
use crate::template::{HorizontalAlign, VerticalAlign};
use crate::units::mm_to_pt;

/// Regular / bold resource names for the page font dictionary.
const FONT_REGULAR: &[u8] = b"F1";
const FONT_BOLD: &[u8] = b"F2";

/// Approximate advance width of one Helvetica glyph as a fraction of the
/// font size. Good enough for centering short label text; exact metrics
/// are not worth carrying for base-14 output.
const AVG_GLYPH_WIDTH: f64 = 0.5;

/// Line width for QR placeholder outlines and field borders, points.
const HAIRLINE_PT: f32 = 0.5;

/// Render the plan to a complete PDF document. Infallible: geometry
/// problems are caught at plan time and malformed QR assets degrade to
/// placeholder outlines.
pub fn render_pdf(plan: &DocumentPlan) -> Vec<u8> {
    let mut pdf = Pdf::new();

    let mut ref_counter = 0;
    let mut alloc = || {
        ref_counter += 1;
        Ref::new(ref_counter)
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let regular_font_id = alloc();
    let bold_font_id = alloc();

    pdf.type1_font(regular_font_id)
        .base_font(Name(b"Helvetica"));
    pdf.type1_font(bold_font_id)
        .base_font(Name(b"Helvetica-Bold"));

    // Embed each distinct QR raster once; pages reference them by name.
    let mut qr_xobjects: HashMap<String, (String, Ref)> = HashMap::new();
    for page in &plan.pages {
        for label in &page.labels {
            let mut urls: Vec<&str> = label.qr.data_url.as_deref().into_iter().collect();
            for field in &label.fields {
                if let FieldContent::Qr {
                    data_url: Some(url),
                } = &field.content
                {
                    urls.push(url);
                }
            }
            for url in urls {
                if qr_xobjects.contains_key(url) {
                    continue;
                }
                if let Some(xobj_ref) = embed_qr_image(&mut pdf, &mut alloc, url) {
                    let name = format!("Qr{}", qr_xobjects.len() + 1);
                    qr_xobjects.insert(url.to_string(), (name, xobj_ref));
                }
            }
        }
    }

    let mut contents = Vec::with_capacity(plan.pages.len());
    for page in &plan.pages {
        let page_h_pt = mm_to_pt(page.height_mm);
        let mut content = Content::new();
        for label in &page.labels {
            draw_label(&mut content, label, page_h_pt, &qr_xobjects);
        }
        contents.push(content);
    }

    let page_ids: Vec<Ref> = (0..plan.pages.len()).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..plan.pages.len()).map(|_| alloc()).collect();

    for (i, content) in contents.into_iter().enumerate() {
        pdf.stream(content_ids[i], &content.finish());
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(plan.pages.len() as i32);

    for (i, page) in plan.pages.iter().enumerate() {
        let w = mm_to_pt(page.width_mm) as f32;
        let h = mm_to_pt(page.height_mm) as f32;
        let mut pdf_page = pdf.page(page_ids[i]);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, w, h))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = pdf_page.resources();
        {
            let mut fonts = resources.fonts();
            fonts.pair(Name(FONT_REGULAR), regular_font_id);
            fonts.pair(Name(FONT_BOLD), bold_font_id);
        }
        if !qr_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in qr_xobjects.values() {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    pdf.finish()
}

/// Decode a PNG data URL and embed it as an uncompressed grayscale XObject.
/// Returns `None` (with a warning) on malformed input; the caller falls back
/// to a placeholder outline.
fn embed_qr_image(pdf: &mut Pdf, alloc: &mut dyn FnMut() -> Ref, data_url: &str) -> Option<Ref> {
    let encoded = data_url.strip_prefix("data:image/png;base64,").or_else(|| {
        log::warn!("unsupported QR data URL scheme, skipping image");
        None
    })?;
    let png = BASE64
        .decode(encoded)
        .map_err(|e| log::warn!("QR data URL base64 decode failed: {}", e))
        .ok()?;
    let gray = image::load_from_memory(&png)
        .map_err(|e| log::warn!("QR PNG decode failed: {}", e))
        .ok()?
        .to_luma8();

    let xobj_ref = alloc();
    let mut xobj = pdf.image_xobject(xobj_ref, gray.as_raw());
    xobj.width(gray.width() as i32);
    xobj.height(gray.height() as i32);
    xobj.color_space().device_gray();
    xobj.bits_per_component(8);
    Some(xobj_ref)
}

fn draw_label(
    content: &mut Content,
    label: &LabelPlan,
    page_h_pt: f64,
    qr_xobjects: &HashMap<String, (String, Ref)>,
) {
    let lx = mm_to_pt(label.x_mm);
    let ly = mm_to_pt(label.y_mm);
    let lw = mm_to_pt(label.width_mm);
    let lh = mm_to_pt(label.height_mm);

    // Label background and border.
    if let Some(bg) = label.background {
        let (r, g, b) = bg.unit();
        content.save_state();
        content.set_fill_rgb(r, g, b);
        content
            .rect(lx as f32, flip(page_h_pt, ly, lh), lw as f32, lh as f32)
            .fill_nonzero();
        content.restore_state();
    }
    if let Some(border) = label.border {
        let (r, g, b) = border.color.unit();
        content.save_state();
        content.set_stroke_rgb(r, g, b);
        content.set_line_width(mm_to_pt(border.width_mm) as f32);
        content
            .rect(lx as f32, flip(page_h_pt, ly, lh), lw as f32, lh as f32)
            .stroke();
        content.restore_state();
    }

    // Primary QR.
    draw_qr(
        content,
        lx + mm_to_pt(label.qr.x_mm),
        ly + mm_to_pt(label.qr.y_mm),
        mm_to_pt(label.qr.size_mm),
        mm_to_pt(label.qr.size_mm),
        label.qr.data_url.as_deref(),
        page_h_pt,
        qr_xobjects,
    );

    for field in &label.fields {
        let fx = lx + mm_to_pt(field.x_mm);
        let fy = ly + mm_to_pt(field.y_mm);
        let fw = mm_to_pt(field.width_mm);
        let fh = mm_to_pt(field.height_mm);

        match &field.content {
            FieldContent::Text {
                text,
                font_size_pt,
                bold,
                color,
                background,
                border,
                align,
                vertical_align,
            } => {
                if let Some(bg) = background {
                    let (r, g, b) = bg.unit();
                    content.save_state();
                    content.set_fill_rgb(r, g, b);
                    content
                        .rect(fx as f32, flip(page_h_pt, fy, fh), fw as f32, fh as f32)
                        .fill_nonzero();
                    content.restore_state();
                }
                if let Some(bc) = border {
                    let (r, g, b) = bc.unit();
                    content.save_state();
                    content.set_stroke_rgb(r, g, b);
                    content.set_line_width(HAIRLINE_PT);
                    content
                        .rect(fx as f32, flip(page_h_pt, fy, fh), fw as f32, fh as f32)
                        .stroke();
                    content.restore_state();
                }

                let size = *font_size_pt;
                let est_width = text.chars().count() as f64 * size * AVG_GLYPH_WIDTH;
                let tx = match align {
                    HorizontalAlign::Left => fx,
                    HorizontalAlign::Center => fx + (fw - est_width).max(0.0) / 2.0,
                    HorizontalAlign::Right => fx + (fw - est_width).max(0.0),
                };
                // Baseline from the box top; ascent is roughly 0.8em.
                let baseline_offset = match vertical_align {
                    VerticalAlign::Top => size * 0.8,
                    VerticalAlign::Middle => fh / 2.0 + size * 0.3,
                    VerticalAlign::Bottom => fh - size * 0.2,
                };
                let ty = page_h_pt - fy - baseline_offset;

                let font = if *bold { FONT_BOLD } else { FONT_REGULAR };
                let (r, g, b) = color.unit();
                content.save_state();
                content.set_fill_rgb(r, g, b);
                content.begin_text();
                content.set_font(Name(font), size as f32);
                content.next_line(tx as f32, ty as f32);
                content.show(Str(&encode_pdf_text(text)));
                content.end_text();
                content.restore_state();
            }
            FieldContent::Rule { color } => {
                // Bottom-edge rule only.
                let (r, g, b) = color.unit();
                let rule_h = mm_to_pt(0.3);
                content.save_state();
                content.set_fill_rgb(r, g, b);
                content
                    .rect(
                        fx as f32,
                        flip(page_h_pt, fy + fh - rule_h, rule_h),
                        fw as f32,
                        rule_h as f32,
                    )
                    .fill_nonzero();
                content.restore_state();
            }
            FieldContent::Qr { data_url } => {
                draw_qr(
                    content,
                    fx,
                    fy,
                    fw,
                    fh,
                    data_url.as_deref(),
                    page_h_pt,
                    qr_xobjects,
                );
            }
        }
    }
}

/// Place a QR image, or a gray placeholder outline when the asset is absent.
#[allow(clippy::too_many_arguments)]
fn draw_qr(
    content: &mut Content,
    x_pt: f64,
    y_pt: f64,
    w_pt: f64,
    h_pt: f64,
    data_url: Option<&str>,
    page_h_pt: f64,
    qr_xobjects: &HashMap<String, (String, Ref)>,
) {
    let placed = data_url.and_then(|url| qr_xobjects.get(url));
    match placed {
        Some((name, _)) => {
            content.save_state();
            // Image space is the unit square; scale it to the target box.
            content.transform([
                w_pt as f32,
                0.0,
                0.0,
                h_pt as f32,
                x_pt as f32,
                flip(page_h_pt, y_pt, h_pt),
            ]);
            content.x_object(Name(name.as_bytes()));
            content.restore_state();
        }
        None => {
            content.save_state();
            content.set_stroke_gray(0.6);
            content.set_line_width(HAIRLINE_PT);
            content
                .rect(
                    x_pt as f32,
                    flip(page_h_pt, y_pt, h_pt),
                    w_pt as f32,
                    h_pt as f32,
                )
                .stroke();
            content.restore_state();
        }
    }
}

/// Top-down y plus height to a PDF bottom-up y.
fn flip(page_h_pt: f64, y_pt: f64, h_pt: f64) -> f32 {
    (page_h_pt - y_pt - h_pt) as f32
}

/// Map text to the WinAnsi-ish byte range the base-14 fonts cover.
/// Characters outside Latin-1 degrade to `?` rather than corrupting the
/// content stream.
fn encode_pdf_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code < 256 { code as u8 } else { b'?' }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::plan::build_plan;
    use crate::template::{GeneratePayload, LabelField, LabelRecord, LabelTemplate, PagePreset};

    fn roll_payload(records: Vec<LabelRecord>) -> GeneratePayload {
        GeneratePayload {
            template: LabelTemplate::new(100.0, 50.0),
            records,
            page_preset: PagePreset::Roll,
            ..Default::default()
        }
    }

    #[test]
    fn test_pdf_header_and_page_count() {
        let payload = roll_payload(vec![
            LabelRecord::from_qr("A"),
            LabelRecord::from_qr("B"),
        ]);
        let plan = build_plan(&payload, &HashMap::new()).unwrap();
        let bytes = render_pdf(&plan);
        assert!(bytes.starts_with(b"%PDF-"));
        // Two page objects in the tree.
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Type /Page").count() - text.matches("/Type /Pages").count(), 2);
    }

    #[test]
    fn test_embeds_each_distinct_qr_once() {
        let payload = roll_payload(vec![
            LabelRecord::from_qr("same"),
            LabelRecord::from_qr("same"),
            LabelRecord::from_qr("other"),
        ]);
        // Tiny valid grayscale PNGs via the image crate.
        let mut assets = HashMap::new();
        for (key, shade) in [("same", 0u8), ("other", 255u8)] {
            let img = image::GrayImage::from_pixel(2, 2, image::Luma([shade]));
            let mut png = Vec::new();
            img.write_to(
                &mut std::io::Cursor::new(&mut png),
                image::ImageFormat::Png,
            )
            .unwrap();
            assets.insert(
                key.to_string(),
                format!("data:image/png;base64,{}", BASE64.encode(&png)),
            );
        }
        let plan = build_plan(&payload, &assets).unwrap();
        let bytes = render_pdf(&plan);
        let text = String::from_utf8_lossy(&bytes);
        // Two XObject image dictionaries, not three.
        assert_eq!(text.matches("/Subtype /Image").count(), 2);
    }

    #[test]
    fn test_missing_qr_does_not_fail() {
        let payload = roll_payload(vec![LabelRecord::from_qr("no-asset")]);
        let plan = build_plan(&payload, &HashMap::new()).unwrap();
        let bytes = render_pdf(&plan);
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_blank_rule_sits_on_field_bottom() {
        let mut payload = roll_payload(vec![LabelRecord::from_qr("A")]);
        payload.template.fields = vec![LabelField {
            field_type: crate::template::FieldType::Blank,
            position_x: 5.0,
            position_y: 10.0,
            width_mm: 30.0,
            height_mm: 8.0,
            ..Default::default()
        }];
        let plan = build_plan(&payload, &HashMap::new()).unwrap();
        let bytes = render_pdf(&plan);
        let text = String::from_utf8_lossy(&bytes);

        // The rule rect's top edge must land on the field's bottom edge:
        // y = page_h - (field_y + field_h) in PDF space, height = 0.3mm.
        let rule_h = mm_to_pt(0.3);
        let expected_y = mm_to_pt(50.0) - mm_to_pt(10.0 + 8.0);
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let found = tokens.windows(5).any(|w| {
            w[4] == "re"
                && w[..4].iter().all(|t| t.parse::<f64>().is_ok())
                && (w[3].parse::<f64>().unwrap() - rule_h).abs() < 0.01
                && (w[1].parse::<f64>().unwrap() - expected_y).abs() < 0.01
        });
        assert!(found, "no rule rect at the field bottom edge");
    }

    #[test]
    fn test_bold_field_uses_bold_font() {
        let mut payload = roll_payload(vec![LabelRecord::from_qr("A")]);
        payload.template.fields = vec![LabelField {
            field_value: Some("HEAVY".into()),
            font_weight: crate::template::FontWeight::Bold,
            ..Default::default()
        }];
        let plan = build_plan(&payload, &HashMap::new()).unwrap();
        let bytes = render_pdf(&plan);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Helvetica-Bold"));
    }

    #[test]
    fn test_encode_pdf_text_degrades_non_latin() {
        assert_eq!(encode_pdf_text("Lot A"), b"Lot A");
        assert_eq!(encode_pdf_text("caf\u{e9}"), b"caf\xe9");
        assert_eq!(encode_pdf_text("\u{4e2d}"), b"?");
    }

    #[test]
    fn test_flip_round_trips() {
        // A box at the page top maps to page_h - h in PDF space.
        assert_eq!(flip(100.0, 0.0, 20.0), 80.0);
        // A box at the bottom maps to 0.
        assert_eq!(flip(100.0, 80.0, 20.0), 0.0);
    }
}
