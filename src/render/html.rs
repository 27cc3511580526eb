//! HTML backend: one self-contained print-ready document.
//!
//! Pages are fixed-size `div`s with `page-break-after`, labels and fields
//! are absolutely positioned in CSS millimeters, and QR images are inlined
//! as data URLs, so the document prints correctly with no external
//! resources. Intended for the browser print dialog, not for screen layout.

use std::fmt::Write;

use super::escape_html;
use super::plan::{DocumentPlan, FieldContent, LabelPlan, PagePlan};
use crate::template::{HorizontalAlign, VerticalAlign};

/// Render the plan to a complete HTML document.
pub fn render_html(plan: &DocumentPlan) -> String {
    let mut out = String::new();
    let (page_w, page_h) = plan
        .pages
        .first()
        .map(|p| (p.width_mm, p.height_mm))
        .unwrap_or((0.0, 0.0));

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Labels</title>\n<style>\n");
    write_styles(&mut out, plan, page_w, page_h);
    out.push_str("</style>\n</head>\n<body>\n");

    for page in &plan.pages {
        write_page(&mut out, page, plan);
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn write_styles(out: &mut String, plan: &DocumentPlan, page_w: f64, page_h: f64) {
    let family = escape_html(&plan.font_family);

    if plan.embed_fonts {
        // Font files are served by the host application alongside the page.
        let _ = write!(
            out,
            "@font-face {{ font-family: \"{family}\"; src: url(\"/fonts/{family}-Regular.ttf\"); font-weight: normal; }}\n\
             @font-face {{ font-family: \"{family}\"; src: url(\"/fonts/{family}-Bold.ttf\"); font-weight: bold; }}\n"
        );
    }

    let _ = write!(
        out,
        "@page {{ size: {page_w}mm {page_h}mm; margin: 0; }}\n\
         * {{ margin: 0; padding: 0; box-sizing: border-box; }}\n\
         body {{ font-family: \"{family}\", Helvetica, Arial, sans-serif; }}\n\
         .page {{ position: relative; width: {page_w}mm; height: {page_h}mm; \
         page-break-after: always; overflow: hidden; }}\n\
         .page:last-child {{ page-break-after: auto; }}\n\
         .label {{ position: absolute; overflow: hidden; }}\n\
         .field {{ position: absolute; display: flex; overflow: hidden; \
         line-height: 1.2; }}\n\
         .qr {{ position: absolute; }}\n\
         .qr img {{ width: 100%; height: 100%; image-rendering: pixelated; }}\n\
         .qr-missing {{ border: 0.3mm dashed #999999; color: #999999; \
         display: flex; align-items: center; justify-content: center; \
         font-size: 6pt; }}\n\
         .grid-cell {{ position: absolute; border: 0.2mm dashed #ff00ff; \
         pointer-events: none; }}\n"
    );
}

fn write_page(out: &mut String, page: &PagePlan, plan: &DocumentPlan) {
    out.push_str("<div class=\"page\">\n");
    for label in &page.labels {
        write_label(out, label);
    }
    if let Some(cells) = &plan.debug_grid {
        for cell in cells {
            let _ = write!(
                out,
                "<div class=\"grid-cell\" style=\"left:{:.3}mm;top:{:.3}mm;width:{:.3}mm;height:{:.3}mm\"></div>\n",
                cell.x_mm, cell.y_mm, cell.width_mm, cell.height_mm
            );
        }
    }
    out.push_str("</div>\n");
}

fn write_label(out: &mut String, label: &LabelPlan) {
    let mut style = format!(
        "left:{:.3}mm;top:{:.3}mm;width:{:.3}mm;height:{:.3}mm",
        label.x_mm, label.y_mm, label.width_mm, label.height_mm
    );
    if let Some(bg) = label.background {
        let _ = write!(style, ";background:{}", bg.css());
    }
    if let Some(border) = label.border {
        let _ = write!(
            style,
            ";border:{:.3}mm solid {}",
            border.width_mm,
            border.color.css()
        );
    }
    let _ = write!(out, "<div class=\"label\" style=\"{style}\">\n");

    write_qr(
        out,
        label.qr.x_mm,
        label.qr.y_mm,
        label.qr.size_mm,
        label.qr.size_mm,
        label.qr.data_url.as_deref(),
    );

    for field in &label.fields {
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
                let justify = match align {
                    HorizontalAlign::Left => "flex-start",
                    HorizontalAlign::Center => "center",
                    HorizontalAlign::Right => "flex-end",
                };
                let items = match vertical_align {
                    VerticalAlign::Top => "flex-start",
                    VerticalAlign::Middle => "center",
                    VerticalAlign::Bottom => "flex-end",
                };
                let mut style = format!(
                    "left:{:.3}mm;top:{:.3}mm;width:{:.3}mm;height:{:.3}mm;\
                     font-size:{font_size_pt}pt;color:{};justify-content:{justify};align-items:{items}",
                    field.x_mm,
                    field.y_mm,
                    field.width_mm,
                    field.height_mm,
                    color.css()
                );
                if *bold {
                    style.push_str(";font-weight:bold");
                }
                if let Some(bg) = background {
                    let _ = write!(style, ";background:{}", bg.css());
                }
                if let Some(border) = border {
                    let _ = write!(style, ";border:0.2mm solid {}", border.css());
                }
                let _ = write!(
                    out,
                    "<div class=\"field\" style=\"{style}\">{}</div>\n",
                    escape_html(text)
                );
            }
            FieldContent::Rule { color } => {
                let _ = write!(
                    out,
                    "<div class=\"field\" style=\"left:{:.3}mm;top:{:.3}mm;width:{:.3}mm;height:{:.3}mm;\
                     border-bottom:0.3mm solid {}\"></div>\n",
                    field.x_mm,
                    field.y_mm,
                    field.width_mm,
                    field.height_mm,
                    color.css()
                );
            }
            FieldContent::Qr { data_url } => {
                write_qr(
                    out,
                    field.x_mm,
                    field.y_mm,
                    field.width_mm,
                    field.height_mm,
                    data_url.as_deref(),
                );
            }
        }
    }

    out.push_str("</div>\n");
}

fn write_qr(out: &mut String, x: f64, y: f64, w: f64, h: f64, data_url: Option<&str>) {
    let style = format!("left:{x:.3}mm;top:{y:.3}mm;width:{w:.3}mm;height:{h:.3}mm");
    match data_url {
        Some(url) => {
            let _ = write!(
                out,
                "<div class=\"qr\" style=\"{style}\"><img src=\"{}\" alt=\"\"></div>\n",
                escape_html(url)
            );
        }
        // Asset failed to render; keep the placement visible so misprints
        // are caught before the labels hit the applicator.
        None => {
            let _ = write!(
                out,
                "<div class=\"qr qr-missing\" style=\"{style}\">QR</div>\n"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::plan::build_plan;
    use crate::template::{GeneratePayload, LabelField, LabelRecord, LabelTemplate, PagePreset};
    use std::collections::HashMap;

    fn roll_payload(records: Vec<LabelRecord>) -> GeneratePayload {
        GeneratePayload {
            template: LabelTemplate::new(100.0, 50.0),
            records,
            page_preset: PagePreset::Roll,
            ..Default::default()
        }
    }

    fn render(payload: &GeneratePayload, assets: HashMap<String, String>) -> String {
        render_html(&build_plan(payload, &assets).unwrap())
    }

    #[test]
    fn test_page_per_record_on_roll() {
        let payload = roll_payload(vec![
            LabelRecord::from_qr("A"),
            LabelRecord::from_qr("B"),
            LabelRecord::from_qr("C"),
        ]);
        let html = render(&payload, HashMap::new());
        assert_eq!(html.matches("class=\"page\"").count(), 3);
        assert!(html.contains("size: 100mm 50mm"));
        assert!(html.contains("width:100.000mm;height:50.000mm"));
    }

    #[test]
    fn test_qr_image_inlined() {
        let payload = roll_payload(vec![LabelRecord::from_qr("A")]);
        let mut assets = HashMap::new();
        assets.insert("A".to_string(), "data:image/png;base64,Zm9v".to_string());
        let html = render(&payload, assets);
        assert!(html.contains("src=\"data:image/png;base64,Zm9v\""));
        assert!(!html.contains("qr-missing"));
    }

    #[test]
    fn test_missing_qr_renders_placeholder() {
        let payload = roll_payload(vec![LabelRecord::from_qr("A")]);
        let html = render(&payload, HashMap::new());
        assert!(html.contains("qr-missing"));
    }

    #[test]
    fn test_field_text_escaped() {
        let mut payload = roll_payload(vec![LabelRecord::from_qr("A")]);
        payload.template.fields = vec![LabelField::text("<script>&")];
        let html = render(&payload, HashMap::new());
        assert!(html.contains("&lt;script&gt;&amp;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_embed_fonts_emits_font_face() {
        let mut payload = roll_payload(vec![LabelRecord::from_qr("A")]);
        payload.font_family = Some("Inter".to_string());
        payload.embed_fonts = true;
        let html = render(&payload, HashMap::new());
        assert!(html.contains("/fonts/Inter-Regular.ttf"));
        assert!(html.contains("/fonts/Inter-Bold.ttf"));

        payload.embed_fonts = false;
        let html = render(&payload, HashMap::new());
        assert!(!html.contains("@font-face"));
    }

    #[test]
    fn test_debug_grid_overlay_on_sheet() {
        let payload = GeneratePayload {
            template: LabelTemplate::new(60.0, 40.0),
            records: vec![LabelRecord::from_qr("A")],
            page_preset: PagePreset::Sheet {
                page: crate::template::SheetPage {
                    // (132 - 10 - 2) / 2 = 60mm, (92 - 10 - 2) / 2 = 40mm cells
                    width_mm: 132.0,
                    height_mm: 92.0,
                    margin_mm: 5.0,
                },
                grid: crate::template::SheetGrid {
                    columns: 2,
                    rows: 2,
                    gutter_x_mm: 2.0,
                    gutter_y_mm: 2.0,
                },
            },
            debug_grid: true,
            ..Default::default()
        };
        let html = render(&payload, HashMap::new());
        assert_eq!(html.matches("grid-cell").count(), 5); // 1 CSS rule + 4 cells
    }

    #[test]
    fn test_blank_field_renders_rule() {
        let mut payload = roll_payload(vec![LabelRecord::from_qr("A")]);
        payload.template.fields = vec![LabelField {
            field_type: crate::template::FieldType::Blank,
            width_mm: 30.0,
            height_mm: 8.0,
            ..Default::default()
        }];
        let html = render(&payload, HashMap::new());
        assert!(html.contains("border-bottom:0.3mm solid #000000"));
    }
}
