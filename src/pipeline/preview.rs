//! Page previews: rasterise each page and encode it as PNG.
//!
//! Previews let the user see which pages they are about to include before
//! paying for a completion call. Pages render at scale 1.0 (one pixel per
//! PDF point, so an A4 page is 595 × 842 px) with the longest edge capped at
//! `max_pixels`, keeping a 200-page textbook's previews in the tens of MB.
//!
//! PNG is used because it is lossless: small print stays legible in the
//! contact sheet. [`contact_sheet_html`] embeds the previews as base64 data
//! URIs so the sheet is a single self-contained file.

use crate::document::{PagePreview, PageRecord};
use crate::error::WorksheetError;
use crate::pipeline::extract::{bind_pdfium, load_document};
use crate::pipeline::input::PdfUpload;
use crate::render::html::escape_html;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use tracing::{debug, info};

/// Render a preview of every page, in page order.
///
/// This runs inside `spawn_blocking` since pdfium operations are CPU-bound.
pub async fn render_previews(
    upload: &PdfUpload,
    password: Option<&str>,
    max_pixels: u32,
) -> Result<Vec<PagePreview>, WorksheetError> {
    let bytes = upload.bytes.clone();
    let name = upload.name.clone();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        render_previews_blocking(&bytes, &name, password.as_deref(), max_pixels)
    })
    .await
    .map_err(|e| WorksheetError::Internal(format!("Preview task panicked: {}", e)))?
}

/// pdfium takes the bitmap bound as `i32`; larger caps saturate.
fn pixel_cap(max_pixels: u32) -> i32 {
    i32::try_from(max_pixels).unwrap_or(i32::MAX)
}

/// Blocking implementation of preview rendering.
fn render_previews_blocking(
    bytes: &[u8],
    name: &str,
    password: Option<&str>,
    max_pixels: u32,
) -> Result<Vec<PagePreview>, WorksheetError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, bytes, name, password)?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(1.0)
        .set_maximum_width(pixel_cap(max_pixels))
        .set_maximum_height(pixel_cap(max_pixels));

    let mut previews = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let page_num = idx + 1;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| WorksheetError::PreviewFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        let png = encode_png(&image).map_err(|e| WorksheetError::PreviewFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {}", e),
        })?;
        debug!(
            "Rendered preview {} → {}x{} px, {} bytes",
            page_num,
            image.width(),
            image.height(),
            png.len()
        );

        previews.push(PagePreview {
            page_num,
            width: image.width(),
            height: image.height(),
            png,
        });
    }

    info!("Rendered {} page previews", previews.len());
    Ok(previews)
}

/// Encode an image as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// `data:image/png;base64,...` URI for an encoded preview.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Self-contained HTML page showing every preview with its inclusion state.
pub fn contact_sheet_html(title: &str, previews: &[PagePreview], pages: &[PageRecord]) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n\
<style>\n\
body {{ font-family: sans-serif; background: #f3f4f6; margin: 20px; }}\n\
.grid {{ display: flex; flex-wrap: wrap; gap: 16px; }}\n\
.page {{ background: white; padding: 8px; border: 3px solid #6366f1; border-radius: 8px; }}\n\
.page.excluded {{ border-color: #d1d5db; opacity: 0.45; }}\n\
.badge {{ font-weight: bold; margin-bottom: 4px; }}\n\
img {{ max-width: 240px; display: block; }}\n\
</style>\n</head>\n<body>\n<h1>{}</h1>\n<div class=\"grid\">\n",
        escape_html(title),
        escape_html(title)
    );

    for preview in previews {
        let included = pages
            .iter()
            .find(|p| p.page_num == preview.page_num)
            .map(|p| p.included)
            .unwrap_or(true);
        let (class, mark) = if included {
            ("page", "✅")
        } else {
            ("page excluded", "⛔")
        };
        html.push_str(&format!(
            "<div class=\"{class}\"><div class=\"badge\">{mark} {}p</div>\
<img src=\"{}\" width=\"{}\" height=\"{}\" alt=\"page {}\"></div>\n",
            preview.page_num,
            png_data_uri(&preview.png),
            preview.width,
            preview.height,
            preview.page_num,
        ));
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}
