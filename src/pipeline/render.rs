//! PDF layout: one branded US-letter page per section, plus a title page.
//!
//! The renderer is deliberately filesystem-free — it returns the finished
//! document as bytes and leaves writing to the orchestrator, which can then
//! make the write atomic. Layout is fixed-template: title page, then the
//! nine sections in deck order, each with a header rule, navy title, an
//! image slot with attribution, the body text (lead sentence highlighted,
//! as in the accent style the deck uses throughout), and a footer with the
//! page number.
//!
//! A section whose photo bytes fail to decode at this stage is rendered
//! without its image; one bad download must not cost the whole document.

use printpdf::image_crate;
use printpdf::image_crate::GenericImageView as _;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Rgb,
};
use tracing::warn;

use crate::error::DeckError;
use crate::output::{PitchDeck, Section, SectionBody, SectionImage};

// US letter, in millimetres.
const PAGE_W: f32 = 215.9;
const PAGE_H: f32 = 279.4;
const MARGIN: f32 = 20.0;
const COLUMN_W: f32 = PAGE_W - 2.0 * MARGIN;
const FOOTER_Y: f32 = 14.0;

// Image slot bounds per section page.
const IMAGE_MAX_W: f32 = 110.0;
const IMAGE_MAX_H: f32 = 70.0;

const PT_TO_MM: f32 = 0.352_778;

struct DeckFonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

// Brand palette: navy titles, medium-blue accents, dark-gray body.
fn navy() -> Color {
    Color::Rgb(Rgb::new(0.12, 0.29, 0.49, None))
}

fn accent() -> Color {
    Color::Rgb(Rgb::new(0.27, 0.45, 0.77, None))
}

fn body_gray() -> Color {
    Color::Rgb(Rgb::new(0.20, 0.20, 0.20, None))
}

fn dim_gray() -> Color {
    Color::Rgb(Rgb::new(0.55, 0.55, 0.55, None))
}

/// Lay out the whole deck and return the PDF bytes.
pub fn render_pdf(deck: &PitchDeck) -> Result<Vec<u8>, DeckError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new("Pitch Deck", Mm(PAGE_W), Mm(PAGE_H), "Layer 1");

    let fonts = DeckFonts {
        regular: add_font(&doc, BuiltinFont::Helvetica)?,
        bold: add_font(&doc, BuiltinFont::HelveticaBold)?,
        italic: add_font(&doc, BuiltinFont::HelveticaOblique)?,
    };

    let total_pages = Section::ALL.len() + 1;

    let title_layer = doc.get_page(first_page).get_layer(first_layer);
    draw_title_page(&title_layer, &fonts, &deck.idea);

    for (i, section) in Section::ALL.iter().enumerate() {
        let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        draw_section_page(
            &layer,
            &fonts,
            *section,
            deck.content.get(*section),
            deck.images.get(section),
            i + 2,
            total_pages,
        );
    }

    let mut buf = std::io::BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(|e| DeckError::RenderFailed {
        detail: e.to_string(),
    })?;
    buf.into_inner()
        .map_err(|e| DeckError::Internal(format!("flushing document buffer: {e}")))
}

fn add_font(
    doc: &printpdf::PdfDocumentReference,
    font: BuiltinFont,
) -> Result<IndirectFontRef, DeckError> {
    doc.add_builtin_font(font).map_err(|e| DeckError::RenderFailed {
        detail: format!("loading builtin font: {e}"),
    })
}

fn draw_title_page(layer: &PdfLayerReference, fonts: &DeckFonts, idea: &str) {
    rule(layer, MARGIN, PAGE_W - MARGIN, PAGE_H - 40.0, accent(), 1.2);

    let title_lines = wrap_text(&sanitize(idea), chars_per_line(26.0));
    let mut y = 185.0;
    layer.set_fill_color(navy());
    for line in &title_lines {
        layer.use_text(line.clone(), 26.0, Mm(centered_x(line, 26.0)), Mm(y), &fonts.bold);
        y -= line_height(26.0);
    }

    y -= 8.0;
    let subtitle = "Startup Pitch Deck";
    layer.set_fill_color(accent());
    layer.use_text(
        subtitle,
        15.0,
        Mm(centered_x(subtitle, 15.0)),
        Mm(y),
        &fonts.italic,
    );

    rule(layer, MARGIN, PAGE_W - MARGIN, 40.0, accent(), 1.2);
    let brand = "Generated by deckforge";
    layer.set_fill_color(dim_gray());
    layer.use_text(
        brand,
        10.0,
        Mm(centered_x(brand, 10.0)),
        Mm(32.0),
        &fonts.regular,
    );
}

fn draw_section_page(
    layer: &PdfLayerReference,
    fonts: &DeckFonts,
    section: Section,
    body: &SectionBody,
    img: Option<&SectionImage>,
    page_num: usize,
    total_pages: usize,
) {
    // Header and footer rules frame every page identically.
    rule(layer, MARGIN, PAGE_W - MARGIN, PAGE_H - 16.0, accent(), 0.8);
    rule(layer, MARGIN, PAGE_W - MARGIN, FOOTER_Y + 4.0, accent(), 0.8);

    layer.set_fill_color(navy());
    layer.use_text(
        section.title(),
        22.0,
        Mm(MARGIN),
        Mm(PAGE_H - 30.0),
        &fonts.bold,
    );

    let mut y = PAGE_H - 40.0;

    if let Some(img) = img {
        match place_image(layer, img, MARGIN, y) {
            Ok(height) => {
                y -= height + 5.0;
                if !img.author.trim().is_empty() {
                    let credit =
                        sanitize(&format!("Photo by {} ({})", img.author, img.source_url));
                    layer.set_fill_color(dim_gray());
                    layer.use_text(credit, 8.0, Mm(MARGIN), Mm(y), &fonts.italic);
                }
                y -= 8.0;
            }
            Err(detail) => {
                // Undecodable bytes lose the slot, not the page.
                warn!("{section}: skipping unusable image: {detail}");
                y -= 4.0;
            }
        }
    } else {
        y -= 4.0;
    }

    draw_body(layer, fonts, body, &mut y);

    layer.set_fill_color(dim_gray());
    layer.use_text(
        "deckforge",
        9.0,
        Mm(MARGIN),
        Mm(FOOTER_Y - 2.0),
        &fonts.italic,
    );
    let page_label = format!("Page {page_num} of {total_pages}");
    let label_x = PAGE_W - MARGIN - text_width_mm(&page_label, 9.0);
    layer.use_text(page_label, 9.0, Mm(label_x), Mm(FOOTER_Y - 2.0), &fonts.regular);
}

fn draw_body(layer: &PdfLayerReference, fonts: &DeckFonts, body: &SectionBody, y: &mut f32) {
    match body {
        SectionBody::Text(text) => {
            let (lead, rest) = split_lead(&sanitize(text));
            draw_lines(
                layer,
                &wrap_text(&lead, chars_per_line(12.0)),
                &fonts.bold,
                12.0,
                accent(),
                MARGIN,
                y,
            );
            if let Some(rest) = rest {
                *y -= 2.0;
                draw_lines(
                    layer,
                    &wrap_text(&rest, chars_per_line(11.0)),
                    &fonts.regular,
                    11.0,
                    body_gray(),
                    MARGIN,
                    y,
                );
            }
        }
        SectionBody::Bullets(items) => {
            for item in items {
                let item = sanitize(item);
                if item.trim().is_empty() {
                    continue;
                }
                let wrapped = wrap_text(&item, chars_per_line(11.0).saturating_sub(3));
                for (i, line) in wrapped.iter().enumerate() {
                    let text = if i == 0 {
                        format!("\u{2022}  {line}")
                    } else {
                        format!("   {line}")
                    };
                    draw_lines(
                        layer,
                        std::slice::from_ref(&text),
                        &fonts.regular,
                        11.0,
                        body_gray(),
                        MARGIN,
                        y,
                    );
                }
                *y -= 1.5;
            }
        }
    }
}

/// Draw wrapped lines top-down from `*y`, stopping at the footer. Body text
/// long enough to hit the footer is clipped rather than overflowing it.
fn draw_lines(
    layer: &PdfLayerReference,
    lines: &[String],
    font: &IndirectFontRef,
    size: f32,
    color: Color,
    x: f32,
    y: &mut f32,
) {
    layer.set_fill_color(color);
    for line in lines {
        if *y < FOOTER_Y + 10.0 {
            return;
        }
        layer.use_text(line.clone(), size, Mm(x), Mm(*y), font);
        *y -= line_height(size);
    }
}

/// Embed a section photo with its top edge at `top`, scaled into the fixed
/// slot. Returns the placed height in mm, or the decode failure.
fn place_image(
    layer: &PdfLayerReference,
    img: &SectionImage,
    x: f32,
    top: f32,
) -> Result<f32, String> {
    let decoded = image_crate::load_from_memory(&img.bytes).map_err(|e| e.to_string())?;
    let rgb = image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());

    let (target_w, target_h) = fit_image_box(rgb.width(), rgb.height());
    // printpdf sizes raster images by DPI; scale from the 300-DPI native size.
    let native_w_mm = rgb.width() as f32 * 25.4 / 300.0;
    let scale = target_w / native_w_mm;

    let pdf_image = Image::from_dynamic_image(&rgb);
    pdf_image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(top - target_h)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(300.0),
            ..Default::default()
        },
    );
    Ok(target_h)
}

/// Scale pixel dimensions to fit the image slot, preserving aspect ratio.
fn fit_image_box(width_px: u32, height_px: u32) -> (f32, f32) {
    let w = width_px.max(1) as f32;
    let h = height_px.max(1) as f32;
    let scale = (IMAGE_MAX_W / w).min(IMAGE_MAX_H / h);
    (w * scale, h * scale)
}

fn rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32, color: Color, thickness: f32) {
    layer.set_outline_color(color);
    layer.set_outline_thickness(thickness);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

/// Greedy word wrap by character count.
///
/// The builtin Helvetica faces have no embedded metrics table here, so the
/// column width is estimated from an average glyph width; good enough for
/// pitch copy, and deterministic.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// First sentence (the highlighted lead) and the remainder, if any.
fn split_lead(text: &str) -> (String, Option<String>) {
    match text.find(". ") {
        Some(pos) => {
            let rest = text[pos + 2..].trim();
            (
                text[..pos + 1].to_string(),
                if rest.is_empty() {
                    None
                } else {
                    Some(rest.to_string())
                },
            )
        }
        None => (text.trim().to_string(), None),
    }
}

/// Map text onto what the builtin (WinAnsi-encoded) faces can show.
fn sanitize(text: &str) -> String {
    text.replace('\u{2026}', "...")
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '\u{2022}',
            c if (c as u32) < 0x100 => c,
            _ => '?',
        })
        .collect()
}

fn chars_per_line(font_pt: f32) -> usize {
    (COLUMN_W / (font_pt * 0.5 * PT_TO_MM)) as usize
}

fn line_height(font_pt: f32) -> f32 {
    font_pt * 1.35 * PT_TO_MM
}

fn text_width_mm(text: &str, font_pt: f32) -> f32 {
    text.chars().count() as f32 * font_pt * 0.5 * PT_TO_MM
}

fn centered_x(text: &str, font_pt: f32) -> f32 {
    ((PAGE_W - text_width_mm(text, font_pt)) / 2.0).max(MARGIN)
}
