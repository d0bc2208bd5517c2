//! Turns model output into the response body the caller asked for.
//!
//! PDF layout is computed as plain data first (`layout_pages`) and only then
//! written out with printpdf, so pagination is testable without parsing PDFs.

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::errors::PipelineError;
use crate::pipeline::font_metrics::HELVETICA;
use crate::pipeline::request::OutputFormat;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const PDF_FILENAME: &str = "improved_resume.pdf";
const PDF_TITLE: &str = "Improved Resume";

/// Rendered response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedResult {
    Text(String),
    Pdf(Vec<u8>),
}

/// Page geometry and type settings, all in PDF points.
#[derive(Debug, Clone, Copy)]
pub struct PageLayout {
    pub width_pt: f32,
    pub height_pt: f32,
    pub margin_pt: f32,
    pub font_size_pt: f32,
    pub leading_pt: f32,
    pub paragraph_spacing_pt: f32,
}

/// US letter, 1" margins, 11pt body on 14pt leading, 12pt between paragraphs.
pub const LETTER: PageLayout = PageLayout {
    width_pt: 612.0,
    height_pt: 792.0,
    margin_pt: 72.0,
    font_size_pt: 11.0,
    leading_pt: 14.0,
    paragraph_spacing_pt: 12.0,
};

impl PageLayout {
    fn text_width_em(&self) -> f32 {
        (self.width_pt - 2.0 * self.margin_pt) / self.font_size_pt
    }
}

/// One line of text at its baseline position on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x_pt: f32,
    pub baseline_pt: f32,
}

pub fn render(text: String, format: OutputFormat) -> Result<RenderedResult, PipelineError> {
    match format {
        OutputFormat::Text => Ok(RenderedResult::Text(text)),
        OutputFormat::Pdf => render_pdf(&text, &LETTER).map(RenderedResult::Pdf),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

/// Splits on blank lines. Each paragraph keeps its single line breaks as
/// separate entries; whitespace-only paragraphs are dropped.
pub fn split_paragraphs(text: &str) -> Vec<Vec<String>> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim_end().to_string());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

/// Flows paragraphs onto pages top to bottom. Always returns at least one page.
pub fn layout_pages(text: &str, layout: &PageLayout) -> Vec<Vec<PlacedLine>> {
    let top = layout.height_pt - layout.margin_pt;
    let max_width_em = layout.text_width_em();

    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut cursor = top;

    for paragraph in split_paragraphs(text) {
        // Spacing only between paragraphs on the same page
        if cursor < top {
            cursor -= layout.paragraph_spacing_pt;
        }

        for hard_line in &paragraph {
            for wrapped in HELVETICA.wrap(hard_line, max_width_em) {
                if cursor - layout.leading_pt < layout.margin_pt {
                    pages.push(Vec::new());
                    cursor = top;
                }
                let baseline_pt = cursor - layout.font_size_pt;
                cursor -= layout.leading_pt;

                if let Some(page) = pages.last_mut() {
                    page.push(PlacedLine {
                        text: wrapped,
                        x_pt: layout.margin_pt,
                        baseline_pt,
                    });
                }
            }
        }
    }

    pages
}

// ────────────────────────────────────────────────────────────────────────────
// PDF output
// ────────────────────────────────────────────────────────────────────────────

fn pt(value: f32) -> Mm {
    Mm(value * 25.4 / 72.0)
}

fn render_error(cause: impl std::fmt::Display) -> PipelineError {
    PipelineError::Render(format!("Error rendering PDF: {cause}"))
}

/// Windows-1252 code points in 0x80..=0x9F. With Latin-1 these make up
/// everything the base-14 fonts can encode.
const WIN_ANSI_EXTRAS: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

fn win_ansi_encodable(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7E | 0xA0..=0xFF) || WIN_ANSI_EXTRAS.contains(c)
}

/// printpdf drops characters Helvetica cannot encode without reporting it.
fn ensure_encodable(pages: &[Vec<PlacedLine>]) -> Result<(), PipelineError> {
    let mut unsupported: Vec<char> = Vec::new();
    for c in pages.iter().flatten().flat_map(|line| line.text.chars()) {
        if !win_ansi_encodable(c) && !unsupported.contains(&c) {
            unsupported.push(c);
        }
    }

    if unsupported.is_empty() {
        return Ok(());
    }
    let shown: String = unsupported.iter().take(10).collect();
    Err(render_error(format!(
        "text contains characters the PDF font cannot encode: {shown}"
    )))
}

/// Writes the laid-out pages with the base-14 Helvetica font.
pub fn render_pdf(text: &str, layout: &PageLayout) -> Result<Vec<u8>, PipelineError> {
    let pages = layout_pages(text, layout);
    ensure_encodable(&pages)?;
    let (width, height) = (pt(layout.width_pt), pt(layout.height_pt));

    let (doc, first_page, first_layer) = PdfDocument::new(PDF_TITLE, width, height, "Body");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(render_error)?;

    for (index, lines) in pages.iter().enumerate() {
        let (page, layer) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, "Body")
        };
        let layer = doc.get_page(page).get_layer(layer);

        for line in lines {
            layer.use_text(
                line.text.as_str(),
                layout.font_size_pt,
                pt(line.x_pt),
                pt(line.baseline_pt),
                &font,
            );
        }
    }

    doc.save_to_bytes().map_err(render_error)
}
