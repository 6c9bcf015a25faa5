//! PDF page extractor.
//!
//! Uses lopdf for per-page text, falling back to pdf-extract for documents
//! whose content streams lopdf cannot decode.

use async_trait::async_trait;
use lopdf::Document;
use medrag_core::{ExtractError, PageExtractor, PageText};
use std::path::Path;
use tracing::{debug, warn};

/// Extractor for PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageExtractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    async fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractError> {
        debug!("Extracting PDF: {:?}", path);

        let bytes = tokio::fs::read(path).await?;

        let pages = tokio::task::spawn_blocking(move || extract_pages_from_mem(&bytes))
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))??;

        debug!("Extracted {} pages from {:?}", pages.len(), path);
        Ok(pages)
    }
}

/// Extract page text from PDF bytes.
fn extract_pages_from_mem(bytes: &[u8]) -> Result<Vec<PageText>, ExtractError> {
    match Document::load_mem(bytes) {
        Ok(doc) => {
            let pages = extract_with_lopdf(&doc);
            if pages.iter().any(|page| !page.text.trim().is_empty()) {
                return Ok(pages);
            }
            debug!("lopdf produced no text, falling back to pdf-extract");
        }
        Err(e) => warn!("Failed to load PDF with lopdf: {}", e),
    }

    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractError::Parse(format!("PDF extraction failed: {e}")))?;
    Ok(split_form_feeds(&text))
}

fn extract_with_lopdf(doc: &Document) -> Vec<PageText> {
    doc.get_pages()
        .into_keys()
        .map(|page_num| {
            let text = doc.extract_text(&[page_num]).unwrap_or_else(|e| {
                debug!("Failed to extract text from page {}: {}", page_num, e);
                String::new()
            });
            PageText::new(page_num, text)
        })
        .collect()
}

/// Split text on form feeds into 1-indexed pages.
pub(crate) fn split_form_feeds(text: &str) -> Vec<PageText> {
    text.split('\x0c')
        .enumerate()
        .map(|(i, page)| PageText::new((i + 1) as u32, page))
        .filter(|page| !page.text.trim().is_empty())
        .collect()
}
