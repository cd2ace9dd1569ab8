
use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Normalized plain text of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub page_number: i64,
    pub text: String,
}

/// Extract per-page plain text from PDF bytes.
///
/// Pages whose extracted text is empty after normalization are dropped with a
/// log line; the remaining pages keep their original 1-based numbers.
#[inline]
pub fn extract_pdf_pages(content: &[u8]) -> Result<Vec<PageText>> {
    let raw_pages = pdf_extract::extract_text_from_mem_by_pages(content)
        .context("Failed to extract text from PDF")?;

    debug!("Extracted {} pages from PDF", raw_pages.len());

    let pages = raw_pages
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let page_number = index as i64 + 1;
            let text = normalize_page_text(&raw);
            if text.is_empty() {
                warn!("Page {} contains no extractable text, skipping", page_number);
                None
            } else {
                Some(PageText { page_number, text })
            }
        })
        .collect();

    Ok(pages)
}

/// Replace newlines with spaces and collapse whitespace runs to a single
/// space, the form the chunker and the embedding service expect.
#[inline]
pub fn normalize_page_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
