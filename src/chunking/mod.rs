
use tracing::debug;

use crate::extract::PageText;

/// Upper bound on chunk length, in characters. Page text longer than this is
/// split before embedding; the service's token window overflows somewhere
/// above this size for dense East-Asian text.
pub const MAX_CHUNK_CHARS: usize = 7500;

/// How far back from the length bound to look for a sentence boundary.
const SPLIT_SEARCH_WINDOW: usize = 300;

/// One length-bounded slice of a page's text, the unit of embedding and
/// storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    pub page_number: i64,
    /// Position of this chunk within its page.
    pub chunk_index: usize,
    pub text: String,
}

/// Split one page's normalized text into chunks of at most `max_chars`
/// characters, preferring to cut just after sentence-ending punctuation.
///
/// Text within the bound is returned as a single chunk equal to the input.
/// Otherwise the split point is the nearest sentence boundary searching
/// backward from `max_chars`, limited to a window of 300 characters; without
/// one the cut falls at exactly `max_chars`. The final remainder, however
/// short, becomes the last chunk.
#[inline]
pub fn split_page_text(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return vec![text.to_string()];
    }

    debug!("Splitting page text of {} characters", chars.len());

    let mut chunks = Vec::new();
    let mut rest = chars.as_slice();
    while rest.len() > max_chars {
        let split_index = find_split_index(rest, max_chars);
        chunks.push(rest[..split_index].iter().collect());
        rest = &rest[split_index..];
    }
    chunks.push(rest.iter().collect());
    chunks
}

/// Index to cut at: one past the nearest sentence-ending punctuation in the
/// search window, scanning backward from `max_chars`, or `max_chars` when
/// the window holds none. This also covers a window that bottoms out at the
/// start of the text; a hard split beats a zero-length chunk.
fn find_split_index(chars: &[char], max_chars: usize) -> usize {
    let window_start = max_chars.saturating_sub(SPLIT_SEARCH_WINDOW);
    for index in (window_start..max_chars).rev() {
        if is_sentence_boundary(chars[index]) {
            return index + 1;
        }
    }
    max_chars
}

/// Sentence-ending punctuation, covering ASCII and full-width East-Asian
/// forms.
fn is_sentence_boundary(c: char) -> bool {
    matches!(c, '.' | '。' | ';' | '；' | '!' | '！' | '?' | '？')
}

/// Chunk every extracted page, preserving page order and within-page split
/// order.
#[inline]
pub fn chunk_pages(pages: &[PageText]) -> Vec<PageChunk> {
    let chunks: Vec<PageChunk> = pages
        .iter()
        .flat_map(|page| {
            split_page_text(&page.text, MAX_CHUNK_CHARS)
                .into_iter()
                .enumerate()
                .map(|(chunk_index, text)| PageChunk {
                    page_number: page.page_number,
                    chunk_index,
                    text,
                })
        })
        .collect();

    debug!("Chunked {} pages into {} chunks", pages.len(), chunks.len());
    chunks
}
