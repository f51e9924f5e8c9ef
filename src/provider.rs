use std::path::Path;

use tracing::{debug, info};

use crate::error::ExtractError;
use crate::model::PageText;

const PAGE_BREAK: char = '\u{000C}';

/// Turns a stored document into ordered per-page text.
pub trait PageTextProvider {
    /// `on_progress(current, total)` fires every `progress_every` pages and
    /// for the last page, at most once per page.
    fn extract(
        &self,
        source: &Path,
        progress_every: usize,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<PageText>, ExtractError>;
}

/// Reads a text dump whose pages are separated by form feeds, the layout
/// `pdftotext` writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextProvider;

impl PageTextProvider for PlainTextProvider {
    fn extract(
        &self,
        source: &Path,
        progress_every: usize,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<PageText>, ExtractError> {
        let bytes = std::fs::read(source).map_err(|e| ExtractError::SourceUnavailable {
            path: source.to_path_buf(),
            source: e,
        })?;
        let text = String::from_utf8(bytes).map_err(|e| {
            ExtractError::TextExtraction(format!("{:?} is not valid UTF-8: {}", source, e))
        })?;

        let chunks = split_pages(&text);
        if chunks.is_empty() {
            return Err(ExtractError::TextExtraction(format!(
                "{:?} contains no pages",
                source
            )));
        }

        let total = chunks.len();
        let every = progress_every.max(1);
        let mut pages = Vec::with_capacity(total);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let page_number = i as u32 + 1;
            pages.push(PageText::new(page_number, normalize_whitespace(chunk)));
            if page_number as usize % every == 0 {
                on_progress(page_number as usize, total);
            }
        }
        if total % every != 0 {
            on_progress(total, total);
        }

        let scanned = pages.iter().filter(|p| !p.has_text()).count();
        info!(pages = total, scanned, "Extracted page text from {:?}", source);
        Ok(pages)
    }
}

/// Split on form feeds. A trailing empty chunk after the last break is not a page.
fn split_pages(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut chunks: Vec<&str> = text.split(PAGE_BREAK).collect();
    if chunks.len() > 1 && chunks.last().is_some_and(|c| c.trim().is_empty()) {
        chunks.pop();
    }
    debug!(chunks = chunks.len(), "split text dump");
    chunks
}

/// Text runs on a drawing come out one per line; join them with single spaces.
fn normalize_whitespace(chunk: &str) -> String {
    chunk.split_whitespace().collect::<Vec<_>>().join(" ")
}
