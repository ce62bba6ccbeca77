//! PDF: per-page text joined with newlines.

use super::{ExtractionError, Extractor};

pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn header(&self) -> &'static str {
        "📄 PDF Content:"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let doc = lopdf::Document::load_mem(bytes)?;
        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys() {
            // lopdf ends every page with its own newline
            let text = doc.extract_text(&[*page_number])?;
            pages.push(text.trim_end_matches('\n').to_string());
        }
        Ok(pages.join("\n"))
    }
}
