//! Plain text formats.

use super::{ExtractionError, Extractor};

/// txt, py and other plain text: strict UTF-8.
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn header(&self) -> &'static str {
        "📄 File Content:"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}
