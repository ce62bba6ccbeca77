//! Document text extraction: pick an extractor by declared extension, pull plain text out of
//! the bytes, cap it, and wrap it in a format-labelled reply.

mod docx;
mod pdf;
mod text;

use crate::config::{DocumentsConfig, TruncationNotice};
use crate::event::MediaRef;
use crate::media::MediaSource;
use std::collections::HashMap;
use std::sync::Arc;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;

pub const UNSUPPORTED_FILE_REPLY: &str =
    "🚫 Unsupported file type. Please send a valid text or document file.";
pub const FILE_ERROR_REPLY: &str =
    "🚨 Error reading the file. Please ensure it's a valid document.";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("invalid pdf: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("invalid docx archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("invalid docx: {0}")]
    Docx(String),
    #[error("reading document: {0}")]
    Io(#[from] std::io::Error),
    #[error("text is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// No extractor is registered for the declared format.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unsupported file type: {0:?}")]
pub struct UnsupportedFormatError(pub String);

/// Converts raw bytes of one document format into plain text.
pub trait Extractor: Send + Sync {
    /// Reply header, e.g. "📄 PDF Content:".
    fn header(&self) -> &'static str;
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Extracted text after capping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// At most `max_chars` characters of the source text.
    pub raw_text: String,
    /// True when the source text was longer than the cap.
    pub truncated: bool,
}

impl ExtractedDocument {
    /// Keep the first `max_chars` characters (Unicode scalar values, not bytes).
    pub fn from_text(text: &str, max_chars: usize) -> Self {
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => Self {
                raw_text: text[..cut].to_string(),
                truncated: true,
            },
            None => Self {
                raw_text: text.to_string(),
                truncated: false,
            },
        }
    }
}

/// Header, body and (depending on `notice`) the truncation notice.
pub fn render(
    header: &str,
    doc: &ExtractedDocument,
    max_chars: usize,
    notice: TruncationNotice,
) -> String {
    let annotate = match notice {
        TruncationNotice::Always => true,
        TruncationNotice::WhenTruncated => doc.truncated,
    };
    if annotate {
        format!(
            "{}\n{}...\n\n(Truncated to {} characters)",
            header, doc.raw_text, max_chars
        )
    } else {
        format!("{}\n{}", header, doc.raw_text)
    }
}

/// Lower-cased extension -> extractor.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    by_format: HashMap<String, Arc<dyn Extractor>>,
}

fn normalize_format(format: &str) -> String {
    format.trim().trim_start_matches('.').to_ascii_lowercase()
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// pdf, docx, txt and py.
    pub fn with_defaults() -> Self {
        let mut r = Self::new();
        r.register("pdf", Arc::new(PdfExtractor));
        r.register("docx", Arc::new(DocxExtractor));
        let plain: Arc<dyn Extractor> = Arc::new(PlainTextExtractor);
        r.register("txt", plain.clone());
        r.register("py", plain);
        r
    }

    pub fn register(&mut self, format: &str, extractor: Arc<dyn Extractor>) {
        self.by_format.insert(normalize_format(format), extractor);
    }

    pub fn get(&self, format: &str) -> Result<Arc<dyn Extractor>, UnsupportedFormatError> {
        self.by_format
            .get(&normalize_format(format))
            .cloned()
            .ok_or_else(|| UnsupportedFormatError(format.to_string()))
    }

    pub fn formats(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.by_format.keys().map(String::as_str).collect();
        v.sort_unstable();
        v
    }
}

/// The file branch: format lookup, media download, extraction and rendering, with the fixed
/// fallbacks on every failure.
pub struct DocumentReader {
    media: Arc<dyn MediaSource>,
    extractors: ExtractorRegistry,
    max_chars: usize,
    notice: TruncationNotice,
}

impl DocumentReader {
    pub fn new(
        media: Arc<dyn MediaSource>,
        extractors: ExtractorRegistry,
        documents: &DocumentsConfig,
    ) -> Self {
        Self {
            media,
            extractors,
            max_chars: documents.max_chars,
            notice: documents.truncation_notice,
        }
    }

    /// Reply for an attached file. The format is checked before anything is downloaded.
    pub async fn read(&self, media: &MediaRef, declared_format: &str) -> String {
        let extractor = match self.extractors.get(declared_format) {
            Ok(e) => e,
            Err(e) => {
                log::info!("{}", e);
                return UNSUPPORTED_FILE_REPLY.to_string();
            }
        };
        let bytes = match self.media.load(media).await {
            Ok(b) => b,
            Err(e) => {
                log::error!("error loading file attachment: {}", e);
                return FILE_ERROR_REPLY.to_string();
            }
        };
        self.extract_and_render(extractor, bytes).await
    }

    /// Reply for bytes already in hand (e.g. a local file).
    pub async fn read_bytes(&self, bytes: Vec<u8>, declared_format: &str) -> String {
        match self.extractors.get(declared_format) {
            Ok(extractor) => self.extract_and_render(extractor, bytes).await,
            Err(e) => {
                log::info!("{}", e);
                UNSUPPORTED_FILE_REPLY.to_string()
            }
        }
    }

    async fn extract_and_render(&self, extractor: Arc<dyn Extractor>, bytes: Vec<u8>) -> String {
        let header = extractor.header();
        let parsed = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))
            .and_then(|r| r);
        match parsed {
            Ok(text) => {
                let doc = ExtractedDocument::from_text(&text, self.max_chars);
                if doc.truncated {
                    log::debug!("document text truncated to {} characters", self.max_chars);
                }
                render(header, &doc, self.max_chars, self.notice)
            }
            Err(e) => {
                log::error!("error processing file attachment: {}", e);
                FILE_ERROR_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaFetcher;

    struct FixedText(String);

    impl Extractor for FixedText {
        fn header(&self) -> &'static str {
            "📄 PDF Content:"
        }

        fn extract(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    fn reader(registry: ExtractorRegistry, notice: TruncationNotice) -> DocumentReader {
        DocumentReader::new(
            Arc::new(MediaFetcher::new(reqwest::Client::new())),
            registry,
            &DocumentsConfig {
                max_chars: 1000,
                truncation_notice: notice,
            },
        )
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let doc = ExtractedDocument::from_text("ééééé", 3);
        assert_eq!(doc.raw_text, "ééé");
        assert!(doc.truncated);

        let exact = ExtractedDocument::from_text("abc", 3);
        assert_eq!(exact.raw_text, "abc");
        assert!(!exact.truncated);
    }

    #[test]
    fn short_document_still_gets_notice_by_default() {
        let doc = ExtractedDocument::from_text("hello", 1000);
        assert_eq!(
            render("📄 File Content:", &doc, 1000, TruncationNotice::Always),
            "📄 File Content:\nhello...\n\n(Truncated to 1000 characters)"
        );
    }

    #[test]
    fn corrected_mode_omits_notice_when_nothing_was_cut() {
        let doc = ExtractedDocument::from_text("hello", 1000);
        assert_eq!(
            render("📄 File Content:", &doc, 1000, TruncationNotice::WhenTruncated),
            "📄 File Content:\nhello"
        );
        let long = ExtractedDocument::from_text(&"x".repeat(12), 10);
        assert_eq!(
            render("📄 File Content:", &long, 10, TruncationNotice::WhenTruncated),
            format!("📄 File Content:\n{}...\n\n(Truncated to 10 characters)", "x".repeat(10))
        );
    }

    #[test]
    fn registry_defaults_and_normalization() {
        let r = ExtractorRegistry::with_defaults();
        assert_eq!(r.formats(), vec!["docx", "pdf", "py", "txt"]);
        assert_eq!(r.get(".PDF").unwrap().header(), "📄 PDF Content:");
        assert_eq!(r.get("py").unwrap().header(), "📄 File Content:");
        assert_eq!(
            r.get("exe").err(),
            Some(UnsupportedFormatError("exe".to_string()))
        );
    }

    #[tokio::test]
    async fn long_pdf_is_cut_to_first_thousand_characters() {
        let text: String = ('a'..='z').cycle().take(1500).collect();
        let mut registry = ExtractorRegistry::new();
        registry.register("pdf", Arc::new(FixedText(text.clone())));

        let reply = reader(registry, TruncationNotice::Always)
            .read(&MediaRef::Inline(b"%PDF".to_vec()), "pdf")
            .await;

        let expected = format!(
            "📄 PDF Content:\n{}...\n\n(Truncated to 1000 characters)",
            &text[..1000]
        );
        assert_eq!(reply, expected);
    }

    #[tokio::test]
    async fn unsupported_format_does_not_touch_media() {
        // An unreachable URL would fail the download if it were attempted.
        let media = MediaRef::Url("http://127.0.0.1:9/never".to_string());
        let reply = reader(ExtractorRegistry::with_defaults(), TruncationNotice::Always)
            .read(&media, "exe")
            .await;
        assert_eq!(reply, UNSUPPORTED_FILE_REPLY);
    }

    #[tokio::test]
    async fn undecodable_text_is_file_error() {
        let reply = reader(ExtractorRegistry::with_defaults(), TruncationNotice::Always)
            .read_bytes(vec![0xff, 0xfe, 0x00], "txt")
            .await;
        assert_eq!(reply, FILE_ERROR_REPLY);
    }

    #[tokio::test]
    async fn corrupt_pdf_is_file_error() {
        let reply = reader(ExtractorRegistry::with_defaults(), TruncationNotice::Always)
            .read_bytes(b"definitely not a pdf".to_vec(), "pdf")
            .await;
        assert_eq!(reply, FILE_ERROR_REPLY);
    }

    #[tokio::test]
    async fn failed_download_is_file_error() {
        let media = MediaRef::Url("http://127.0.0.1:9/never".to_string());
        let reply = reader(ExtractorRegistry::with_defaults(), TruncationNotice::Always)
            .read(&media, "txt")
            .await;
        assert_eq!(reply, FILE_ERROR_REPLY);
    }
}
