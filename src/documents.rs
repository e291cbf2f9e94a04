//! Resume text extraction from PDF and DOCX files.

use std::path::Path;

/// Supported resume file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Detect the format from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }
}

/// Extracts plain text from a local document.
///
/// Unreadable or corrupt input yields an empty string rather than an error.
/// Implementations may block; callers run them on a blocking thread.
pub trait DocumentParser: Send + Sync {
    fn extract(&self, path: &Path) -> String;
}

/// Parser backed by `pdf-extract` and `docx-rust`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDocumentParser;

impl FileDocumentParser {
    pub fn new() -> Self {
        Self
    }

    fn extract_pdf(path: &Path) -> String {
        // pdf-extract panics on some malformed files.
        let result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pdf_extract::extract_text(path)));
        match result {
            Ok(Ok(text)) => text.trim().to_string(),
            Ok(Err(e)) => {
                tracing::warn!(path = %path.display(), "Failed to read PDF: {}", e);
                String::new()
            }
            Err(_) => {
                tracing::warn!(path = %path.display(), "PDF extraction panicked");
                String::new()
            }
        }
    }

    fn extract_docx(path: &Path) -> String {
        let file = match docx_rust::DocxFile::from_file(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to open DOCX: {:?}", e);
                return String::new();
            }
        };
        match file.parse() {
            Ok(docx) => docx.document.body.text().trim().to_string(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to parse DOCX: {:?}", e);
                String::new()
            }
        }
    }
}

impl DocumentParser for FileDocumentParser {
    fn extract(&self, path: &Path) -> String {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match DocumentFormat::from_file_name(name) {
            Some(DocumentFormat::Pdf) => Self::extract_pdf(path),
            Some(DocumentFormat::Docx) => Self::extract_docx(path),
            None => {
                tracing::warn!(path = %path.display(), "Unsupported document format");
                String::new()
            }
        }
    }
}
