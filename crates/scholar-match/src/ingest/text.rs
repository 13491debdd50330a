/// Fewer visible characters than this means the document is image-only.
pub const MIN_MEANINGFUL_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
    Csv,
}

impl DocumentFormat {
    /// Detect by content signature first, then by file extension.
    pub fn detect(file_name: &str, bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            return Some(Self::Pdf);
        }
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        match (mime.type_().as_str(), mime.subtype().as_str()) {
            ("application", "pdf") => Some(Self::Pdf),
            ("text", "csv") => Some(Self::Csv),
            ("text", _) | ("application", "json") => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported document type for '{file_name}'")]
    Unsupported { file_name: String },
    #[error("could not read PDF: {0}")]
    Pdf(String),
    #[error("document has only {chars} readable characters; scanned image-only files need OCR first")]
    InsufficientText { chars: usize },
}

/// Pull readable text out of an uploaded document.
pub fn extract_text(format: DocumentFormat, bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = match format {
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|err| ExtractionError::Pdf(err.to_string()))?,
        DocumentFormat::Text | DocumentFormat::Csv => String::from_utf8_lossy(bytes).into_owned(),
    };
    ensure_meaningful(text)
}

fn ensure_meaningful(text: String) -> Result<String, ExtractionError> {
    let chars = text.chars().filter(|ch| !ch.is_whitespace()).count();
    if chars < MIN_MEANINGFUL_CHARS {
        return Err(ExtractionError::InsufficientText { chars });
    }
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_are_detected_by_signature_and_extension() {
        assert_eq!(
            DocumentFormat::detect("upload.bin", b"%PDF-1.7\n..."),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(DocumentFormat::detect("notice.pdf", b""), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::detect("bulk.csv", b"title"), Some(DocumentFormat::Csv));
        assert_eq!(DocumentFormat::detect("notice.txt", b"x"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::detect("photo.png", b"\x89PNG"), None);
    }

    #[test]
    fn short_text_is_rejected() {
        let err = extract_text(DocumentFormat::Text, b"  scan \n\n page 1  ").expect_err("too short");
        assert!(matches!(err, ExtractionError::InsufficientText { chars: 9 }));
    }

    #[test]
    fn text_passes_through_trimmed() {
        let text = extract_text(
            DocumentFormat::Text,
            b"\n National Scholarship Portal notice for 2025 \n",
        )
        .expect("enough text");
        assert!(text.starts_with("National"));
    }
}
