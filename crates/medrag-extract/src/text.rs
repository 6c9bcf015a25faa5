//! Plain text page extractor.

use async_trait::async_trait;
use medrag_core::{ExtractError, PageExtractor, PageText};
use std::path::Path;
use tokio::fs;

use crate::pdf::split_form_feeds;

/// Extractor for UTF-8 text dumps; form feeds separate pages.
pub struct TextExtractor;

impl TextExtractor {
    /// Create a new text extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageExtractor for TextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "text", "md"]
    }

    async fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractError> {
        let bytes = fs::read(path).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ExtractError::Parse(format!("invalid UTF-8: {e}")))?;
        Ok(split_form_feeds(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_text(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_extract_pages() {
        let file = temp_text("1 Rối loạn A\nthân bài\x0c1.1 Tiêu chí con\nA. Mục");
        let pages = TextExtractor::new().extract_pages(file.path()).await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].page, 2);
        let lines: Vec<_> = pages[1].lines().collect();
        assert_eq!(lines, vec![(2, "1.1 Tiêu chí con"), (2, "A. Mục")]);
    }

    #[tokio::test]
    async fn test_extract_empty_file() {
        let file = temp_text("");
        let pages = TextExtractor::new().extract_pages(file.path()).await.unwrap();
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00]).unwrap();

        let result = TextExtractor::new().extract_pages(file.path()).await;
        assert!(matches!(result, Err(ExtractError::Parse(_))));
    }

    #[test]
    fn test_can_extract_by_extension() {
        let extractor = TextExtractor::new();
        assert!(extractor.can_extract(Path::new("dsm5.txt")));
        assert!(extractor.can_extract(Path::new("notes.MD")));
        assert!(!extractor.can_extract(Path::new("dsm5.pdf")));
        assert!(!extractor.can_extract(Path::new("README")));
    }
}
