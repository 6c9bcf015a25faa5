//! Extractor registry keyed by file extension.

use medrag_core::{ExtractError, PageExtractor, PageText};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::{PdfExtractor, TextExtractor};

/// Registry of page extractors.
pub struct ExtractorRegistry {
    /// Extension to extractor mapping
    by_extension: HashMap<String, Arc<dyn PageExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Registry with the PDF and text extractors.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PdfExtractor::new());
        registry.register(TextExtractor::new());
        registry
    }

    /// Register an extractor for all of its extensions.
    pub fn register<E: PageExtractor + 'static>(&mut self, extractor: E) {
        let extractor: Arc<dyn PageExtractor> = Arc::new(extractor);
        for ext in extractor.supported_extensions() {
            self.by_extension
                .insert((*ext).to_string(), Arc::clone(&extractor));
        }
    }

    /// Get the extractor for a file.
    #[must_use]
    pub fn get_for_file(&self, path: &Path) -> Option<Arc<dyn PageExtractor>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext).cloned()
    }

    /// Extract the pages of a file.
    pub async fn extract(&self, path: &Path) -> Result<Vec<PageText>, ExtractError> {
        let extractor = self.get_for_file(path).ok_or_else(|| {
            ExtractError::UnsupportedType(
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("<none>")
                    .to_string(),
            )
        })?;

        extractor.extract_pages(path).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
