//! # medrag-extract
//!
//! Page text extraction feeding the section parser.
//!
//! | Extractor | Formats | Notes |
//! |-----------|---------|-------|
//! | [`PdfExtractor`] | `.pdf` | Per-page text via lopdf, pdf-extract fallback |
//! | [`TextExtractor`] | `.txt`, `.text`, `.md` | Form feeds separate pages |
//!
//! ```rust,ignore
//! use medrag_extract::ExtractorRegistry;
//!
//! let pages = ExtractorRegistry::with_defaults()
//!     .extract(Path::new("dsm5.pdf"))
//!     .await?;
//! ```

pub mod pdf;
pub mod registry;
pub mod text;

pub use pdf::PdfExtractor;
pub use registry::ExtractorRegistry;
pub use text::TextExtractor;
