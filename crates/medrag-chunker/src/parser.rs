//! Section boundary detection over a page/line stream.

use medrag_core::{ChunkError, PageText, SectionRecord};
use regex::Regex;
use tracing::debug;

use crate::hierarchy::HierarchyTracker;
use crate::patterns::{compile, SECTION_HEADER};

/// Sections recovered from one document plus parse counters.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub sections: Vec<SectionRecord>,
    /// Footer lines discarded
    pub footer_lines: usize,
    /// Body lines seen before the first header
    pub orphan_lines: usize,
}

/// Splits a line stream into numbered sections.
#[derive(Debug, Clone)]
pub struct SectionParser {
    header: Regex,
    footer: Regex,
}

impl SectionParser {
    /// Create a parser discarding lines that match `footer_pattern`.
    pub fn new(footer_pattern: &str) -> Result<Self, ChunkError> {
        Ok(Self {
            header: compile(SECTION_HEADER)?,
            footer: compile(footer_pattern)?,
        })
    }

    /// Split a header line into its dotted number and title.
    pub fn parse_header<'l>(&self, line: &'l str) -> Option<(&'l str, &'l str)> {
        let caps = self.header.captures(line)?;
        let number = caps.get(1)?.as_str();
        let title = caps.get(2)?.as_str().trim();
        Some((number, title))
    }

    pub fn is_footer(&self, line: &str) -> bool {
        self.footer.is_match(line)
    }

    /// Parse every line of `pages` in order.
    pub fn parse_pages(&self, pages: &[PageText]) -> ParsedDocument {
        self.parse(pages.iter().flat_map(PageText::lines))
    }

    /// Parse `(page_number, line)` pairs in document order.
    pub fn parse<I, S>(&self, lines: I) -> ParsedDocument
    where
        I: IntoIterator<Item = (u32, S)>,
        S: AsRef<str>,
    {
        let mut tracker = HierarchyTracker::new();
        let mut parsed = ParsedDocument::default();
        let mut open: Option<SectionRecord> = None;

        for (page, line) in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            if self.is_footer(line) {
                parsed.footer_lines += 1;
                continue;
            }

            match self.parse_header(line) {
                Some((number, title)) => {
                    if let Some(done) = open.take() {
                        parsed.sections.push(done);
                    }
                    let unique_id = format!("section_{}", parsed.sections.len() + 1);
                    let level = number.split('.').count();
                    let parent_unique_id = tracker.open(level, &unique_id);
                    open = Some(SectionRecord {
                        unique_id,
                        section_id: number.to_string(),
                        level,
                        parent_unique_id,
                        title: title.to_string(),
                        raw_lines: Vec::new(),
                        page_start: page,
                    });
                }
                None => match open.as_mut() {
                    Some(section) => section.raw_lines.push(line.to_string()),
                    None => parsed.orphan_lines += 1,
                },
            }
        }

        if let Some(done) = open.take() {
            parsed.sections.push(done);
        }

        debug!(
            sections = parsed.sections.len(),
            footer_lines = parsed.footer_lines,
            orphan_lines = parsed.orphan_lines,
            "parsed document"
        );
        parsed
    }
}
