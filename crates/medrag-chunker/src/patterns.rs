//! Line and text patterns for the DSM-5 manual layout.

use medrag_core::ChunkError;
use regex::Regex;

/// Numbered section header: dotted number, whitespace, capitalised title.
///
/// "1. Some criterion" does not match because the dot is followed by a space.
pub const SECTION_HEADER: &str = r"^(\d{1,3}(?:\.\d{1,3})*)\s+(\p{Lu}.*)$";

/// Line opening an enumerated item ("A. ..." or "3. ...").
pub const ENUMERATED_LINE: &str = r"^(?:[A-Z]|\d+)\.\s";

/// Criterion marker at the start of a paragraph.
pub const CRITERION_MARKER: &str = r"\n[A-Z]\.\s";

/// Numbered sub-item marker at the start of a paragraph.
pub const ITEM_MARKER: &str = r"\n\d+\.\s";

/// Criterion letter leading a split part.
pub const CRITERION_LABEL: &str = r"^([A-Z])\.\s";

/// Item number leading a split part.
pub const ITEM_LABEL: &str = r"^(\d+)\.\s";

/// Sentence-final punctuation followed by whitespace.
pub const SENTENCE_END: &str = r"[.!?]\s+";

/// Characters removed by cleaning: everything but word characters, whitespace,
/// the Vietnamese range and basic punctuation.
pub const DISALLOWED_CHARS: &str = r"[^\w\s\x{00C0}-\x{1EF9}.,;:!?()/\[\]>+%-]";

/// Whitespace runs.
pub const WHITESPACE_RUN: &str = r"\s+";

/// Compile a pattern, reporting failures as configuration errors.
pub fn compile(pattern: &str) -> Result<Regex, ChunkError> {
    Regex::new(pattern)
        .map_err(|e| ChunkError::InvalidConfig(format!("invalid pattern {pattern:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        for pattern in [
            SECTION_HEADER,
            ENUMERATED_LINE,
            CRITERION_MARKER,
            ITEM_MARKER,
            CRITERION_LABEL,
            ITEM_LABEL,
            SENTENCE_END,
            DISALLOWED_CHARS,
            WHITESPACE_RUN,
        ] {
            assert!(compile(pattern).is_ok(), "pattern failed: {pattern}");
        }
    }

    #[test]
    fn test_compile_invalid_pattern() {
        let err = compile("([unclosed").unwrap_err();
        assert!(matches!(err, ChunkError::InvalidConfig(_)));
    }

    #[test]
    fn test_section_header_pattern() {
        let re = compile(SECTION_HEADER).unwrap();
        assert!(re.is_match("1 Rối loạn phát triển thần kinh"));
        assert!(re.is_match("2.1.3 Ảo giác"));
        assert!(!re.is_match("1. Some criterion"));
        assert!(!re.is_match("12 tháng qua, bệnh nhân"));
        assert!(!re.is_match("2019 Ấn bản"));
    }
}
