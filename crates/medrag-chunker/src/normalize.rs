//! Paragraph reconstruction and text cleaning.

use medrag_core::ChunkError;
use regex::Regex;

use crate::patterns::{compile, DISALLOWED_CHARS, ENUMERATED_LINE, WHITESPACE_RUN};

/// Characters that end a paragraph when they end a line.
const PARAGRAPH_END: [char; 6] = ['.', '!', '?', '…', ':', ')'];

/// Rebuilds paragraphs from wrapped PDF lines and cleans chunk text.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    enumerated_line: Regex,
    disallowed: Regex,
    whitespace: Regex,
}

impl TextNormalizer {
    /// Create a normalizer.
    pub fn new() -> Result<Self, ChunkError> {
        Ok(Self {
            enumerated_line: compile(ENUMERATED_LINE)?,
            disallowed: compile(DISALLOWED_CHARS)?,
            whitespace: compile(WHITESPACE_RUN)?,
        })
    }

    /// Join wrapped lines into paragraphs separated by `\n`.
    ///
    /// A line starts a new paragraph when the previous line ends a sentence
    /// or the line itself opens an enumerated item; otherwise it is appended
    /// to the current paragraph with a single space.
    pub fn smart_join_lines<S: AsRef<str>>(&self, lines: &[S]) -> String {
        let mut paragraphs: Vec<String> = Vec::new();
        let mut current = String::new();

        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }

            if current.is_empty() {
                current.push_str(line);
            } else if current.ends_with(&PARAGRAPH_END[..])
                || self.enumerated_line.is_match(line)
            {
                paragraphs.push(std::mem::take(&mut current));
                current.push_str(line);
            } else {
                current.push(' ');
                current.push_str(line);
            }
        }

        if !current.is_empty() {
            paragraphs.push(current);
        }
        paragraphs.join("\n")
    }

    /// Strip unsupported characters, collapse whitespace and trim.
    pub fn clean_text(&self, text: &str) -> String {
        let stripped = self.disallowed.replace_all(text, "");
        self.whitespace
            .replace_all(&stripped, " ")
            .trim()
            .to_string()
    }
}

/// Number of characters (not bytes) in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new().unwrap()
    }

    // ==================== smart_join_lines Tests ====================

    #[test]
    fn test_join_wrapped_lines() {
        let joined = normalizer().smart_join_lines(&[
            "Rối loạn này thường khởi phát",
            "trong thời thơ ấu và kéo dài",
            "đến tuổi trưởng thành.",
        ]);
        assert_eq!(
            joined,
            "Rối loạn này thường khởi phát trong thời thơ ấu và kéo dài đến tuổi trưởng thành."
        );
    }

    #[test]
    fn test_break_after_sentence_end() {
        let joined = normalizer().smart_join_lines(&["Câu thứ nhất.", "Câu thứ hai"]);
        assert_eq!(joined, "Câu thứ nhất.\nCâu thứ hai");
    }

    #[test]
    fn test_break_after_colon_ellipsis_and_paren() {
        let joined = normalizer().smart_join_lines(&["Gồm:", "một…", "hai (xem trên)", "ba"]);
        assert_eq!(joined, "Gồm:\nmột…\nhai (xem trên)\nba");
    }

    #[test]
    fn test_break_before_enumerated_items() {
        let joined = normalizer().smart_join_lines(&[
            "Tiêu chuẩn chẩn đoán",
            "A. Thiếu hụt kéo dài",
            "trong giao tiếp xã hội",
            "1. Thiếu hụt qua lại",
        ]);
        assert_eq!(
            joined,
            "Tiêu chuẩn chẩn đoán\nA. Thiếu hụt kéo dài trong giao tiếp xã hội\n1. Thiếu hụt qua lại"
        );
    }

    #[test]
    fn test_join_skips_blank_lines() {
        let joined = normalizer().smart_join_lines(&["", "  dòng một", "   ", "dòng hai  "]);
        assert_eq!(joined, "dòng một dòng hai");
    }

    #[test]
    fn test_join_empty_input() {
        let lines: [&str; 0] = [];
        assert_eq!(normalizer().smart_join_lines(&lines), "");
    }

    // ==================== clean_text Tests ====================

    #[test]
    fn test_clean_collapses_whitespace() {
        assert_eq!(
            normalizer().clean_text("  Trầm   cảm\n\n\tnặng  "),
            "Trầm cảm nặng"
        );
    }

    #[test]
    fn test_clean_strips_unsupported_characters() {
        assert_eq!(
            normalizer().clean_text("Triệu chứng • kéo dài ≥ 2 tuần ★"),
            "Triệu chứng kéo dài 2 tuần"
        );
    }

    #[test]
    fn test_clean_keeps_context_header_and_punctuation() {
        let text = "[Rối loạn A > Tiêu chí con]\nA. Có (ít nhất) 5/9 triệu chứng; kéo dài 50%.";
        assert_eq!(
            normalizer().clean_text(text),
            "[Rối loạn A > Tiêu chí con] A. Có (ít nhất) 5/9 triệu chứng; kéo dài 50%."
        );
    }

    #[test]
    fn test_char_len_counts_characters() {
        assert_eq!(char_len("Rối loạn"), 8);
        assert_eq!("Rối loạn".len(), 12);
    }
}
