//! Splitting of oversized section bodies.
//!
//! Bodies are cut at diagnostic-criterion letters first, then at numbered
//! sub-items, then at sentence boundaries. Sentence packing is greedy: it
//! keeps every piece under the budget but does not minimise the piece count.

use medrag_core::ChunkError;
use regex::Regex;

use crate::normalize::char_len;
use crate::patterns::{
    compile, CRITERION_LABEL, CRITERION_MARKER, ITEM_LABEL, ITEM_MARKER, SENTENCE_END,
};

/// One piece of a split section body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubChunk {
    pub text: String,
    /// `criteria_A`, `item_2`, `part_1`, ...; `None` when the body was not split
    pub sub_id: Option<String>,
    pub sub_title: Option<String>,
}

impl SubChunk {
    fn whole(text: &str) -> Self {
        Self {
            text: text.to_string(),
            sub_id: None,
            sub_title: None,
        }
    }

    fn labelled(text: String, sub_id: String, sub_title: String) -> Self {
        Self {
            text,
            sub_id: Some(sub_id),
            sub_title: Some(sub_title),
        }
    }
}

/// Which marker family a split used.
#[derive(Debug, Clone, Copy)]
enum MarkerKind {
    Criterion,
    Item,
}

/// Splits text into pieces no longer than a character budget where possible.
#[derive(Debug, Clone)]
pub struct SectionSplitter {
    criterion_marker: Regex,
    item_marker: Regex,
    criterion_label: Regex,
    item_label: Regex,
    sentence_end: Regex,
}

impl SectionSplitter {
    pub fn new() -> Result<Self, ChunkError> {
        Ok(Self {
            criterion_marker: compile(CRITERION_MARKER)?,
            item_marker: compile(ITEM_MARKER)?,
            criterion_label: compile(CRITERION_LABEL)?,
            item_label: compile(ITEM_LABEL)?,
            sentence_end: compile(SENTENCE_END)?,
        })
    }

    /// Split `body` into pieces of at most `budget` characters.
    ///
    /// A body already within budget is returned unchanged as a single piece.
    /// A single sentence longer than the budget is kept whole.
    pub fn split(&self, body: &str, budget: usize) -> Vec<SubChunk> {
        let body = body.trim();
        if body.is_empty() {
            return Vec::new();
        }
        if char_len(body) <= budget {
            return vec![SubChunk::whole(body)];
        }

        let criteria = split_before(body, &self.criterion_marker);
        if criteria.len() >= 2 {
            return self.label_parts(&criteria, MarkerKind::Criterion, budget);
        }

        let items = split_before(body, &self.item_marker);
        if items.len() >= 2 {
            return self.label_parts(&items, MarkerKind::Item, budget);
        }

        let pieces = self.pack_sentences(body, budget);
        if pieces.len() < 2 {
            return vec![SubChunk::whole(body)];
        }
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let n = i + 1;
                SubChunk::labelled(text, format!("part_{n}"), format!("Phần {n}"))
            })
            .collect()
    }

    fn label_parts(&self, parts: &[&str], kind: MarkerKind, budget: usize) -> Vec<SubChunk> {
        let mut out = Vec::with_capacity(parts.len());

        for part in parts {
            let (sub_id, sub_title) = self.label_for(part, kind);

            if char_len(part) <= budget {
                out.push(SubChunk::labelled(part.to_string(), sub_id, sub_title));
                continue;
            }

            let pieces = self.pack_sentences(part, budget);
            if pieces.len() < 2 {
                out.push(SubChunk::labelled(part.to_string(), sub_id, sub_title));
                continue;
            }
            for (j, text) in pieces.into_iter().enumerate() {
                let n = j + 1;
                out.push(SubChunk::labelled(
                    text,
                    format!("{sub_id}_p{n}"),
                    format!("{sub_title} (phần {n})"),
                ));
            }
        }
        out
    }

    fn label_for(&self, part: &str, kind: MarkerKind) -> (String, String) {
        let (label, id_prefix, title_prefix) = match kind {
            MarkerKind::Criterion => (&self.criterion_label, "criteria", "Tiêu chí"),
            MarkerKind::Item => (&self.item_label, "item", "Mục"),
        };
        match label.captures(part).and_then(|caps| caps.get(1)) {
            Some(marker) => (
                format!("{id_prefix}_{}", marker.as_str()),
                format!("{title_prefix} {}", marker.as_str()),
            ),
            None => ("intro".to_string(), "Giới thiệu".to_string()),
        }
    }

    /// Greedily pack sentences into pieces of at most `max_chars` characters.
    pub fn pack_sentences(&self, text: &str, max_chars: usize) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for sentence in self.sentences(text) {
            let len = char_len(sentence);
            if current.is_empty() {
                current.push_str(sentence);
                current_len = len;
            } else if current_len + 1 + len <= max_chars {
                current.push(' ');
                current.push_str(sentence);
                current_len += 1 + len;
            } else {
                pieces.push(std::mem::take(&mut current));
                current.push_str(sentence);
                current_len = len;
            }
        }

        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    /// Sentences of `text`, each keeping its final punctuation.
    fn sentences<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in self.sentence_end.find_iter(text) {
            // the punctuation mark is a single ASCII byte
            let end = m.start() + 1;
            let sentence = text[start..end].trim();
            if is_enumerator(sentence) {
                continue;
            }
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = m.end();
        }

        let rest = text[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }
        sentences
    }
}

/// A bare list marker such as `A.` or `12.`, which does not end a sentence.
fn is_enumerator(text: &str) -> bool {
    match text.strip_suffix('.') {
        Some(marker) => {
            !marker.is_empty()
                && marker.len() <= 3
                && marker
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        }
        None => false,
    }
}

/// Cut `text` in front of every match of `marker`, dropping empty parts.
fn split_before<'t>(text: &'t str, marker: &Regex) -> Vec<&'t str> {
    let mut parts = Vec::new();
    let mut start = 0;

    for m in marker.find_iter(text) {
        let part = text[start..m.start()].trim();
        if !part.is_empty() {
            parts.push(part);
        }
        start = m.start();
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        parts.push(rest);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter() -> SectionSplitter {
        SectionSplitter::new().unwrap()
    }

    fn normalized(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn sentence(word: &str, words: usize) -> String {
        format!("{}.", vec![word; words].join(" "))
    }

    // ==================== Small Body Tests ====================

    #[test]
    fn test_small_body_is_unchanged() {
        let chunks = splitter().split("Một câu ngắn. Câu khác.", 100);
        assert_eq!(chunks, vec![SubChunk::whole("Một câu ngắn. Câu khác.")]);
    }

    #[test]
    fn test_empty_body() {
        assert!(splitter().split("   ", 100).is_empty());
    }

    // ==================== Criteria Split Tests ====================

    #[test]
    fn test_split_on_criteria_letters() {
        let body = format!(
            "A. {}\nB. {}\nC. {}",
            sentence("alpha", 30),
            sentence("beta", 30),
            sentence("gamma", 30)
        );
        let chunks = splitter().split(&body, 300);

        let ids: Vec<_> = chunks.iter().filter_map(|c| c.sub_id.as_deref()).collect();
        assert_eq!(ids, vec!["criteria_A", "criteria_B", "criteria_C"]);
        assert_eq!(chunks[1].sub_title.as_deref(), Some("Tiêu chí B"));
        assert!(chunks[2].text.starts_with("C. gamma"));
    }

    #[test]
    fn test_criteria_intro_part() {
        let body = format!(
            "Tiêu chuẩn chẩn đoán gồm các mục sau.\nA. {}\nB. {}",
            sentence("alpha", 40),
            sentence("beta", 40)
        );
        let chunks = splitter().split(&body, 250);
        assert_eq!(chunks[0].sub_id.as_deref(), Some("intro"));
        assert_eq!(chunks[0].sub_title.as_deref(), Some("Giới thiệu"));
        assert_eq!(chunks[1].sub_id.as_deref(), Some("criteria_A"));
    }

    #[test]
    fn test_oversized_criterion_split_by_sentence() {
        let long_a = (0..12).map(|_| sentence("alpha", 10)).collect::<Vec<_>>().join(" ");
        let body = format!("A. {long_a}\nB. {}", sentence("beta", 10));
        let chunks = splitter().split(&body, 200);

        let ids: Vec<_> = chunks.iter().filter_map(|c| c.sub_id.as_deref()).collect();
        assert!(ids.starts_with(&["criteria_A_p1", "criteria_A_p2"]));
        assert_eq!(ids.last(), Some(&"criteria_B"));
        assert_eq!(chunks[0].sub_title.as_deref(), Some("Tiêu chí A (phần 1)"));
        assert!(chunks.iter().all(|c| char_len(&c.text) <= 200));
    }

    // ==================== Item Split Tests ====================

    #[test]
    fn test_split_on_numbered_items() {
        let body = format!(
            "1. {}\n2. {}\n3. {}",
            sentence("một", 30),
            sentence("hai", 30),
            sentence("ba", 30)
        );
        let chunks = splitter().split(&body, 200);
        let ids: Vec<_> = chunks.iter().filter_map(|c| c.sub_id.as_deref()).collect();
        assert_eq!(ids, vec!["item_1", "item_2", "item_3"]);
        assert_eq!(chunks[2].sub_title.as_deref(), Some("Mục 3"));
    }

    #[test]
    fn test_criteria_take_priority_over_items() {
        let body = format!(
            "A. {}\n1. {}\nB. {}",
            sentence("alpha", 30),
            sentence("một", 30),
            sentence("beta", 30)
        );
        let chunks = splitter().split(&body, 400);
        assert_eq!(chunks[0].sub_id.as_deref(), Some("criteria_A"));
        assert!(chunks[0].text.contains("1. một"));
    }

    // ==================== Sentence Split Tests ====================

    #[test]
    fn test_sentence_fallback_packs_greedily() {
        let body = (0..10).map(|_| sentence("từ", 20)).collect::<Vec<_>>().join(" ");
        let chunks = splitter().split(&body, 150);

        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].sub_id.as_deref(), Some("part_1"));
        assert_eq!(chunks[0].sub_title.as_deref(), Some("Phần 1"));
        assert!(chunks.iter().all(|c| char_len(&c.text) <= 150));
    }

    #[test]
    fn test_single_long_sentence_kept_whole() {
        let body = vec!["dài"; 100].join(" ");
        let chunks = splitter().split(&body, 50);
        assert_eq!(chunks, vec![SubChunk::whole(&body)]);
    }

    #[test]
    fn test_list_marker_does_not_end_sentence() {
        let s = splitter();
        assert_eq!(
            s.sentences("A. Có ít nhất hai. 12. Kéo dài"),
            vec!["A. Có ít nhất hai.", "12. Kéo dài"]
        );
    }

    #[test]
    fn test_sentences_keep_punctuation() {
        let s = splitter();
        assert_eq!(
            s.sentences("Một! Hai? Ba. Bốn"),
            vec!["Một!", "Hai?", "Ba.", "Bốn"]
        );
    }

    // ==================== Round Trip Tests ====================

    #[test]
    fn test_split_preserves_all_text() {
        let body = format!(
            "Mở đầu chung.\nA. {} {}\nB. {}\nC. {}",
            sentence("alpha", 40),
            sentence("delta", 40),
            sentence("beta", 20),
            sentence("gamma", 60)
        );
        let chunks = splitter().split(&body, 220);
        let rebuilt = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(normalized(&rebuilt), normalized(&body));
    }
}
