//! Request builders carrying the retrieval boosts.

use medrag_core::{
    CriteriaRequest, DocField, FieldBoost, KeywordRequest, SectionLookup, VectorRequest,
};

/// Fields returned by keyword and vector search.
pub const SEARCH_SOURCE: [DocField; 8] = [
    DocField::Title,
    DocField::SubTitle,
    DocField::Content,
    DocField::SectionId,
    DocField::ParentSectionId,
    DocField::ParentSectionTitle,
    DocField::ContextHeaders,
    DocField::PageStart,
];

/// Hits fetched per list: three times `top_k`, capped at 50, never below `top_k`.
pub fn fetch_size(top_k: usize) -> usize {
    (top_k * 3).min(50).max(top_k)
}

pub fn keyword_request(text: &str, size: usize) -> KeywordRequest {
    KeywordRequest {
        text: text.to_string(),
        match_fields: vec![
            FieldBoost::new(DocField::Title, 3.0),
            FieldBoost::new(DocField::SubTitle, 2.0),
            FieldBoost::new(DocField::ContextHeaders, 1.5),
            FieldBoost::new(DocField::Content, 1.0),
        ],
        minimum_should_match_pct: 30,
        phrase_fields: vec![
            FieldBoost::new(DocField::Title, 4.0),
            FieldBoost::new(DocField::Content, 2.0),
        ],
        phrase_slop: 2,
        parent_title_boost: 1.0,
        size,
        source_fields: SEARCH_SOURCE.to_vec(),
    }
}

pub fn vector_request(vector: Vec<f32>, k: usize, num_candidates: usize) -> VectorRequest {
    VectorRequest {
        vector,
        k,
        num_candidates: num_candidates.max(k),
        source_fields: SEARCH_SOURCE.to_vec(),
    }
}

pub fn lookup_request(parent_ids: Vec<String>, max_siblings: usize) -> SectionLookup {
    let size = max_siblings * parent_ids.len();
    SectionLookup {
        section_ids: parent_ids,
        size,
    }
}

/// Disorder phrase search, favouring `Tiêu chí {criterion}` when given.
pub fn criteria_request(disorder: &str, criterion: Option<&str>) -> CriteriaRequest {
    CriteriaRequest {
        disorder: disorder.to_string(),
        phrase_fields: vec![
            FieldBoost::new(DocField::Title, 3.0),
            FieldBoost::new(DocField::ParentSectionTitle, 2.0),
            FieldBoost::new(DocField::ContextHeaders, 1.0),
        ],
        phrase_slop: 3,
        sub_title: criterion
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| format!("Tiêu chí {c}")),
        sub_title_boost: 5.0,
        size: 10,
    }
}

/// Parent of a dotted section id (`"2.1.3"` → `"2.1"`).
pub fn parent_of(section_id: &str) -> Option<&str> {
    section_id.rsplit_once('.').map(|(parent, _)| parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_size() {
        assert_eq!(fetch_size(10), 30);
        assert_eq!(fetch_size(20), 50);
        assert_eq!(fetch_size(1), 3);
        assert_eq!(fetch_size(80), 80);
    }

    #[test]
    fn test_keyword_request_boosts() {
        let request = keyword_request("trầm cảm", 30);
        let specs: Vec<String> = request
            .match_fields
            .iter()
            .map(FieldBoost::to_field_spec)
            .collect();
        assert_eq!(specs, vec!["title^3", "sub_title^2", "context_headers^1.5", "content"]);
        assert_eq!(request.phrase_slop, 2);
        assert_eq!(request.minimum_should_match_pct, 30);
        assert!(request.source_fields.contains(&DocField::PageStart));
    }

    #[test]
    fn test_vector_request_candidates_at_least_k() {
        let request = vector_request(vec![0.0; 3], 50, 10);
        assert_eq!(request.num_candidates, 50);
        assert_eq!(vector_request(vec![], 30, 100).num_candidates, 100);
    }

    #[test]
    fn test_lookup_size() {
        let lookup = lookup_request(vec!["1".to_string(), "2.1".to_string()], 2);
        assert_eq!(lookup.size, 4);
    }

    #[test]
    fn test_criteria_request() {
        let with = criteria_request("Rối loạn trầm cảm", Some("A"));
        assert_eq!(with.sub_title.as_deref(), Some("Tiêu chí A"));
        assert_eq!(with.size, 10);
        assert_eq!(with.phrase_slop, 3);

        assert!(criteria_request("X", None).sub_title.is_none());
        assert!(criteria_request("X", Some(" ")).sub_title.is_none());
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("2.1.3"), Some("2.1"));
        assert_eq!(parent_of("2.1"), Some("2"));
        assert_eq!(parent_of("2"), None);
    }
}
