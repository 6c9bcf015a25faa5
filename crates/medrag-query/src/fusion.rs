//! Weighted reciprocal rank fusion.

use std::collections::HashMap;

use medrag_core::{IndexedDocument, RetrievalScores, SearchHit};

/// Fusion parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub rrf_k: f64,
    pub keyword: f64,
    pub vector: f64,
    /// Multiplier for documents found by both searches
    pub overlap_bonus: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            keyword: 1.0,
            vector: 1.2,
            overlap_bonus: 1.2,
        }
    }
}

/// A document with its fused score.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub id: String,
    pub document: IndexedDocument,
    pub scores: RetrievalScores,
}

/// Fuse two ranked lists: each hit adds `weight / (rrf_k + rank)`.
///
/// The result is the union of both lists, sorted by score descending with
/// ties broken by id. The keyword hit's source wins when a document appears
/// in both.
pub fn reciprocal_rank_fusion(
    keyword: Vec<SearchHit>,
    vector: Vec<SearchHit>,
    weights: &FusionWeights,
) -> Vec<FusedHit> {
    let mut fused: HashMap<String, FusedHit> = HashMap::new();

    for (i, hit) in keyword.into_iter().enumerate() {
        let rank = i + 1;
        let entry = fused.entry(hit.id.clone()).or_insert_with(|| FusedHit {
            id: hit.id,
            document: hit.document,
            scores: RetrievalScores::default(),
        });
        entry.scores.rrf += weights.keyword / (weights.rrf_k + rank as f64);
        entry.scores.keyword_rank.get_or_insert(rank);
    }

    for (i, hit) in vector.into_iter().enumerate() {
        let rank = i + 1;
        let entry = fused.entry(hit.id.clone()).or_insert_with(|| FusedHit {
            id: hit.id,
            document: hit.document,
            scores: RetrievalScores::default(),
        });
        entry.scores.rrf += weights.vector / (weights.rrf_k + rank as f64);
        entry.scores.vector_rank.get_or_insert(rank);
    }

    let mut ranked: Vec<FusedHit> = fused
        .into_values()
        .map(|mut hit| {
            if hit.scores.keyword_rank.is_some() && hit.scores.vector_rank.is_some() {
                hit.scores.rrf *= weights.overlap_bonus;
            }
            hit
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.scores
            .rrf
            .total_cmp(&a.scores.rrf)
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(ids: &[&str]) -> Vec<SearchHit> {
        ids.iter()
            .map(|id| SearchHit {
                id: id.to_string(),
                score: 1.0,
                document: IndexedDocument {
                    title: format!("doc {id}"),
                    ..Default::default()
                },
            })
            .collect()
    }

    fn equal_weights() -> FusionWeights {
        FusionWeights {
            rrf_k: 60.0,
            keyword: 1.0,
            vector: 1.0,
            overlap_bonus: 1.2,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_rrf_scores_and_order() {
        let fused = reciprocal_rank_fusion(
            hits(&["A", "B", "C"]),
            hits(&["B", "C", "D"]),
            &equal_weights(),
        );
        let by_id: HashMap<&str, &FusedHit> = fused.iter().map(|h| (h.id.as_str(), h)).collect();

        assert!(approx(by_id["A"].scores.rrf, 1.0 / 61.0));
        assert!(approx(by_id["B"].scores.rrf, (1.0 / 62.0 + 1.0 / 61.0) * 1.2));
        assert!(approx(by_id["C"].scores.rrf, (1.0 / 63.0 + 1.0 / 62.0) * 1.2));
        assert!(approx(by_id["D"].scores.rrf, 1.0 / 63.0));

        let order: Vec<&str> = fused.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_union_keeps_vector_only_documents() {
        let fused = reciprocal_rank_fusion(hits(&["A"]), hits(&["Z"]), &equal_weights());
        let z = fused.iter().find(|h| h.id == "Z").unwrap();

        assert_eq!(fused.len(), 2);
        assert_eq!(z.scores.keyword_rank, None);
        assert_eq!(z.scores.vector_rank, Some(1));
        assert!(approx(z.scores.rrf, 1.0 / 61.0));
    }

    #[test]
    fn test_ties_broken_by_id() {
        let fused = reciprocal_rank_fusion(hits(&["b"]), hits(&["a"]), &equal_weights());
        let order: Vec<&str> = fused.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_vector_weight_favours_semantic_hits() {
        let fused = reciprocal_rank_fusion(hits(&["K"]), hits(&["V"]), &FusionWeights::default());
        assert_eq!(fused[0].id, "V");
        assert!(approx(fused[0].scores.rrf, 1.2 / 61.0));
    }

    #[test]
    fn test_vector_only_input() {
        let fused = reciprocal_rank_fusion(Vec::new(), hits(&["X", "Y"]), &equal_weights());
        let order: Vec<&str> = fused.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(order, vec!["X", "Y"]);
        assert!(fused.iter().all(|h| h.scores.keyword_rank.is_none()));
    }

    #[test]
    fn test_keyword_source_wins() {
        let mut keyword = hits(&["A"]);
        keyword[0].document.content = "from keyword".to_string();
        let fused = reciprocal_rank_fusion(keyword, hits(&["A"]), &equal_weights());
        assert_eq!(fused[0].document.content, "from keyword");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reciprocal_rank_fusion(Vec::new(), Vec::new(), &equal_weights()).is_empty());
    }
}
