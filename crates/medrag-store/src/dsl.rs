//! Typed requests to Elasticsearch query DSL, and responses back.

use medrag_core::{
    CriteriaRequest, DocField, FieldBoost, IndexedDocument, KeywordRequest, SearchError,
    SearchHit, SectionLookup, VectorRequest,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Fields returned by a context lookup.
pub const LOOKUP_SOURCE: [DocField; 4] = [
    DocField::Title,
    DocField::SectionId,
    DocField::ParentSectionId,
    DocField::Content,
];

/// Fields returned by a criteria search.
pub const CRITERIA_SOURCE: [DocField; 6] = [
    DocField::Title,
    DocField::SubTitle,
    DocField::Content,
    DocField::SectionId,
    DocField::ParentSectionTitle,
    DocField::ContextHeaders,
];

fn field_specs(fields: &[FieldBoost]) -> Vec<String> {
    fields.iter().map(FieldBoost::to_field_spec).collect()
}

fn source(fields: &[DocField]) -> Vec<&'static str> {
    fields.iter().map(|f| f.as_str()).collect()
}

/// Best-fields, phrase and parent-title matches; any one must hit.
pub fn keyword_query(request: &KeywordRequest) -> Value {
    json!({
        "query": {
            "bool": {
                "should": [
                    {
                        "multi_match": {
                            "query": request.text,
                            "fields": field_specs(&request.match_fields),
                            "type": "best_fields",
                            "operator": "or",
                            "minimum_should_match":
                                format!("{}%", request.minimum_should_match_pct),
                        }
                    },
                    {
                        "multi_match": {
                            "query": request.text,
                            "fields": field_specs(&request.phrase_fields),
                            "type": "phrase",
                            "slop": request.phrase_slop,
                        }
                    },
                    {
                        "match": {
                            "parent_section_title": {
                                "query": request.text,
                                "boost": request.parent_title_boost,
                            }
                        }
                    }
                ],
                "minimum_should_match": 1
            }
        },
        "size": request.size,
        "_source": source(&request.source_fields),
    })
}

pub fn vector_query(request: &VectorRequest) -> Value {
    json!({
        "knn": {
            "field": "embedding",
            "query_vector": request.vector,
            "k": request.k,
            "num_candidates": request.num_candidates,
        },
        "size": request.k,
        "_source": source(&request.source_fields),
    })
}

/// Documents whose parent or own section id is listed.
pub fn lookup_query(request: &SectionLookup) -> Value {
    json!({
        "query": {
            "bool": {
                "should": [
                    { "terms": { "parent_section_id": request.section_ids } },
                    { "terms": { "section_id": request.section_ids } }
                ],
                "minimum_should_match": 1
            }
        },
        "size": request.size,
        "_source": source(&LOOKUP_SOURCE),
    })
}

pub fn criteria_query(request: &CriteriaRequest) -> Value {
    let should: Vec<Value> = request
        .sub_title
        .iter()
        .map(|sub_title| {
            json!({
                "match": {
                    "sub_title": { "query": sub_title, "boost": request.sub_title_boost }
                }
            })
        })
        .collect();

    json!({
        "query": {
            "bool": {
                "must": [
                    {
                        "multi_match": {
                            "query": request.disorder,
                            "fields": field_specs(&request.phrase_fields),
                            "type": "phrase",
                            "slop": request.phrase_slop,
                        }
                    }
                ],
                "should": should,
            }
        },
        "size": request.size,
        "_source": source(&CRITERIA_SOURCE),
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: IndexedDocument,
}

/// Hits of a `_search` response in engine order.
pub fn parse_hits(body: &[u8]) -> Result<Vec<SearchHit>, SearchError> {
    let response: SearchResponse = serde_json::from_slice(body)
        .map_err(|e| SearchError::Decode(format!("search response: {e}")))?;
    Ok(response
        .hits
        .hits
        .into_iter()
        .map(|hit| SearchHit {
            id: hit.id,
            score: hit.score.unwrap_or(0.0),
            document: hit.source,
        })
        .collect())
}

/// NDJSON body indexing each document under its id.
pub fn bulk_body(
    index_name: &str,
    documents: &[(String, IndexedDocument)],
) -> Result<String, SearchError> {
    let mut body = String::new();
    for (id, document) in documents {
        let action = json!({ "index": { "_index": index_name, "_id": id } });
        body.push_str(&action.to_string());
        body.push('\n');
        let source = serde_json::to_string(document)
            .map_err(|e| SearchError::Decode(format!("document {id}: {e}")))?;
        body.push_str(&source);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<std::collections::HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

/// Maximum per-document failure reasons kept in a report.
const MAX_REPORTED_ERRORS: usize = 10;

pub fn parse_bulk(body: &[u8]) -> Result<medrag_core::BulkReport, SearchError> {
    let response: BulkResponse = serde_json::from_slice(body)
        .map_err(|e| SearchError::Decode(format!("bulk response: {e}")))?;

    let mut report = medrag_core::BulkReport::default();
    for item in response.items.iter().flat_map(|entry| entry.values()) {
        if (200..300).contains(&item.status) {
            report.indexed += 1;
            continue;
        }
        report.failed += 1;
        if report.errors.len() < MAX_REPORTED_ERRORS {
            let reason = item
                .error
                .as_ref()
                .and_then(|e| e.get("reason"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            report.errors.push(format!(
                "{}: {} ({})",
                item.id.as_deref().unwrap_or("?"),
                reason,
                item.status
            ));
        }
    }
    Ok(report)
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

pub fn parse_count(body: &[u8]) -> Result<u64, SearchError> {
    serde_json::from_slice::<CountResponse>(body)
        .map(|r| r.count)
        .map_err(|e| SearchError::Decode(format!("count response: {e}")))
}
