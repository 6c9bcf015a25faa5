//! Index settings and mapping for chunk documents.

use serde_json::{json, Value};

/// Custom analyzer applied to every text field.
pub const ANALYZER: &str = "vietnamese";

/// Text field with an exact-match `.keyword` subfield.
fn text_with_keyword() -> Value {
    json!({
        "type": "text",
        "analyzer": ANALYZER,
        "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
    })
}

/// Settings and mappings for an index storing `dimension`-sized embeddings.
#[must_use]
pub fn index_mapping(dimension: usize) -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "analysis": {
                "analyzer": {
                    ANALYZER: {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "asciifolding"]
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "index": { "type": "keyword" },
                "section_id": { "type": "keyword" },
                "parent_section_id": { "type": "keyword" },
                "title": text_with_keyword(),
                "sub_title": text_with_keyword(),
                "parent_section_title": text_with_keyword(),
                "context_headers": { "type": "text", "analyzer": ANALYZER },
                "content": { "type": "text", "analyzer": ANALYZER },
                "page_start": { "type": "integer" },
                "merged_from": { "type": "text" },
                "embedding": {
                    "type": "dense_vector",
                    "dims": dimension,
                    "index": true,
                    "similarity": "cosine"
                }
            }
        }
    })
}
