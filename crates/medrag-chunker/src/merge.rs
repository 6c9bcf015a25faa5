//! Single-pass merge of undersized chunks into their next sibling.

use medrag_core::Chunk;

use crate::normalize::char_len;

const SEPARATOR: &str = "\n\n";

/// Merge each short chunk into the chunk after it when both share a parent
/// and the result fits in `max_chunk_size`.
///
/// The merged chunk takes the second chunk's identity. Merged chunks are not
/// considered again in the same pass.
pub fn merge_short_chunks(
    chunks: Vec<Chunk>,
    min_chunk_size: usize,
    max_chunk_size: usize,
) -> Vec<Chunk> {
    let mut merged = Vec::with_capacity(chunks.len());
    let mut iter = chunks.into_iter().peekable();

    while let Some(current) = iter.next() {
        if current.is_short {
            if let Some(next) = iter.next_if(|next| can_merge(&current, next, max_chunk_size)) {
                merged.push(combine(current, next, min_chunk_size));
                continue;
            }
        }
        merged.push(current);
    }
    merged
}

fn can_merge(current: &Chunk, next: &Chunk, max_chunk_size: usize) -> bool {
    current.parent_unique_id == next.parent_unique_id
        && current.char_count + SEPARATOR.len() + next.char_count <= max_chunk_size
}

fn combine(first: Chunk, second: Chunk, min_chunk_size: usize) -> Chunk {
    let content = format!("{}{SEPARATOR}{}", first.content, second.content);
    let content_raw = format!("{}{SEPARATOR}{}", first.content_raw, second.content_raw);
    let char_count = char_len(&content);

    Chunk {
        merged_from: Some(vec![merge_label(&first), merge_label(&second)]),
        is_short: char_count < min_chunk_size,
        page_start: first.page_start.min(second.page_start),
        content,
        content_raw,
        char_count,
        ..second
    }
}

/// Section id, qualified by sub id for split chunks.
fn merge_label(chunk: &Chunk) -> String {
    match &chunk.sub_id {
        Some(sub_id) => format!("{}/{sub_id}", chunk.section_id),
        None => chunk.section_id.clone(),
    }
}
