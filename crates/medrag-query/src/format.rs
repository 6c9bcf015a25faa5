//! Rendering results as LLM context.

use medrag_core::RetrievalResult;

/// Default context budget in characters.
pub const DEFAULT_MAX_CHARS: usize = 8000;

const RULE_WIDTH: usize = 60;

fn render_block(result: &RetrievalResult) -> String {
    let mut block = format!(
        "[Section {}] {}",
        result.section_id.as_deref().unwrap_or("N/A"),
        result.title
    );
    if let Some(sub_title) = result.sub_title.as_deref().filter(|s| !s.is_empty()) {
        block.push_str("\nTiêu chí: ");
        block.push_str(sub_title);
    }
    block.push_str("\n\n");
    block.push_str(&result.content);
    block.push('\n');
    block.push_str(&"─".repeat(RULE_WIDTH));
    block.push('\n');
    block
}

/// Concatenate result blocks in rank order within `max_chars` characters.
///
/// Stops before the first block that would exceed the budget. A first block
/// that alone exceeds it is cut at a character boundary.
pub fn format_context_for_llm(results: &[RetrievalResult], max_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0;

    for (i, result) in results.iter().enumerate() {
        let block = render_block(result);
        let separator = usize::from(i > 0);
        let len = block.chars().count();

        if used + separator + len > max_chars {
            if i == 0 {
                context.extend(block.chars().take(max_chars));
            }
            break;
        }
        if separator == 1 {
            context.push('\n');
        }
        context.push_str(&block);
        used += separator + len;
    }
    context
}
