//! Grounding prompt builder.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, ContextBlock, GroundingPolicy};
use sage_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde_json::json;

/// Template for the single-turn grounding prompt.
///
/// Variables: `domain`, `refusal`, `context`, `question`.
pub const GROUNDING_TEMPLATE: &str = "\
You are a careful assistant answering questions about {{domain}}.

Follow these rules strictly:
1. Answer primarily from the context provided below.
2. If the context is insufficient, you may draw on general knowledge of {{domain}}, but do not fabricate claims you cannot support.
3. If the question is outside {{domain}}, do not answer it. Reply exactly with: \"{{refusal}}\"
4. End every answer with a line starting with \"Sources:\" that lists the source identifiers you actually used.

Context:
{{context}}

Question:
{{question}}

Answer:";

/// Build the grounding prompt for a question and its retrieved context.
///
/// Blocks are rendered in the order given, which is retrieval order.
/// The question is inserted verbatim.
///
/// # Example
/// ```
/// use sage_prompt::{build_grounding_prompt, ContextBlock, GroundingPolicy};
///
/// let blocks = vec![ContextBlock::new("rulings.pdf", "Fasting is obligatory.")];
/// let built = build_grounding_prompt(&GroundingPolicy::default(), &blocks, "Is fasting required?")
///     .unwrap();
/// assert!(built.user.contains("Source: rulings.pdf"));
/// ```
pub fn build_grounding_prompt(
    policy: &GroundingPolicy,
    blocks: &[ContextBlock],
    question: &str,
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        blocks = blocks.len(),
        domain = %policy.domain,
        "Building grounding prompt"
    );

    let data = json!({
        "domain": policy.domain,
        "refusal": policy.refusal,
        "context": format_context(blocks),
        "question": question,
    });
    let user = render_template(GROUNDING_TEMPLATE, &data)?;

    Ok(BuiltPrompt {
        user,
        metadata: BuiltPromptMetadata {
            context_blocks: blocks.len(),
            sources: blocks.iter().map(|b| b.source.clone()).collect(),
            domain: policy.domain.clone(),
        },
    })
}

/// Format context blocks as `Source: <id>\n<text>`, separated by blank lines.
pub fn format_context(blocks: &[ContextBlock]) -> String {
    blocks
        .iter()
        .map(|block| format!("Source: {}\n{}", block.source, block.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a Handlebars template with JSON data.
fn render_template(template: &str, data: &serde_json::Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text prompt, no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Config(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Config(format!("Failed to render template: {}", e)))
}
