//! Prompt construction for Sage.
//!
//! This crate owns the grounding prompt sent to the generation backend:
//! - Handlebars template rendering
//! - The fixed answering policy (context first, no fabrication, refusal, citation)
//! - Labelled context blocks built from retrieved chunks

pub mod builder;
pub mod types;

// Re-export main types
pub use builder::{build_grounding_prompt, format_context, GROUNDING_TEMPLATE};
pub use types::{BuiltPrompt, BuiltPromptMetadata, ContextBlock, GroundingPolicy};
