//! Prompt types for Sage.

use serde::{Deserialize, Serialize};

/// Default refusal sentence for out-of-domain questions.
pub const DEFAULT_REFUSAL: &str =
    "I could not find any explicit ruling or reference in the available material.";

/// The answering policy a deployment is configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingPolicy {
    /// Subject area the corpus covers, e.g. "Islamic jurisprudence"
    pub domain: String,

    /// Sentence the model must reply with for out-of-domain questions
    pub refusal: String,
}

impl GroundingPolicy {
    pub fn new(domain: impl Into<String>, refusal: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            refusal: refusal.into(),
        }
    }
}

impl Default for GroundingPolicy {
    fn default() -> Self {
        Self::new("the documents in this corpus", DEFAULT_REFUSAL)
    }
}

/// One labelled piece of retrieved context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBlock {
    /// Source identifier (document file name)
    pub source: String,

    /// Chunk text, verbatim
    pub text: String,
}

impl ContextBlock {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A fully built prompt ready for the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// The whole prompt, sent as a single user turn
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Number of context blocks included
    #[serde(rename = "contextBlocks")]
    pub context_blocks: usize,

    /// Source identifiers offered to the model, in block order
    pub sources: Vec<String>,

    /// Domain the policy was rendered for
    pub domain: String,
}
