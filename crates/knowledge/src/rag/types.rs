//! Answer and service response types.

use serde::{Deserialize, Serialize};

/// A generated answer with its attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text
    pub text: String,

    /// Source identifiers in retrieval order; may contain duplicates
    pub sources: Vec<String>,
}

/// Service-facing result of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub top_k: usize,
}

impl AskResponse {
    pub fn new(answer: Answer, top_k: usize) -> Self {
        Self {
            answer: answer.text,
            sources: answer.sources,
            top_k,
        }
    }
}

/// Liveness report of a loaded service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,

    /// Number of chunks served
    pub chunks: usize,
}
