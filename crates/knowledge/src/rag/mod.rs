//! Answering: grounding prompt synthesis and the question service.

pub mod service;
pub mod sources;
pub mod synthesizer;
pub mod types;

pub use service::RagService;
pub use sources::unique_sources;
pub use synthesizer::AnswerSynthesizer;
pub use types::{Answer, AskResponse, HealthStatus};
