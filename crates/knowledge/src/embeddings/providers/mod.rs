//! Embedding provider implementations.

pub mod mock;
pub mod ollama;
pub mod remote;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use remote::RemoteProvider;
