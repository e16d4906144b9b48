//! Generation backend crate for Sage.
//!
//! Provides a provider-agnostic abstraction over text-generation models.
//!
//! # Providers
//! - **Ollama**: Local model runtime (default)
//! - **OpenAI-compatible**: OpenAI, Groq, vLLM and friends
//!
//! # Example
//! ```no_run
//! use sage_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new(Duration::from_secs(60))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2").deterministic();
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_client_from_config};
pub use providers::{OllamaClient, OpenAiClient};
