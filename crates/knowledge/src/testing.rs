//! Test doubles shared by the unit tests of this crate.

use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::store::{BuildIdentity, CorpusIndex};
use crate::types::Chunk;
use async_trait::async_trait;
use sage_core::config::EmbeddingConfig;
use sage_core::{AppError, AppResult};
use sage_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Embedding provider with a fixed text-to-vector table.
#[derive(Debug)]
pub struct FixedVectorProvider {
    pub dimensions: usize,
    pub table: HashMap<String, Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for FixedVectorProvider {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        "fixed-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| {
                self.table
                    .get(t)
                    .cloned()
                    .ok_or_else(|| AppError::Backend(format!("No fixed vector for '{}'", t)))
            })
            .collect()
    }
}

pub fn fixed_embedder(dimensions: usize, table: &[(&str, Vec<f32>)]) -> Embedder {
    let provider = FixedVectorProvider {
        dimensions,
        table: table
            .iter()
            .map(|(t, v)| (t.to_string(), v.clone()))
            .collect(),
    };
    Embedder::new(Arc::new(provider), &EmbeddingConfig::default())
}

/// In-memory corpus whose chunk `i` has vector `vectors[i]`.
pub fn fixed_corpus(chunks: &[(&str, &str)], vectors: Vec<Vec<f32>>) -> CorpusIndex {
    let dimensions = vectors.first().map(|v| v.len()).unwrap_or(1);
    let chunks = chunks
        .iter()
        .enumerate()
        .map(|(i, (source, text))| Chunk::new(*text, *source, i as u32))
        .collect();

    CorpusIndex::build(
        chunks,
        &vectors,
        BuildIdentity {
            embedding_provider: "fixed".to_string(),
            embedding_model: "fixed-v1".to_string(),
            dimensions,
            chunk_size: 1000,
            chunk_overlap: 200,
        },
    )
    .unwrap()
}

/// Generation client that records every request and answers with a canned reply.
#[derive(Debug, Default)]
pub struct RecordingLlm {
    pub requests: Mutex<Vec<LlmRequest>>,
    pub fail: bool,
}

impl RecordingLlm {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail {
            return Err(AppError::Backend("generation service unavailable".to_string()));
        }

        Ok(LlmResponse {
            content: "Canned answer.\n\nSources: a.pdf".to_string(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

/// Local HTTP server answering every request with canned replies.
pub struct FakeHttpServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl FakeHttpServer {
    /// Requests served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve `replies` (status, JSON body) in order, repeating the last one,
/// each after `delay`. One request per connection.
pub async fn serve_http(replies: Vec<(u16, String)>, delay: Duration) -> FakeHttpServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = replies[n.min(replies.len() - 1)].clone();
            tokio::spawn(answer(stream, status, body, delay));
        }
    });

    FakeHttpServer { url, hits }
}

async fn answer(
    mut stream: TcpStream,
    status: u16,
    body: String,
    delay: Duration,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while request.len() < header_end + content_length {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    tokio::time::sleep(delay).await;
    let response = format!(
        "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
