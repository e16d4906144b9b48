//! Structured progress reporting for index builds.
//!
//! Builds can run for minutes on a large corpus; every phase reports
//! incremental events that the CLI renders and tracing records.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Phase of an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Load,
    Chunk,
    Embed,
    Index,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Index => "index",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event emitted during a build.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: BuildPhase,

    /// Units of work done so far (files, documents, texts)
    pub current: u64,

    /// Total expected work
    pub total: u64,

    /// Human-readable detail
    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    pub fn new(phase: BuildPhase, current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            message: message.into(),
            elapsed_secs: 0.0,
        }
    }

    /// Percentage complete; an empty phase counts as done.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.current as f64 / self.total as f64) * 100.0
        }
    }

    /// One-line rendering, e.g. `[embed] 64/120 (53%) - model=trigram-v1`.
    pub fn format_simple(&self) -> String {
        format!(
            "[{}] {}/{} ({:.0}%) - {}",
            self.phase,
            self.current,
            self.total,
            self.percentage(),
            self.message
        )
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits build progress through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Reporter that only logs.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, mut event: ProgressEvent) {
        event.elapsed_secs = self.start_time.elapsed().as_secs_f64();

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = event.total,
            message = %event.message,
            elapsed_secs = event.elapsed_secs,
            "Build progress"
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn load(&self, current: usize, total: usize, file: &str) {
        self.emit(ProgressEvent::new(
            BuildPhase::Load,
            current as u64,
            total as u64,
            format!("read {}", file),
        ));
    }

    pub fn chunk(&self, current: usize, total: usize, chunks_created: usize) {
        self.emit(ProgressEvent::new(
            BuildPhase::Chunk,
            current as u64,
            total as u64,
            format!("{} chunks created", chunks_created),
        ));
    }

    pub fn embed(&self, current: usize, total: usize, model: &str) {
        self.emit(ProgressEvent::new(
            BuildPhase::Embed,
            current as u64,
            total as u64,
            format!("model={}", model),
        ));
    }

    pub fn index(&self, current: usize, total: usize, message: &str) {
        self.emit(ProgressEvent::new(
            BuildPhase::Index,
            current as u64,
            total as u64,
            message,
        ));
    }
}
