//! Deterministic stub generation client.
//!
//! Selected at startup with `--stub`, this client lets the pipeline run end
//! to end without credentials or network access. There is no silent mock
//! fallback inside business logic; offline operation is an explicit,
//! operator-chosen client variant.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::client::{GenerationClient, GenerationRequest, GenerationResponse, Usage};
use crate::error::LlmError;

/// Fixed token counts reported per stub call.
const STUB_PROMPT_TOKENS: u64 = 50;
const STUB_COMPLETION_TOKENS: u64 = 25;

/// Offline generation client producing deterministic placeholder documents.
#[derive(Debug, Default, Clone)]
pub struct StubClient {
    calls: Arc<AtomicUsize>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of generate calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl GenerationClient for StubClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        // First prompt line only, so the output stays readable in records.
        let heading = prompt.lines().next().unwrap_or("").trim();

        Ok(GenerationResponse {
            model: "stub".to_string(),
            content: format!("[stub document]\n{}", heading),
            usage: Usage::new(STUB_PROMPT_TOKENS, STUB_COMPLETION_TOKENS),
        })
    }
}
