//! LLM integration: the generation client trait, the OpenRouter-compatible
//! HTTP implementation, and the offline stub variant.

mod client;
mod openrouter;
mod stub;

pub use client::{GenerationClient, GenerationRequest, GenerationResponse, Message, Usage};
pub use openrouter::OpenRouterClient;
pub use stub::StubClient;
