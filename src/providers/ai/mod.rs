//! LLM provider implementations.
//!
//! The pipeline treats the AI backend as an unreliable, latency-bearing
//! external call: any error or abnormally short response degrades to the
//! heuristic fallback verdict. The single implementation speaks the
//! OpenAI-compatible chat-completions protocol, which covers OpenAI,
//! Hugging Face router endpoints, vLLM, and Ollama.

mod openai;
mod traits;

pub use openai::OpenAiCompatibleProvider;
pub use traits::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, LlmResult,
    Message, Role, TokenUsage,
};
