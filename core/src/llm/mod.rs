//! LLM client abstractions and implementations

pub mod callback;
pub mod client;
pub mod providers;

pub use callback::{BlockingCompletion, LlmCallback};
pub use client::{GenerateRequest, GenerateResponse, LlmClient};
pub use providers::*;
