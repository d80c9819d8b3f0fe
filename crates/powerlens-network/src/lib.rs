//! # powerlens-network
//!
//! 네트워크 어댑터.
//! 외부 LLM API(Anthropic, OpenAI 호환, 범용 엔드포인트)를 `LlmProvider` 포트로 노출한다.

pub mod ai_llm_client;

pub use ai_llm_client::RemoteLlmProvider;
