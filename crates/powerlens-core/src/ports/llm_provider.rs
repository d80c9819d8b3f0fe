//! LLM 제공자 포트.
//!
//! 텍스트 프롬프트를 보내고 원문 텍스트를 돌려받는 최소 인터페이스.
//! 재시도 정책은 코어가 가정하지 않는다 (필요하면 구현체 책임).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 완성 요청 옵션
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// 최대 출력 토큰
    pub max_tokens: u32,
    /// 샘플링 온도 (낮을수록 결정적)
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}

/// LLM 제공자 — 프롬프트 → 원문 텍스트
///
/// 구현체: `RemoteLlmProvider` (외부 API), `DisabledLlmProvider` (오프라인)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// 프롬프트 완성. 네트워크/타임아웃 시 에러를 반환할 수 있다.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CoreError>;

    /// 제공자 이름 (예: "claude-api", "offline")
    fn provider_name(&self) -> &str;

    /// 외부 API인지 여부
    fn is_external(&self) -> bool;

    /// 호출 가능한 상태인지 (false면 오케스트레이터가 바로 오프라인 경로로 간다)
    fn is_available(&self) -> bool {
        true
    }
}
