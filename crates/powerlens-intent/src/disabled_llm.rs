//! 오프라인 모드 LLM 제공자.
//!
//! 외부 API 없이 실행할 때 주입한다. 호출 불가 상태를 알리므로
//! 분류기는 키워드 규칙으로, 오케스트레이터는 오프라인 폴백으로 바로 간다.

use async_trait::async_trait;

use powerlens_core::error::CoreError;
use powerlens_core::ports::llm_provider::{CompletionOptions, LlmProvider};

/// 비활성 LLM 제공자
pub struct DisabledLlmProvider;

impl DisabledLlmProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DisabledLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for DisabledLlmProvider {
    async fn complete(
        &self,
        _prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, CoreError> {
        Err(CoreError::ServiceUnavailable(
            "LLM 비활성 (오프라인 모드)".to_string(),
        ))
    }

    fn provider_name(&self) -> &str {
        "offline"
    }

    fn is_external(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_is_backend_failure() {
        let provider = DisabledLlmProvider::new();
        let err = provider
            .complete("anything", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_backend_failure());
    }

    #[test]
    fn provider_info() {
        let provider = DisabledLlmProvider;
        assert_eq!(provider.provider_name(), "offline");
        assert!(!provider.is_external());
        assert!(!provider.is_available());
    }
}
