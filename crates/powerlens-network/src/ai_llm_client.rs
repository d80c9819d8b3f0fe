//! 외부 AI LLM 클라이언트.
//!
//! 외부 AI API (Claude, GPT 등)에 텍스트 프롬프트를 보내고 응답 원문을 돌려준다.
//! 응답 텍스트의 구조 해석은 하지 않는다 — 정규화는 파이프라인 몫이다.

use async_trait::async_trait;
use tracing::{debug, warn};

use powerlens_core::config::{AiProviderType, ExternalApiEndpoint};
use powerlens_core::error::CoreError;
use powerlens_core::ports::llm_provider::{CompletionOptions, LlmProvider};

/// 기본 모델 이름
const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// 시스템 프롬프트 — 역할 고정
const SYSTEM_PROMPT: &str = "You are a mobile device resource assistant. \
Answer only about battery and data usage. When asked for JSON, respond with a single JSON object.";

// ============================================================
// RemoteLlmProvider — 외부 AI LLM 클라이언트
// ============================================================

/// 외부 AI LLM 클라이언트
///
/// 지원 API:
/// - Claude (Anthropic): `POST /v1/messages`
/// - OpenAI 호환: `POST /v1/chat/completions`
/// - 범용: OpenAI 형식 요청 + 여러 응답 형태 파싱
///
/// 재시도하지 않는다. 타임아웃은 reqwest 클라이언트 단위로 설정되고,
/// 파이프라인 타임아웃이 먼저 걸리면 future drop으로 요청이 취소된다.
#[derive(Debug)]
pub struct RemoteLlmProvider {
    /// HTTP 클라이언트
    http_client: reqwest::Client,
    /// API 엔드포인트 URL
    endpoint: String,
    /// API 키 (메모리에만 유지)
    api_key: String,
    /// 모델 이름
    model: String,
    /// AI 제공자 타입 — 요청/응답 형식 결정에 사용
    provider_type: AiProviderType,
}

impl RemoteLlmProvider {
    /// 새 RemoteLlmProvider 생성
    pub fn new(config: &ExternalApiEndpoint) -> Result<Self, CoreError> {
        if config.api_key.is_empty() && config.provider_type != AiProviderType::Generic {
            return Err(CoreError::Config(
                "AI LLM API 키 미설정. 설정 파일 또는 POWERLENS__AI_PROVIDER__LLM_API__API_KEY로 입력하세요."
                    .into(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        debug!(
            endpoint = %config.endpoint,
            model = %model,
            timeout = config.timeout_secs,
            provider = ?config.provider_type,
            "RemoteLlmProvider 초기화"
        );

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model,
            provider_type: config.provider_type,
        })
    }

    /// 제공자 형식에 맞춘 요청 본문
    fn build_request_body(&self, prompt: &str, options: &CompletionOptions) -> serde_json::Value {
        match self.provider_type {
            AiProviderType::Anthropic => serde_json::json!({
                "model": self.model,
                "max_tokens": options.max_tokens,
                "temperature": options.temperature,
                "system": SYSTEM_PROMPT,
                "messages": [{
                    "role": "user",
                    "content": prompt
                }]
            }),
            // OpenAI 호환 형식
            AiProviderType::OpenAi | AiProviderType::Generic => serde_json::json!({
                "model": self.model,
                "max_tokens": options.max_tokens,
                "temperature": options.temperature,
                "messages": [
                    {
                        "role": "system",
                        "content": SYSTEM_PROMPT
                    },
                    {
                        "role": "user",
                        "content": prompt
                    }
                ]
            }),
        }
    }

    /// Claude API 응답에서 텍스트 추출 (`content[*].text` 연결)
    fn parse_claude_response(body: &str) -> Result<String, CoreError> {
        let response: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| CoreError::Internal(format!("LLM 응답 JSON 파싱 실패: {}", e)))?;

        let text: String = response
            .get("content")
            .and_then(|c| c.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(CoreError::Internal(
                "LLM 응답에서 텍스트를 찾을 수 없음".to_string(),
            ));
        }
        Ok(text)
    }

    /// OpenAI API 응답에서 텍스트 추출 (`choices[0].message.content`)
    fn parse_openai_response(body: &str) -> Result<String, CoreError> {
        let response: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| CoreError::Internal(format!("LLM 응답 JSON 파싱 실패: {}", e)))?;

        response
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                CoreError::Internal("OpenAI 응답에서 텍스트를 찾을 수 없음".to_string())
            })
    }

    /// 범용 응답 파싱 — OpenAI/Claude 형식 또는 `text`/`response`/`output` 필드, 그 외 원문
    fn parse_generic_response(body: &str) -> Result<String, CoreError> {
        if let Ok(text) = Self::parse_openai_response(body) {
            return Ok(text);
        }
        if let Ok(text) = Self::parse_claude_response(body) {
            return Ok(text);
        }
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            for key in ["text", "response", "output", "completion"] {
                if let Some(text) = value.get(key).and_then(|t| t.as_str()) {
                    return Ok(text.to_string());
                }
            }
        }
        if body.trim().is_empty() {
            return Err(CoreError::Internal("LLM 응답 본문이 비어 있음".to_string()));
        }
        Ok(body.to_string())
    }
}

#[async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CoreError> {
        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            prompt_len = prompt.len(),
            max_tokens = options.max_tokens,
            "외부 LLM API 호출"
        );

        let request_body = self.build_request_body(prompt, options);

        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request_body);

        builder = match self.provider_type {
            AiProviderType::Anthropic => builder
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01"),
            AiProviderType::OpenAi => {
                builder.header("Authorization", format!("Bearer {}", self.api_key))
            }
            AiProviderType::Generic if !self.api_key.is_empty() => {
                builder.header("Authorization", format!("Bearer {}", self.api_key))
            }
            AiProviderType::Generic => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::Network(format!("LLM API 타임아웃: {}", e))
            } else {
                CoreError::Network(format!("LLM API 호출 실패: {}", e))
            }
        })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Network(format!("LLM API 응답 읽기 실패: {}", e)))?;

        if status.as_u16() == 429 {
            warn!(status = %status, "LLM API 요청 한도 초과");
            return Err(CoreError::RateLimit {
                retry_after_secs: retry_after.unwrap_or(60),
            });
        }
        if status.as_u16() == 503 {
            return Err(CoreError::ServiceUnavailable(format!(
                "LLM API ({})",
                status
            )));
        }
        if !status.is_success() {
            warn!(status = %status, "LLM API 오류 응답");
            return Err(CoreError::Network(format!(
                "LLM API 오류 ({}): {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let text = match self.provider_type {
            AiProviderType::Anthropic => Self::parse_claude_response(&body)?,
            AiProviderType::OpenAi => Self::parse_openai_response(&body)?,
            AiProviderType::Generic => Self::parse_generic_response(&body)?,
        };

        debug!(response_len = text.len(), "LLM 응답 수신 완료");
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        &self.model
    }

    fn is_external(&self) -> bool {
        true
    }
}

// ============================================================
// 테스트
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(url: String, provider_type: AiProviderType) -> ExternalApiEndpoint {
        ExternalApiEndpoint {
            endpoint: url,
            api_key: "test-key".to_string(),
            model: Some("test-model".to_string()),
            timeout_secs: 5,
            provider_type,
        }
    }

    #[test]
    fn new_requires_api_key_for_hosted_providers() {
        let mut config = endpoint("http://localhost".into(), AiProviderType::Anthropic);
        config.api_key.clear();
        assert!(RemoteLlmProvider::new(&config).is_err());

        config.provider_type = AiProviderType::Generic;
        assert!(RemoteLlmProvider::new(&config).is_ok());
    }

    #[test]
    fn anthropic_body_carries_options() {
        let provider =
            RemoteLlmProvider::new(&endpoint("http://x".into(), AiProviderType::Anthropic))
                .unwrap();
        let body = provider.build_request_body(
            "hello",
            &CompletionOptions {
                max_tokens: 128,
                temperature: 0.1,
            },
        );
        assert_eq!(body["max_tokens"], 128);
        assert_eq!(body["messages"][0]["content"], "hello");
        assert!(body["system"].as_str().unwrap().contains("battery"));
    }

    #[test]
    fn parse_claude_response_joins_blocks() {
        let body = r#"{"content": [{"type": "text", "text": "part one "}, {"type": "text", "text": "{\"insights\": []}"}]}"#;
        let text = RemoteLlmProvider::parse_claude_response(body).unwrap();
        assert_eq!(text, "part one {\"insights\": []}");
    }

    #[test]
    fn parse_claude_response_without_text_fails() {
        assert!(RemoteLlmProvider::parse_claude_response(r#"{"content": []}"#).is_err());
        assert!(RemoteLlmProvider::parse_claude_response("not json").is_err());
    }

    #[test]
    fn parse_openai_response_valid() {
        let body = r#"{"choices": [{"message": {"content": "Spotify uses the most data."}}]}"#;
        let text = RemoteLlmProvider::parse_openai_response(body).unwrap();
        assert_eq!(text, "Spotify uses the most data.");
        assert!(RemoteLlmProvider::parse_openai_response(r#"{"choices": []}"#).is_err());
    }

    #[test]
    fn parse_generic_response_variants() {
        assert_eq!(
            RemoteLlmProvider::parse_generic_response(r#"{"response": "ok"}"#).unwrap(),
            "ok"
        );
        assert_eq!(
            RemoteLlmProvider::parse_generic_response("plain text answer").unwrap(),
            "plain text answer"
        );
        assert!(RemoteLlmProvider::parse_generic_response("   ").is_err());
    }

    #[tokio::test]
    async fn complete_anthropic_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content": [{"type": "text", "text": "{\"category\": \"information\"}"}]}"#)
            .create_async()
            .await;

        let provider = RemoteLlmProvider::new(&endpoint(
            format!("{}/v1/messages", server.url()),
            AiProviderType::Anthropic,
        ))
        .unwrap();
        let text = provider
            .complete("classify", &CompletionOptions::default())
            .await
            .unwrap();
        assert!(text.contains("information"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_openai_sends_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"content": "hi"}}]}"#)
            .create_async()
            .await;

        let provider = RemoteLlmProvider::new(&endpoint(
            format!("{}/v1/chat/completions", server.url()),
            AiProviderType::OpenAi,
        ))
        .unwrap();
        let text = provider
            .complete("hello", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_maps_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .with_header("retry-after", "12")
            .create_async()
            .await;

        let provider = RemoteLlmProvider::new(&endpoint(
            format!("{}/v1/messages", server.url()),
            AiProviderType::Anthropic,
        ))
        .unwrap();
        let err = provider
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::RateLimit {
                retry_after_secs: 12
            }
        ));
        assert!(err.is_backend_failure());
    }

    #[tokio::test]
    async fn complete_server_error_is_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let provider = RemoteLlmProvider::new(&endpoint(
            format!("{}/v1/messages", server.url()),
            AiProviderType::Anthropic,
        ))
        .unwrap();
        let err = provider
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[test]
    fn provider_info() {
        let provider =
            RemoteLlmProvider::new(&endpoint("http://x".into(), AiProviderType::OpenAi)).unwrap();
        assert_eq!(provider.provider_name(), "test-model");
        assert!(provider.is_external());
        assert!(provider.is_available());
    }
}
