//! 애플리케이션 설정 구조체.
//!
//! LLM 제공자, 파이프라인 타임아웃/토큰 예산, 알림 기본 임계값, 자동화 설정을 정의한다.
//! `config` crate를 통해 파일/환경변수에서 로드 (`config_manager` 참조).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;
use crate::ports::llm_provider::CompletionOptions;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// AI 제공자 설정 (LLM)
    #[serde(default)]
    pub ai_provider: AiProviderConfig,
    /// 파이프라인 설정
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// 알림 기본값
    #[serde(default)]
    pub alerts: AlertDefaults,
    /// 자동화(액션 디스패치) 설정
    #[serde(default)]
    pub automation: AutomationConfig,
}

impl AppConfig {
    /// 기본 설정
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        self.pipeline.validate()?;
        if let Some(api) = &self.ai_provider.llm_api {
            if api.endpoint.trim().is_empty() {
                return Err(CoreError::Validation {
                    field: "ai_provider.llm_api.endpoint".into(),
                    message: "엔드포인트가 비어 있음".into(),
                });
            }
            if api.timeout_secs == 0 {
                return Err(CoreError::Validation {
                    field: "ai_provider.llm_api.timeout_secs".into(),
                    message: "0보다 커야 함".into(),
                });
            }
        }
        if self.alerts.battery_threshold_percent > 100 {
            return Err(CoreError::Validation {
                field: "alerts.battery_threshold_percent".into(),
                message: "0~100 범위 밖".into(),
            });
        }
        Ok(())
    }
}

// ============================================================
// AI 제공자 설정
// ============================================================

/// LLM 제공자 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LlmProviderType {
    /// 외부 API (`llm_api` 필요)
    Remote,
    /// 비활성 — 항상 오프라인 폴백
    #[default]
    Disabled,
}

/// AI 제공자 타입 — 요청/응답 형식 결정에 사용
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AiProviderType {
    /// Anthropic Claude API — `x-api-key` 헤더 + `/v1/messages` 형식
    Anthropic,
    /// OpenAI 호환 API — `Authorization: Bearer` 헤더 + `/v1/chat/completions` 형식
    OpenAi,
    /// 기타 제공자 — Bearer 인증, 범용 응답 파싱 사용
    #[default]
    Generic,
}

/// 외부 AI API 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalApiEndpoint {
    /// API URL (예: "https://api.example.com/v1/messages")
    pub endpoint: String,
    /// API 키
    #[serde(default)]
    pub api_key: String,
    /// 모델 이름
    pub model: Option<String>,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
    /// AI 제공자 타입
    #[serde(default)]
    pub provider_type: AiProviderType,
}

/// AI 제공자 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProviderConfig {
    /// LLM 제공자 종류
    #[serde(default)]
    pub llm_provider: LlmProviderType,
    /// 외부 LLM API 설정 (llm_provider=Remote일 때)
    #[serde(default)]
    pub llm_api: Option<ExternalApiEndpoint>,
    /// 외부 API 생성 실패 시 오프라인 제공자로 대체
    #[serde(default = "default_true")]
    pub fallback_to_local: bool,
}

impl Default for AiProviderConfig {
    fn default() -> Self {
        Self {
            llm_provider: LlmProviderType::default(),
            llm_api: None,
            fallback_to_local: true,
        }
    }
}

// ============================================================
// 파이프라인 설정
// ============================================================

/// 파이프라인 설정 — 타임아웃, 토큰 예산, 랭킹 크기
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 추천 합성 단계 타임아웃 (밀리초)
    #[serde(default = "default_synthesis_timeout_ms")]
    pub synthesis_timeout_ms: u64,
    /// 분류 단계 LLM 호출 타임아웃 (밀리초)
    #[serde(default = "default_classification_timeout_ms")]
    pub classification_timeout_ms: u64,
    /// 텔레메트리 조회 타임아웃 (밀리초)
    #[serde(default = "default_telemetry_timeout_ms")]
    pub telemetry_timeout_ms: u64,
    /// 추천 합성 최대 토큰
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// 분류 최대 토큰
    #[serde(default = "default_classification_max_tokens")]
    pub classification_max_tokens: u32,
    /// 샘플링 온도
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// "top N" 미지정 시 기본 N
    #[serde(default = "default_top_n")]
    pub default_top_n: u32,
    /// 최적화 액션 합성 시 상위 앱 수
    #[serde(default = "default_top_n")]
    pub optimization_top_n: u32,
    /// 항상 오프라인 경로 사용
    #[serde(default)]
    pub offline_only: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            synthesis_timeout_ms: default_synthesis_timeout_ms(),
            classification_timeout_ms: default_classification_timeout_ms(),
            telemetry_timeout_ms: default_telemetry_timeout_ms(),
            max_tokens: default_max_tokens(),
            classification_max_tokens: default_classification_max_tokens(),
            temperature: default_temperature(),
            default_top_n: default_top_n(),
            optimization_top_n: default_top_n(),
            offline_only: false,
        }
    }
}

impl PipelineConfig {
    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_millis(self.synthesis_timeout_ms)
    }

    pub fn classification_timeout(&self) -> Duration {
        Duration::from_millis(self.classification_timeout_ms)
    }

    pub fn telemetry_timeout(&self) -> Duration {
        Duration::from_millis(self.telemetry_timeout_ms)
    }

    /// 추천 합성용 완성 옵션
    pub fn synthesis_options(&self) -> CompletionOptions {
        CompletionOptions {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// 분류용 완성 옵션 (온도 0 — 구조화 응답)
    pub fn classification_options(&self) -> CompletionOptions {
        CompletionOptions {
            max_tokens: self.classification_max_tokens,
            temperature: 0.0,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        let positive = [
            ("pipeline.synthesis_timeout_ms", self.synthesis_timeout_ms),
            (
                "pipeline.classification_timeout_ms",
                self.classification_timeout_ms,
            ),
            ("pipeline.telemetry_timeout_ms", self.telemetry_timeout_ms),
            ("pipeline.max_tokens", u64::from(self.max_tokens)),
            (
                "pipeline.classification_max_tokens",
                u64::from(self.classification_max_tokens),
            ),
            ("pipeline.default_top_n", u64::from(self.default_top_n)),
            (
                "pipeline.optimization_top_n",
                u64::from(self.optimization_top_n),
            ),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(CoreError::Validation {
                    field: field.into(),
                    message: "0보다 커야 함".into(),
                });
            }
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(CoreError::Validation {
                field: "pipeline.temperature".into(),
                message: format!("0.0~2.0 범위 밖: {}", self.temperature),
            });
        }
        Ok(())
    }
}

// ============================================================
// 알림 기본값
// ============================================================

/// 숫자 없이 리소스만 언급된 모니터링 질의의 기본 임계값
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDefaults {
    /// 배터리 잔량 임계값 (%)
    #[serde(default = "default_battery_threshold")]
    pub battery_threshold_percent: u32,
    /// 데이터 사용량 임계값 (MB)
    #[serde(default = "default_data_threshold")]
    pub data_threshold_mb: u64,
}

impl Default for AlertDefaults {
    fn default() -> Self {
        Self {
            battery_threshold_percent: default_battery_threshold(),
            data_threshold_mb: default_data_threshold(),
        }
    }
}

// ============================================================
// 자동화 설정
// ============================================================

/// 자동화 설정 — 액션 디스패치
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// 디스패치 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 감사 로그 버퍼 크기
    #[serde(default = "default_audit_buffer_size")]
    pub audit_buffer_size: usize,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            audit_buffer_size: default_audit_buffer_size(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_timeout_secs() -> u64 {
    30
}

fn default_synthesis_timeout_ms() -> u64 {
    8_000
}

fn default_classification_timeout_ms() -> u64 {
    5_000
}

fn default_telemetry_timeout_ms() -> u64 {
    3_000
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_classification_max_tokens() -> u32 {
    256
}

fn default_temperature() -> f32 {
    0.2
}

fn default_top_n() -> u32 {
    3
}

fn default_battery_threshold() -> u32 {
    20
}

fn default_data_threshold() -> u64 {
    1000
}

fn default_audit_buffer_size() -> usize {
    1000
}
