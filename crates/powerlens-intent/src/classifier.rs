//! 의도 분류기.
//!
//! 자유 텍스트 질의를 `QueryAnalysis`로 변환한다. 실패하지 않는다:
//! LLM 호출 실패, 타임아웃, 응답 파싱 실패는 모두 키워드 규칙으로 대체된다.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use powerlens_core::config::PipelineConfig;
use powerlens_core::models::query::{ExtractedParameters, QueryAnalysis, QueryCategory};
use powerlens_core::ports::llm_provider::{CompletionOptions, LlmProvider};

use crate::json_extract::extract_json_object;
use crate::keywords;
use crate::prompts;

/// 의도 분류기
pub struct IntentClassifier {
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    timeout: Duration,
    /// 모델을 전혀 호출하지 않고 키워드 규칙만 사용
    offline_only: bool,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, options: CompletionOptions, timeout: Duration) -> Self {
        Self {
            llm,
            options,
            timeout,
            offline_only: false,
        }
    }

    /// 모델 호출 없이 키워드 분류만 하도록 설정 (빌더)
    pub fn with_offline_only(mut self, offline_only: bool) -> Self {
        self.offline_only = offline_only;
        self
    }

    /// 파이프라인 설정의 분류 옵션/타임아웃 사용
    pub fn from_config(llm: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self::new(
            llm,
            config.classification_options(),
            config.classification_timeout(),
        )
        .with_offline_only(config.offline_only)
    }

    /// 질의 분류. 항상 결과를 반환한다.
    pub async fn classify(&self, query: &str) -> QueryAnalysis {
        if query.trim().is_empty() {
            debug!("빈 질의 — Invalid");
            return QueryAnalysis::new(QueryCategory::Invalid, ExtractedParameters::default());
        }

        if self.offline_only || !self.llm.is_available() {
            debug!(provider = self.llm.provider_name(), "오프라인/LLM 비활성 — 키워드 분류");
            return Self::keyword_analysis(query);
        }

        let prompt = prompts::classification_prompt(query);
        let raw = match tokio::time::timeout(self.timeout, self.llm.complete(&prompt, &self.options))
            .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(error = %e, "분류 LLM 호출 실패 — 키워드 분류로 대체");
                return Self::keyword_analysis(query);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "분류 LLM 타임아웃 — 키워드 분류로 대체"
                );
                return Self::keyword_analysis(query);
            }
        };

        match parse_model_analysis(&raw, query) {
            Some(analysis) => {
                debug!(category = %analysis.category(), "LLM 분류 완료");
                analysis
            }
            None => {
                warn!(
                    response_len = raw.len(),
                    "분류 응답 해석 불가 — 키워드 분류로 대체"
                );
                Self::keyword_analysis(query)
            }
        }
    }

    /// 키워드 규칙만으로 분류
    pub fn keyword_analysis(query: &str) -> QueryAnalysis {
        let category = keywords::keyword_category(query);
        if category == QueryCategory::Invalid {
            return QueryAnalysis::new(category, ExtractedParameters::default());
        }
        reconcile(category, keywords::extract_parameters(query), query)
    }
}

/// 모델 응답 → 분류 결과. 카테고리를 읽을 수 없으면 None.
fn parse_model_analysis(raw: &str, query: &str) -> Option<QueryAnalysis> {
    let map = extract_json_object(raw)?;

    let category = match map.get("category")? {
        Value::String(name) => QueryCategory::from_name(name).or_else(|| {
            name.trim()
                .parse::<i64>()
                .ok()
                .and_then(|code| QueryCategory::try_from(code).ok())
        })?,
        Value::Number(code) => QueryCategory::try_from(code.as_i64()?).ok()?,
        _ => return None,
    };

    let params = map
        .get("parameters")
        .or_else(|| map.get("params"))
        .and_then(|value| match serde_json::from_value::<ExtractedParameters>(value.clone()) {
            Ok(params) => Some(params),
            Err(e) => {
                debug!(error = %e, "모델 파라미터 파싱 실패 — 키워드 추출 사용");
                None
            }
        })
        .unwrap_or_else(|| keywords::extract_parameters(query));

    Some(reconcile(category, params, query))
}

/// 두 경로 공통 후처리.
///
/// - "notify"/"alert" 질의는 Monitoring
/// - 질의 텍스트의 데이터 임계값(MB 환산)이 모델 값보다 우선
/// - 리소스 미지정이면 질의 키워드 기준 (기본 battery)
fn reconcile(
    category: QueryCategory,
    mut params: ExtractedParameters,
    query: &str,
) -> QueryAnalysis {
    let category = if keywords::mentions_notification(query) {
        QueryCategory::Monitoring
    } else {
        category
    };

    if let Some(from_text) = keywords::thresholds_in(query) {
        let mut thresholds = params.thresholds.unwrap_or_default();
        if from_text.data.is_some() {
            thresholds.data = from_text.data;
        }
        if thresholds.battery.is_none() {
            thresholds.battery = from_text.battery;
        }
        params.thresholds = Some(thresholds);
    }

    if params.resource_type.is_empty() {
        params.resource_type = keywords::resource_types(query);
    }

    QueryAnalysis::new(category, params)
}
