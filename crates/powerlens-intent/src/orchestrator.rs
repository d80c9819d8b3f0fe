//! 질의 오케스트레이터.
//!
//! `Idle → Classifying → Synthesizing → Normalizing → Done` 순서로 한 질의를 처리한다.
//! 합성 단계의 백엔드 실패나 타임아웃은 `OfflineFallback`으로 전이한다.
//! `process`는 실패하지 않고, 최악의 경우 저하된 정보성 결과를 반환한다.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use powerlens_core::config::{AppConfig, PipelineConfig};
use powerlens_core::error::CoreError;
use powerlens_core::models::query::{QueryAnalysis, QueryCategory};
use powerlens_core::models::result::AnalysisResult;
use powerlens_core::models::telemetry::DeviceSnapshot;
use powerlens_core::ports::llm_provider::LlmProvider;
use powerlens_core::ports::telemetry::TelemetrySource;

use crate::classifier::IntentClassifier;
use crate::normalizer::ResponseNormalizer;
use crate::offline::OfflineAnalyzer;
use crate::synthesizer::RecommendationSynthesizer;

/// 파이프라인 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Classifying,
    Synthesizing,
    Normalizing,
    OfflineFallback,
    Done,
}

/// 결과를 만든 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePath {
    /// 모델 응답을 정규화한 결과
    Online,
    /// 스냅샷만으로 계산한 결과
    Offline,
}

/// 단계 기록이 포함된 처리 결과
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub analysis: QueryAnalysis,
    pub result: AnalysisResult,
    pub stages: Vec<PipelineStage>,
    pub path: PipelinePath,
}

/// 질의 오케스트레이터
///
/// LLM 제공자와 텔레메트리 소스는 생성 시 주입되며 수명은 호출자가 관리한다.
/// 질의 간 공유하는 가변 상태는 없다.
pub struct QueryOrchestrator {
    llm: Arc<dyn LlmProvider>,
    telemetry: Arc<dyn TelemetrySource>,
    classifier: IntentClassifier,
    synthesizer: RecommendationSynthesizer,
    normalizer: ResponseNormalizer,
    offline: OfflineAnalyzer,
    pipeline: PipelineConfig,
}

impl QueryOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        telemetry: Arc<dyn TelemetrySource>,
        config: &AppConfig,
    ) -> Self {
        Self {
            classifier: IntentClassifier::from_config(llm.clone(), &config.pipeline),
            synthesizer: RecommendationSynthesizer::from_config(llm.clone(), config),
            normalizer: ResponseNormalizer::from_config(config),
            offline: OfflineAnalyzer::from_config(config),
            pipeline: config.pipeline.clone(),
            llm,
            telemetry,
        }
    }

    /// 질의 처리. 항상 결과를 반환한다.
    pub async fn process(&self, query: &str) -> AnalysisResult {
        self.process_traced(query).await.result
    }

    /// 독립 태스크로 질의 처리 (호출 스레드를 막지 않음)
    pub fn spawn_process(self: Arc<Self>, query: String) -> JoinHandle<AnalysisResult> {
        tokio::spawn(async move { self.process(&query).await })
    }

    /// 질의 처리 + 거친 단계 기록
    pub async fn process_traced(&self, query: &str) -> PipelineOutcome {
        let mut stages = vec![PipelineStage::Idle, PipelineStage::Classifying];

        // 분류와 텔레메트리 수집은 서로 독립
        let (analysis, snapshot) =
            tokio::join!(self.classifier.classify(query), self.fetch_snapshot());
        let category = analysis.category();
        info!(
            category = %category,
            apps = snapshot.apps.len(),
            provider = self.llm.provider_name(),
            "질의 분류 완료"
        );

        if category == QueryCategory::Invalid {
            stages.push(PipelineStage::Normalizing);
            let result = self.normalizer.normalize(category, "", &snapshot, query);
            stages.push(PipelineStage::Done);
            return PipelineOutcome {
                analysis,
                result,
                stages,
                path: PipelinePath::Online,
            };
        }

        stages.push(PipelineStage::Synthesizing);
        let payload = if self.pipeline.offline_only || !self.llm.is_available() {
            debug!("오프라인 모드 — 합성 생략");
            None
        } else {
            match self.synthesize_bounded(&analysis, &snapshot).await {
                Ok(raw) => Some(raw),
                Err(e) if e.is_backend_failure() => {
                    warn!(error = %e, "추천 합성 백엔드 장애 — 오프라인 폴백");
                    None
                }
                Err(e) => {
                    // 계약 위반 등 백엔드 장애가 아닌 실패도 결과는 오프라인으로 만든다
                    error!(error = %e, "추천 합성 비정상 실패 — 오프라인 폴백");
                    None
                }
            }
        };

        let (result, path) = match payload {
            Some(raw) => {
                stages.push(PipelineStage::Normalizing);
                (
                    self.normalizer.normalize(category, &raw, &snapshot, query),
                    PipelinePath::Online,
                )
            }
            None => {
                stages.push(PipelineStage::OfflineFallback);
                (
                    self.offline.analyze(&analysis, &snapshot, query),
                    PipelinePath::Offline,
                )
            }
        };
        stages.push(PipelineStage::Done);

        info!(
            category = %category,
            path = ?path,
            insights = result.insights.len(),
            actionables = result.actionables.len(),
            "질의 처리 완료"
        );

        PipelineOutcome {
            analysis,
            result,
            stages,
            path,
        }
    }

    /// 타임아웃이 걸린 합성 호출. 재시도하지 않는다.
    ///
    /// 타임아웃 시 진행 중인 future가 drop되어 백엔드 요청도 취소되고
    /// `ExecutionTimeout`이 반환된다. 빈 응답은 `ServiceUnavailable`로 본다.
    async fn synthesize_bounded(
        &self,
        analysis: &QueryAnalysis,
        snapshot: &DeviceSnapshot,
    ) -> Result<String, CoreError> {
        let timeout = self.pipeline.synthesis_timeout();
        let raw = tokio::time::timeout(timeout, self.synthesizer.synthesize(analysis, snapshot))
            .await
            .map_err(|_| CoreError::ExecutionTimeout {
                timeout_ms: self.pipeline.synthesis_timeout_ms,
            })??;
        if raw.trim().is_empty() {
            return Err(CoreError::ServiceUnavailable("empty recommendation".into()));
        }
        Ok(raw)
    }

    /// 스냅샷 조회. 실패/타임아웃이면 빈 스냅샷.
    async fn fetch_snapshot(&self) -> DeviceSnapshot {
        match tokio::time::timeout(self.pipeline.telemetry_timeout(), self.telemetry.snapshot())
            .await
        {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!(error = %e, "텔레메트리 조회 실패 — 빈 스냅샷 사용");
                DeviceSnapshot::empty()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.pipeline.telemetry_timeout_ms,
                    "텔레메트리 조회 타임아웃 — 빈 스냅샷 사용"
                );
                DeviceSnapshot::empty()
            }
        }
    }
}
