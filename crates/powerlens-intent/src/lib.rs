//! # powerlens-intent
//!
//! 리소스 질의 의도 파이프라인.
//!
//! ```text
//! query ─▶ IntentClassifier ─▶ RecommendationSynthesizer ─▶ ResponseNormalizer ─▶ AnalysisResult
//!                                   │ (실패/타임아웃)
//!                                   └──────────▶ OfflineAnalyzer ─────────────────┘
//! ```
//!
//! - [`classifier`] — 자유 텍스트 → `QueryAnalysis` (LLM + 키워드 폴백)
//! - [`keywords`] — 결정적 키워드 규칙 (카테고리, 파라미터, 임계값)
//! - [`prompts`] — 카테고리별 고정 지시문
//! - [`synthesizer`] — 스냅샷 + 분류 → 추천 프롬프트 → 원문 페이로드
//! - [`normalizer`] — 원문 페이로드 → 허용 목록 검증된 결과
//! - [`ranking`] — 온라인/오프라인 공용 순위, 제외, 점수 규칙
//! - [`offline`] — 모델 없이 스냅샷만으로 결과 계산
//! - [`orchestrator`] — 단계 순서, 타임아웃, 폴백 결정
//! - [`disabled_llm`] — 오프라인 모드용 LLM 제공자

pub mod classifier;
pub mod disabled_llm;
pub mod json_extract;
pub mod keywords;
pub mod normalizer;
pub mod offline;
pub mod orchestrator;
pub mod prompts;
pub mod ranking;
pub mod synthesizer;

pub use classifier::IntentClassifier;
pub use disabled_llm::DisabledLlmProvider;
pub use normalizer::ResponseNormalizer;
pub use offline::OfflineAnalyzer;
pub use orchestrator::{PipelineOutcome, PipelinePath, PipelineStage, QueryOrchestrator};
pub use synthesizer::RecommendationSynthesizer;
