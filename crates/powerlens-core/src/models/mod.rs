//! POWERLENS 도메인 모델.
//!
//! 파이프라인 단계 간에 전달되는 핵심 데이터 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod actionable;
pub mod insight;
pub mod query;
pub mod result;
pub mod telemetry;
