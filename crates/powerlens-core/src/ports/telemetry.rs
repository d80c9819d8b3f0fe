//! 텔레메트리 소스 포트.
//!
//! 구현은 외부 수집기 몫이다. OS 조회가 느릴 수 있으므로 async로 노출한다.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::telemetry::DeviceSnapshot;

/// 디바이스 리소스 스냅샷 제공자
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// 현재 스냅샷 조회 (지연된 값일 수 있음)
    async fn snapshot(&self) -> Result<DeviceSnapshot, CoreError>;
}
