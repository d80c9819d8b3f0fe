//! 파일 기반 텔레메트리 소스.
//!
//! JSON 형식의 `DeviceSnapshot` 파일을 읽는다. 경로가 없으면 빈 스냅샷을 돌려준다.
//! 실제 OS 수집기가 붙기 전까지 CLI와 시나리오 재현에 사용한다.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use powerlens_core::error::CoreError;
use powerlens_core::models::telemetry::DeviceSnapshot;
use powerlens_core::ports::telemetry::TelemetrySource;

pub struct SnapshotFileSource {
    path: Option<PathBuf>,
}

impl SnapshotFileSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl TelemetrySource for SnapshotFileSource {
    async fn snapshot(&self) -> Result<DeviceSnapshot, CoreError> {
        let Some(path) = &self.path else {
            debug!("스냅샷 파일 미지정 — 빈 스냅샷");
            return Ok(DeviceSnapshot::empty());
        };

        let content = tokio::fs::read_to_string(path).await?;
        let snapshot: DeviceSnapshot = serde_json::from_str(&content)?;
        debug!(
            path = %path.display(),
            apps = snapshot.apps.len(),
            battery = snapshot.battery.level_percent,
            "스냅샷 파일 로드"
        );
        Ok(snapshot)
    }
}
