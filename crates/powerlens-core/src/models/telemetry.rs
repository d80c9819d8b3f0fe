//! 디바이스 텔레메트리 스냅샷 모델.
//!
//! 외부 텔레메트리 수집기가 제공하는 읽기 전용 스냅샷.
//! 최신성은 보장되지 않는다 (제한된 지연 허용).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 1MB (10진수, 1GB = 1000MB)
pub const BYTES_PER_MB: f64 = 1_000_000.0;

/// 바이트 → MB
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// 배터리 상태
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryState {
    /// 잔량 (0~100)
    pub level_percent: u8,
    /// 충전 중 여부
    pub is_charging: bool,
    /// 시간당 소모율 (%/h, 수집기가 제공하는 경우)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_percent_per_hour: Option<f64>,
}

impl Default for BatteryState {
    fn default() -> Self {
        Self {
            level_percent: 100,
            is_charging: false,
            drain_percent_per_hour: None,
        }
    }
}

/// 앱별 리소스 사용량
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUsage {
    /// 패키지 이름 (예: com.zhiliaoapp.musically)
    pub package_name: String,
    /// 표시 이름 (예: TikTok)
    pub app_name: String,
    /// 배터리 사용 비율 (%)
    #[serde(default)]
    pub battery_usage_percent: f64,
    /// 백그라운드 데이터 (바이트)
    #[serde(default)]
    pub background_bytes: u64,
    /// 포그라운드 데이터 (바이트)
    #[serde(default)]
    pub foreground_bytes: u64,
}

impl AppUsage {
    pub fn total_bytes(&self) -> u64 {
        self.background_bytes.saturating_add(self.foreground_bytes)
    }

    pub fn background_mb(&self) -> f64 {
        bytes_to_mb(self.background_bytes)
    }

    pub fn total_mb(&self) -> f64 {
        bytes_to_mb(self.total_bytes())
    }
}

/// 네트워크 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Wifi,
    Cellular,
    Ethernet,
    None,
    #[default]
    Unknown,
}

/// 네트워크 상태
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    #[serde(default)]
    pub network_type: NetworkType,
    /// 데이터 요금제 한도 (MB, 알려진 경우)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_limit_mb: Option<f64>,
}

/// 디바이스 리소스 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// 수집 시각
    pub captured_at: DateTime<Utc>,
    /// 배터리 상태
    #[serde(default)]
    pub battery: BatteryState,
    /// 앱별 사용량
    #[serde(default)]
    pub apps: Vec<AppUsage>,
    /// 네트워크 상태
    #[serde(default)]
    pub network: NetworkState,
}

impl DeviceSnapshot {
    /// 텔레메트리 실패 시 사용하는 빈 스냅샷
    pub fn empty() -> Self {
        Self {
            captured_at: Utc::now(),
            battery: BatteryState::default(),
            apps: Vec::new(),
            network: NetworkState::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// 텍스트에 이름 또는 패키지가 등장하는 첫 번째 앱
    pub fn find_app_mentioned_in(&self, text: &str) -> Option<&AppUsage> {
        let lower = text.to_lowercase();
        self.apps.iter().find(|app| {
            (!app.app_name.is_empty() && lower.contains(&app.app_name.to_lowercase()))
                || (!app.package_name.is_empty()
                    && lower.contains(&app.package_name.to_lowercase()))
        })
    }

    /// 이름으로 앱 조회 (대소문자 무시)
    pub fn find_app_by_name(&self, name: &str) -> Option<&AppUsage> {
        self.apps.iter().find(|app| {
            app.app_name.eq_ignore_ascii_case(name) || app.package_name.eq_ignore_ascii_case(name)
        })
    }

    /// 전체 백그라운드 데이터 (MB)
    pub fn total_background_mb(&self) -> f64 {
        self.apps.iter().map(AppUsage::background_mb).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, package: &str) -> AppUsage {
        AppUsage {
            package_name: package.to_string(),
            app_name: name.to_string(),
            battery_usage_percent: 1.0,
            background_bytes: 2_000_000,
            foreground_bytes: 1_000_000,
        }
    }

    #[test]
    fn snapshot_deserializes_with_defaults() {
        let json = r#"{
            "captured_at": "2026-01-01T00:00:00Z",
            "apps": [{"package_name": "com.whatsapp", "app_name": "WhatsApp"}]
        }"#;
        let snapshot: DeviceSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.battery.level_percent, 100);
        assert_eq!(snapshot.apps[0].background_bytes, 0);
        assert_eq!(snapshot.network.network_type, NetworkType::Unknown);
    }

    #[test]
    fn find_app_mentioned_matches_name_or_package() {
        let mut snapshot = DeviceSnapshot::empty();
        snapshot.apps.push(app("TikTok", "com.zhiliaoapp.musically"));
        snapshot.apps.push(app("WhatsApp", "com.whatsapp"));

        let found = snapshot
            .find_app_mentioned_in("Alert me if tiktok uses 500MB")
            .unwrap();
        assert_eq!(found.package_name, "com.zhiliaoapp.musically");
        assert!(snapshot.find_app_mentioned_in("save battery").is_none());
        assert!(snapshot
            .find_app_mentioned_in("restrict com.whatsapp")
            .is_some());
    }

    #[test]
    fn byte_conversions_are_decimal() {
        let usage = app("A", "a");
        assert!((usage.background_mb() - 2.0).abs() < f64::EPSILON);
        assert!((usage.total_mb() - 3.0).abs() < f64::EPSILON);
    }
}
