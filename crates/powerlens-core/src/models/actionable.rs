//! 실행 가능 액션(Actionable) 모델과 허용 목록.
//!
//! 모델이 제안한 액션은 여기 정의된 닫힌 허용 목록을 통과해야만
//! 타입 도메인으로 들어올 수 있다. 허용 목록은 프로세스 전역 상수이다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::query::ResourceType;

/// 센티넬 패키지 이름 — 특정 앱에 묶이지 않은 시스템 전체 액션
pub const SYSTEM_PACKAGE: &str = "system";

/// 액션 종류 (닫힌 허용 목록, 모델 확장 불가)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionableType {
    /// 프로세스 종료
    KillApp,
    /// 웨이크락 관리
    ManageWakeLocks,
    /// 백그라운드 데이터 제한
    RestrictBackgroundData,
    /// 대기 버킷 변경
    SetStandbyBucket,
    /// 배터리/데이터 임계값 알림
    SetAlert,
    /// 예약 알람
    SetScheduledAlarm,
}

/// 허용된 액션 종류 전체
pub const ALLOWED_ACTIONABLE_TYPES: [ActionableType; 6] = [
    ActionableType::KillApp,
    ActionableType::ManageWakeLocks,
    ActionableType::RestrictBackgroundData,
    ActionableType::SetStandbyBucket,
    ActionableType::SetAlert,
    ActionableType::SetScheduledAlarm,
];

impl ActionableType {
    /// snake_case 와이어 이름
    pub fn as_str(self) -> &'static str {
        match self {
            ActionableType::KillApp => "kill_app",
            ActionableType::ManageWakeLocks => "manage_wake_locks",
            ActionableType::RestrictBackgroundData => "restrict_background_data",
            ActionableType::SetStandbyBucket => "set_standby_bucket",
            ActionableType::SetAlert => "set_alert",
            ActionableType::SetScheduledAlarm => "set_scheduled_alarm",
        }
    }

    /// 모델 응답의 타입 문자열을 허용 목록과 대조한다.
    ///
    /// 대소문자, `_`, `-`, 공백을 무시한다. 레거시 알림 표기
    /// (`set_battery_alert`, `set_data_alert`)는 리소스 힌트와 함께 `SetAlert`로 매핑된다.
    /// 허용 목록 밖이면 `None`.
    pub fn from_wire(value: &str) -> Option<(Self, Option<ResourceType>)> {
        let key: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let parsed = match key.as_str() {
            "killapp" => (ActionableType::KillApp, None),
            "managewakelocks" | "managewakelock" => (ActionableType::ManageWakeLocks, None),
            "restrictbackgrounddata" => (ActionableType::RestrictBackgroundData, None),
            "setstandbybucket" => (ActionableType::SetStandbyBucket, None),
            "setalert" => (ActionableType::SetAlert, None),
            "setbatteryalert" => (ActionableType::SetAlert, Some(ResourceType::Battery)),
            "setdataalert" => (ActionableType::SetAlert, Some(ResourceType::Data)),
            "setscheduledalarm" => (ActionableType::SetScheduledAlarm, None),
            _ => return None,
        };
        Some(parsed)
    }

    /// 특정 앱 패키지가 필요한 액션인지
    pub fn requires_package(self) -> bool {
        !matches!(
            self,
            ActionableType::SetAlert | ActionableType::SetScheduledAlarm
        )
    }

    pub fn is_allowed(self) -> bool {
        ALLOWED_ACTIONABLE_TYPES.contains(&self)
    }
}

impl fmt::Display for ActionableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 검증된 디바이스 리소스 개입 명령. 생성 후 불변.
///
/// `id`는 생성 시 발급되며 Effector 결과 맵의 조인 키로 사용된다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actionable {
    id: Uuid,
    #[serde(rename = "type")]
    actionable_type: ActionableType,
    package_name: String,
    description: String,
    reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    new_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    estimated_battery_savings_minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    estimated_data_savings_mb: Option<f64>,
    severity: u8,
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    throttle_level: Option<i32>,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
}

impl Actionable {
    /// 기본 심각도
    pub const DEFAULT_SEVERITY: u8 = 3;

    /// 새 액션 생성 — 매번 새 UUID를 발급한다
    pub fn new(
        actionable_type: ActionableType,
        package_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actionable_type,
            package_name: package_name.into(),
            description: description.into(),
            reason: String::new(),
            new_mode: None,
            estimated_battery_savings_minutes: None,
            estimated_data_savings_mb: None,
            severity: Self::DEFAULT_SEVERITY,
            enabled: true,
            throttle_level: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_new_mode(mut self, mode: impl Into<String>) -> Self {
        self.new_mode = Some(mode.into());
        self
    }

    pub fn with_battery_savings(mut self, minutes: f64) -> Self {
        self.estimated_battery_savings_minutes = Some(minutes);
        self
    }

    pub fn with_data_savings(mut self, megabytes: f64) -> Self {
        self.estimated_data_savings_mb = Some(megabytes);
        self
    }

    /// 심각도 설정 (1~5로 클램프)
    pub fn with_severity(mut self, severity: u8) -> Self {
        self.severity = severity.clamp(1, 5);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_throttle_level(mut self, level: i32) -> Self {
        self.throttle_level = Some(level);
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn actionable_type(&self) -> ActionableType {
        self.actionable_type
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn new_mode(&self) -> Option<&str> {
        self.new_mode.as_deref()
    }

    pub fn estimated_battery_savings_minutes(&self) -> Option<f64> {
        self.estimated_battery_savings_minutes
    }

    pub fn estimated_data_savings_mb(&self) -> Option<f64> {
        self.estimated_data_savings_mb
    }

    pub fn severity(&self) -> u8 {
        self.severity
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn throttle_level(&self) -> Option<i32> {
        self.throttle_level
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_wire_accepts_spelling_variants() {
        for raw in ["kill_app", "KILL_APP", "KillApp", "kill-app", "Kill App"] {
            assert_eq!(
                ActionableType::from_wire(raw),
                Some((ActionableType::KillApp, None)),
                "{raw}"
            );
        }
    }

    #[test]
    fn from_wire_maps_legacy_alerts() {
        assert_eq!(
            ActionableType::from_wire("set_data_alert"),
            Some((ActionableType::SetAlert, Some(ResourceType::Data)))
        );
        assert_eq!(
            ActionableType::from_wire("SET_BATTERY_ALERT"),
            Some((ActionableType::SetAlert, Some(ResourceType::Battery)))
        );
    }

    #[test]
    fn from_wire_rejects_unknown_types() {
        assert_eq!(ActionableType::from_wire("enable_battery_saver"), None);
        assert_eq!(ActionableType::from_wire("factory_reset"), None);
        assert_eq!(ActionableType::from_wire(""), None);
    }

    #[test]
    fn every_type_roundtrips_through_wire_name() {
        for ty in ALLOWED_ACTIONABLE_TYPES {
            assert_eq!(ActionableType::from_wire(ty.as_str()), Some((ty, None)));
            assert!(ty.is_allowed());
        }
    }

    #[test]
    fn new_actionables_get_fresh_ids() {
        let a = Actionable::new(ActionableType::SetAlert, SYSTEM_PACKAGE, "alert");
        let b = Actionable::new(ActionableType::SetAlert, SYSTEM_PACKAGE, "alert");
        assert_ne!(a.id(), b.id());
        assert!(a.enabled());
        assert_eq!(a.severity(), Actionable::DEFAULT_SEVERITY);
    }

    #[test]
    fn severity_is_clamped() {
        let a = Actionable::new(ActionableType::KillApp, "com.example", "kill").with_severity(9);
        assert_eq!(a.severity(), 5);
        let b = Actionable::new(ActionableType::KillApp, "com.example", "kill").with_severity(0);
        assert_eq!(b.severity(), 1);
    }

    #[test]
    fn serializes_type_as_snake_case() {
        let a = Actionable::new(
            ActionableType::RestrictBackgroundData,
            "com.google.android.youtube",
            "Restrict YouTube",
        )
        .with_parameter("resource_type", "data");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "restrict_background_data");
        assert_eq!(json["parameters"]["resource_type"], "data");
        assert!(json.get("new_mode").is_none());
    }
}
