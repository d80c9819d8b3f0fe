//! 쿼리 분류 모델.
//!
//! 사용자 자유 텍스트 질의를 분류한 결과(`QueryAnalysis`)와
//! 추출된 구조화 파라미터(`ExtractedParameters`)를 정의한다.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================
// QueryCategory — 닫힌 4+1 카테고리
// ============================================================

/// 질의 카테고리 (닫힌 집합)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    /// 이해할 수 없는 질의
    Invalid,
    /// 사실 정보 조회 ("어떤 앱이 배터리를 많이 쓰나")
    Information,
    /// 예측 ("오늘 밤까지 버틸 수 있나")
    Predictive,
    /// 최적화 ("배터리 절약")
    Optimization,
    /// 모니터링/알림 ("500MB 넘으면 알려줘")
    Monitoring,
}

impl QueryCategory {
    /// 카테고리 코드 (0~4)
    pub fn code(self) -> i64 {
        match self {
            QueryCategory::Invalid => 0,
            QueryCategory::Information => 1,
            QueryCategory::Predictive => 2,
            QueryCategory::Optimization => 3,
            QueryCategory::Monitoring => 4,
        }
    }

    /// 소문자 이름
    pub fn as_str(self) -> &'static str {
        match self {
            QueryCategory::Invalid => "invalid",
            QueryCategory::Information => "information",
            QueryCategory::Predictive => "predictive",
            QueryCategory::Optimization => "optimization",
            QueryCategory::Monitoring => "monitoring",
        }
    }

    /// 이름으로 파싱 (대소문자 무시)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "invalid" => Some(QueryCategory::Invalid),
            "information" | "info" => Some(QueryCategory::Information),
            "predictive" | "prediction" => Some(QueryCategory::Predictive),
            "optimization" | "optimize" => Some(QueryCategory::Optimization),
            "monitoring" | "monitor" => Some(QueryCategory::Monitoring),
            _ => None,
        }
    }

    /// 액션이 반드시 필요한 카테고리인지
    pub fn requires_actionables(self) -> bool {
        matches!(self, QueryCategory::Optimization | QueryCategory::Monitoring)
    }
}

impl TryFrom<i64> for QueryCategory {
    type Error = CoreError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(QueryCategory::Invalid),
            1 => Ok(QueryCategory::Information),
            2 => Ok(QueryCategory::Predictive),
            3 => Ok(QueryCategory::Optimization),
            4 => Ok(QueryCategory::Monitoring),
            other => Err(CoreError::ContractViolation(format!(
                "카테고리 코드 범위 밖: {other} (0~4)"
            ))),
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// ExtractedParameters — 구조화 파라미터
// ============================================================

/// 리소스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Battery,
    Data,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Battery => "battery",
            ResourceType::Data => "data",
        }
    }
}

/// 지속 시간 단위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minutes,
    Hours,
    Days,
}

/// 지속 시간 ("3시간 더 버틸 수 있나")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDuration {
    pub value: u32,
    pub unit: DurationUnit,
}

impl UsageDuration {
    /// 시간 단위로 환산
    pub fn as_hours(&self) -> f64 {
        let value = f64::from(self.value);
        match self.unit {
            DurationUnit::Minutes => value / 60.0,
            DurationUnit::Hours => value,
            DurationUnit::Days => value * 24.0,
        }
    }
}

/// 기간 단위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Hour,
    Day,
    Week,
    Month,
}

/// 조회 기간 ("오늘", "지난 주")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub value: u32,
    pub unit: PeriodUnit,
}

impl TimePeriod {
    /// 시간 단위로 환산 (월은 30일)
    pub fn as_hours(&self) -> f64 {
        let value = f64::from(self.value);
        match self.unit {
            PeriodUnit::Hour => value,
            PeriodUnit::Day => value * 24.0,
            PeriodUnit::Week => value * 24.0 * 7.0,
            PeriodUnit::Month => value * 24.0 * 30.0,
        }
    }
}

/// 리소스 임계값. `data`는 항상 MB 단위.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// 배터리 잔량 (%)
    pub battery: Option<u32>,
    /// 데이터 사용량 (MB)
    pub data: Option<u64>,
}

/// 알림 조건 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    WhileUsing,
    ExceedsUsage,
    ReachesThreshold,
}

/// 질의에서 추출한 파라미터. 모든 필드는 "미지정"이 기본값이다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedParameters {
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub apps: BTreeSet<String>,
    #[serde(alias = "appCategories", skip_serializing_if = "BTreeSet::is_empty")]
    pub app_categories: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<UsageDuration>,
    #[serde(alias = "timePeriod", skip_serializing_if = "Option::is_none")]
    pub time_period: Option<TimePeriod>,
    #[serde(alias = "resourceType", skip_serializing_if = "BTreeSet::is_empty")]
    pub resource_type: BTreeSet<ResourceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(alias = "priorityApps", skip_serializing_if = "BTreeSet::is_empty")]
    pub priority_apps: BTreeSet<String>,
    #[serde(alias = "conditionType", skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<ConditionType>,
}

impl ExtractedParameters {
    /// 데이터 리소스가 대상에 포함되는지
    pub fn targets_data(&self) -> bool {
        self.resource_type.contains(&ResourceType::Data)
    }

    /// 주 리소스 — 데이터가 언급되면 Data, 아니면 Battery
    pub fn primary_resource(&self) -> ResourceType {
        if self.targets_data() {
            ResourceType::Data
        } else {
            ResourceType::Battery
        }
    }
}

// ============================================================
// QueryAnalysis — 분류 결과 (생성 후 불변)
// ============================================================

/// 질의 분류 결과. 카테고리는 생성 시 한 번만 결정된다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    category: QueryCategory,
    params: ExtractedParameters,
}

impl QueryAnalysis {
    pub fn new(category: QueryCategory, params: ExtractedParameters) -> Self {
        Self { category, params }
    }

    pub fn category(&self) -> QueryCategory {
        self.category
    }

    pub fn params(&self) -> &ExtractedParameters {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_codes_roundtrip() {
        for code in 0..=4 {
            let category = QueryCategory::try_from(code).unwrap();
            assert_eq!(category.code(), code);
        }
    }

    #[test]
    fn category_code_out_of_range_is_contract_violation() {
        let err = QueryCategory::try_from(7).unwrap_err();
        assert!(matches!(err, CoreError::ContractViolation(_)));
        assert!(QueryCategory::try_from(-1).is_err());
    }

    #[test]
    fn category_from_name_ignores_case() {
        assert_eq!(
            QueryCategory::from_name(" Monitoring "),
            Some(QueryCategory::Monitoring)
        );
        assert_eq!(QueryCategory::from_name("weather"), None);
    }

    #[test]
    fn params_accept_camel_case_aliases() {
        let json = r#"{
            "apps": ["TikTok"],
            "resourceType": ["data"],
            "thresholds": {"data": 500},
            "conditionType": "exceeds_usage",
            "timePeriod": {"value": 1, "unit": "day"}
        }"#;
        let params: ExtractedParameters = serde_json::from_str(json).unwrap();
        assert!(params.apps.contains("TikTok"));
        assert_eq!(params.primary_resource(), ResourceType::Data);
        assert_eq!(params.thresholds.unwrap().data, Some(500));
        assert_eq!(params.condition_type, Some(ConditionType::ExceedsUsage));
        assert_eq!(params.time_period.unwrap().as_hours(), 24.0);
    }

    #[test]
    fn empty_params_serialize_compactly() {
        let json = serde_json::to_string(&ExtractedParameters::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn primary_resource_defaults_to_battery() {
        let mut params = ExtractedParameters::default();
        assert_eq!(params.primary_resource(), ResourceType::Battery);
        params.resource_type.insert(ResourceType::Battery);
        assert_eq!(params.primary_resource(), ResourceType::Battery);
        params.resource_type.insert(ResourceType::Data);
        assert_eq!(params.primary_resource(), ResourceType::Data);
    }

    #[test]
    fn duration_converts_to_hours() {
        let d = UsageDuration {
            value: 90,
            unit: DurationUnit::Minutes,
        };
        assert!((d.as_hours() - 1.5).abs() < f64::EPSILON);
    }
}
