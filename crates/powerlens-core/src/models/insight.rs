//! 인사이트 모델.
//!
//! 표시 계층과 무관한 읽기 전용 사실/설명 항목.

use serde::{Deserialize, Serialize};

use super::query::ResourceType;

/// 인사이트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Battery,
    Data,
    Information,
    Prediction,
    Optimization,
    Monitoring,
}

impl InsightType {
    /// 모델 응답 문자열 파싱 (닫힌 집합 밖이면 None)
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "battery" => Some(InsightType::Battery),
            "data" => Some(InsightType::Data),
            "information" | "info" => Some(InsightType::Information),
            "prediction" | "predictive" => Some(InsightType::Prediction),
            "optimization" => Some(InsightType::Optimization),
            "monitoring" => Some(InsightType::Monitoring),
            _ => None,
        }
    }
}

impl From<ResourceType> for InsightType {
    fn from(resource: ResourceType) -> Self {
        match resource {
            ResourceType::Battery => InsightType::Battery,
            ResourceType::Data => InsightType::Data,
        }
    }
}

/// 인사이트 심각도
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Low,
    #[default]
    Medium,
    High,
}

impl InsightSeverity {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(InsightSeverity::Low),
            "medium" | "moderate" => Some(InsightSeverity::Medium),
            "high" | "critical" => Some(InsightSeverity::High),
            _ => None,
        }
    }
}

/// 읽기 전용 인사이트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub severity: InsightSeverity,
}

impl Insight {
    pub fn new(
        insight_type: InsightType,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: InsightSeverity,
    ) -> Self {
        Self {
            insight_type,
            title: title.into(),
            description: description.into(),
            severity,
        }
    }

    /// 종류만 바꾼 복제본
    pub fn retagged(mut self, insight_type: InsightType) -> Self {
        self.insight_type = insight_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insight_serializes_type_field() {
        let insight = Insight::new(
            InsightType::Data,
            "Top apps",
            "YouTube used 450 MB",
            InsightSeverity::Low,
        );
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["type"], "data");
        assert_eq!(json["severity"], "low");
    }

    #[test]
    fn wire_parsing_is_closed() {
        assert_eq!(InsightType::from_wire("BATTERY"), Some(InsightType::Battery));
        assert_eq!(InsightType::from_wire("weather"), None);
        assert_eq!(
            InsightSeverity::from_wire("critical"),
            Some(InsightSeverity::High)
        );
        assert_eq!(InsightSeverity::from_wire("urgent"), None);
    }
}
