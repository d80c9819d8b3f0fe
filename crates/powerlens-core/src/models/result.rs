//! 파이프라인 최종 결과 모델.

use serde::{Deserialize, Serialize};

use super::actionable::Actionable;
use super::insight::{Insight, InsightSeverity, InsightType};

/// 기본 저하(degraded) 메시지
pub const DEGRADED_MESSAGE: &str = "Could not retrieve the requested information";

/// 예상 절감량
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimatedSavings {
    /// 배터리 (분)
    pub battery_minutes: f64,
    /// 데이터 (MB)
    pub data_mb: f64,
}

impl EstimatedSavings {
    /// 액션 목록의 예상 절감량 합계
    pub fn from_actionables(actionables: &[Actionable]) -> Self {
        actionables.iter().fold(Self::default(), |acc, a| Self {
            battery_minutes: acc.battery_minutes
                + a.estimated_battery_savings_minutes().unwrap_or(0.0),
            data_mb: acc.data_mb + a.estimated_data_savings_mb().unwrap_or(0.0),
        })
    }
}

/// 한 번의 파이프라인 실행 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub insights: Vec<Insight>,
    pub actionables: Vec<Actionable>,
    /// 배터리 점수 (0~100)
    pub battery_score: u8,
    /// 데이터 점수 (0~100)
    pub data_score: u8,
    /// 종합 성능 점수 (0~100)
    pub performance_score: u8,
    pub estimated_savings: EstimatedSavings,
}

impl AnalysisResult {
    /// 저하된 정보성 결과 (액션 없음)
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            insights: vec![Insight::new(
                InsightType::Information,
                "Information unavailable",
                message,
                InsightSeverity::Low,
            )],
            actionables: Vec::new(),
            battery_score: 0,
            data_score: 0,
            performance_score: 0,
            estimated_savings: EstimatedSavings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actionable::ActionableType;

    #[test]
    fn savings_sum_over_actionables() {
        let actionables = vec![
            Actionable::new(ActionableType::SetStandbyBucket, "a", "x").with_battery_savings(30.0),
            Actionable::new(ActionableType::RestrictBackgroundData, "b", "y")
                .with_data_savings(120.5),
            Actionable::new(ActionableType::SetAlert, "system", "z"),
        ];
        let savings = EstimatedSavings::from_actionables(&actionables);
        assert!((savings.battery_minutes - 30.0).abs() < f64::EPSILON);
        assert!((savings.data_mb - 120.5).abs() < f64::EPSILON);
    }

    #[test]
    fn degraded_has_no_actionables() {
        let result = AnalysisResult::degraded(DEGRADED_MESSAGE);
        assert!(result.actionables.is_empty());
        assert_eq!(result.insights.len(), 1);
        assert_eq!(result.insights[0].description, DEGRADED_MESSAGE);
    }
}
