//! 오프라인 분석기.
//!
//! LLM 백엔드가 없거나 실패/타임아웃일 때 스냅샷만으로 결과를 계산한다.
//! 액션 합성은 정규화기와 같은 `ranking` 규칙을 사용한다.

use powerlens_core::config::AppConfig;
use powerlens_core::models::insight::{Insight, InsightSeverity, InsightType};
use powerlens_core::models::query::{QueryAnalysis, QueryCategory, ResourceType};
use powerlens_core::models::result::{AnalysisResult, EstimatedSavings, DEGRADED_MESSAGE};
use powerlens_core::models::telemetry::DeviceSnapshot;

use crate::keywords;
use crate::ranking::{self, RankingRules};

/// 수집기가 소모율을 주지 않을 때의 기본값 (%/h)
pub const DEFAULT_DRAIN_PERCENT_PER_HOUR: f64 = 8.0;

/// 데이터 예측 기본 관측 기간 / 예측 기간 (시간)
const DEFAULT_DATA_WINDOW_HOURS: f64 = 24.0;

/// 오프라인 분석기
#[derive(Debug, Clone, Default)]
pub struct OfflineAnalyzer {
    rules: RankingRules,
}

impl OfflineAnalyzer {
    pub fn new(rules: RankingRules) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(RankingRules::from_config(config))
    }

    /// 모델 없이 결과 계산
    pub fn analyze(
        &self,
        analysis: &QueryAnalysis,
        snapshot: &DeviceSnapshot,
        query: &str,
    ) -> AnalysisResult {
        let category = analysis.category();
        let params = analysis.params();

        let (insights, actionables) = match category {
            QueryCategory::Invalid => (vec![degraded_insight()], Vec::new()),
            QueryCategory::Information => {
                let resource = if keywords::mentions_data(query) {
                    ResourceType::Data
                } else {
                    params.primary_resource()
                };
                let n = params
                    .limit
                    .map(|n| n as usize)
                    .unwrap_or(self.rules.default_top_n);
                let insight = if snapshot.is_empty() {
                    degraded_insight().retagged(resource.into())
                } else {
                    ranking::top_usage_insight(snapshot, resource, n)
                };
                (vec![insight], Vec::new())
            }
            QueryCategory::Predictive => (vec![self.predict(analysis, snapshot)], Vec::new()),
            QueryCategory::Optimization | QueryCategory::Monitoring => {
                // 정규화기 합성 경로와 같은 파라미터 (질의 텍스트 기준)
                let synthesis_params = keywords::extract_parameters(query);
                let actionables = ranking::synthesize_actionables(
                    category,
                    query,
                    &synthesis_params,
                    snapshot,
                    &self.rules,
                );
                let kept = ranking::excluded_packages(query, &synthesis_params, snapshot);
                let summary = ranking::action_summary(
                    category,
                    &synthesis_params,
                    &actionables,
                    snapshot,
                    &kept,
                );
                (vec![summary], actionables)
            }
        };

        let scores = ranking::compute_scores(snapshot);
        AnalysisResult {
            estimated_savings: EstimatedSavings::from_actionables(&actionables),
            insights,
            actionables,
            battery_score: scores.battery,
            data_score: scores.data,
            performance_score: scores.performance,
        }
    }

    fn predict(&self, analysis: &QueryAnalysis, snapshot: &DeviceSnapshot) -> Insight {
        match analysis.params().primary_resource() {
            ResourceType::Battery => predict_battery(analysis, snapshot),
            ResourceType::Data => predict_data(analysis, snapshot),
        }
    }
}

fn degraded_insight() -> Insight {
    Insight::new(
        InsightType::Information,
        "Information unavailable",
        DEGRADED_MESSAGE,
        InsightSeverity::Low,
    )
}

fn predict_battery(analysis: &QueryAnalysis, snapshot: &DeviceSnapshot) -> Insight {
    let battery = &snapshot.battery;
    if battery.is_charging {
        return Insight::new(
            InsightType::Prediction,
            "Battery outlook",
            format!(
                "Yes. The device is charging at {}%, so the battery will not run out.",
                battery.level_percent
            ),
            InsightSeverity::Low,
        );
    }

    let drain = battery
        .drain_percent_per_hour
        .filter(|d| *d > 0.0)
        .unwrap_or(DEFAULT_DRAIN_PERCENT_PER_HOUR);
    let hours_left = f64::from(battery.level_percent) / drain;
    let estimate = format!(
        "At about {drain:.1}%/h, {}% battery lasts roughly {hours_left:.1} hours.",
        battery.level_percent
    );

    let requested = analysis
        .params()
        .duration
        .map(|d| d.as_hours())
        .or_else(|| analysis.params().time_period.map(|p| p.as_hours()));

    let (description, severity) = match requested {
        Some(needed) if hours_left >= needed => (
            format!("Yes. {estimate} That covers the requested {needed:.1} hours."),
            InsightSeverity::Low,
        ),
        Some(needed) => (
            format!(
                "No. {estimate} That falls {:.1} hours short of the requested {needed:.1} hours.",
                needed - hours_left
            ),
            InsightSeverity::High,
        ),
        None if hours_left < 2.0 => (estimate, InsightSeverity::High),
        None => (estimate, InsightSeverity::Medium),
    };

    Insight::new(InsightType::Prediction, "Battery outlook", description, severity)
}

fn predict_data(analysis: &QueryAnalysis, snapshot: &DeviceSnapshot) -> Insight {
    let params = analysis.params();
    let observed_hours = params
        .time_period
        .map(|p| p.as_hours())
        .unwrap_or(DEFAULT_DATA_WINDOW_HOURS);
    let used_mb: f64 = snapshot.apps.iter().map(|app| app.total_mb()).sum();
    let rate = used_mb / observed_hours;
    let horizon = params
        .duration
        .map(|d| d.as_hours())
        .unwrap_or(DEFAULT_DATA_WINDOW_HOURS);
    let projected = rate * horizon;

    let estimate = format!(
        "At about {rate:.1} MB/h you would use roughly {projected:.0} MB over the next {horizon:.1} hours."
    );

    let (description, severity) = match snapshot.network.data_limit_mb {
        Some(limit) => {
            let remaining = (limit - used_mb).max(0.0);
            if projected <= remaining {
                (
                    format!("Yes. {estimate} About {remaining:.0} MB of your plan remains."),
                    InsightSeverity::Low,
                )
            } else {
                (
                    format!("No. {estimate} Only about {remaining:.0} MB of your plan remains."),
                    InsightSeverity::High,
                )
            }
        }
        None => (
            format!("{estimate} No data plan limit is known for this device."),
            InsightSeverity::Medium,
        ),
    };

    Insight::new(InsightType::Prediction, "Data outlook", description, severity)
}
