//! 응답 정규화기.
//!
//! 신뢰할 수 없는 모델 원문을 타입이 있는 `AnalysisResult`로 바꾼다.
//!
//! - 구조화 응답(`{ ... }`)이면 파싱, 아니면 원문을 인사이트 하나로 감싼다
//! - Information 카테고리는 액션을 무조건 무시
//! - 허용 목록 밖 액션 타입은 경고 로그 후 폐기
//! - Optimization/Monitoring인데 유효 액션이 없으면 결정적으로 합성
//!
//! 로깅 외 부수효과 없음.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use powerlens_core::config::AppConfig;
use powerlens_core::models::actionable::{Actionable, ActionableType, SYSTEM_PACKAGE};
use powerlens_core::models::insight::{Insight, InsightSeverity, InsightType};
use powerlens_core::models::query::{QueryCategory, ResourceType};
use powerlens_core::models::result::{AnalysisResult, EstimatedSavings, DEGRADED_MESSAGE};
use powerlens_core::models::telemetry::DeviceSnapshot;

use crate::json_extract::{extract_json_object, format_number, lenient_f64, non_empty_str};
use crate::keywords;
use crate::ranking::{self, RankingRules};

/// 카테고리 기본 인사이트 종류
pub fn default_insight_type(category: QueryCategory) -> InsightType {
    match category {
        QueryCategory::Predictive => InsightType::Prediction,
        QueryCategory::Optimization => InsightType::Optimization,
        QueryCategory::Monitoring => InsightType::Monitoring,
        QueryCategory::Information | QueryCategory::Invalid => InsightType::Information,
    }
}

fn default_insight_title(category: QueryCategory) -> &'static str {
    match category {
        QueryCategory::Predictive => "Prediction",
        QueryCategory::Optimization => "Optimization advice",
        QueryCategory::Monitoring => "Monitoring",
        QueryCategory::Information | QueryCategory::Invalid => "Usage information",
    }
}

/// 응답 정규화기
#[derive(Debug, Clone, Default)]
pub struct ResponseNormalizer {
    rules: RankingRules,
}

impl ResponseNormalizer {
    pub fn new(rules: RankingRules) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(RankingRules::from_config(config))
    }

    /// 원문 페이로드 → 결과. 항상 결과를 반환한다.
    pub fn normalize(
        &self,
        category: QueryCategory,
        raw_payload: &str,
        snapshot: &DeviceSnapshot,
        original_query: &str,
    ) -> AnalysisResult {
        let scores = ranking::compute_scores(snapshot);

        if category == QueryCategory::Invalid {
            debug!("Invalid 질의 — 저하 결과");
            let mut result = AnalysisResult::degraded(DEGRADED_MESSAGE);
            result.battery_score = scores.battery;
            result.data_score = scores.data;
            result.performance_score = scores.performance;
            return result;
        }

        let mut insights = Vec::new();
        let mut actionables = Vec::new();
        let mut score_overrides = Map::new();

        match extract_json_object(raw_payload) {
            Some(payload) => {
                insights = parse_insights(&payload, category);
                let proposed = payload.get("actionable").or_else(|| payload.get("actionables"));
                if category == QueryCategory::Information {
                    if proposed.and_then(Value::as_array).is_some_and(|a| !a.is_empty()) {
                        debug!("Information 응답의 액션 무시");
                    }
                } else if let Some(value) = proposed {
                    actionables = parse_actionables(value, snapshot);
                    if category == QueryCategory::Optimization {
                        actionables = drop_kept_apps(actionables, snapshot, original_query);
                    }
                }
                if insights.is_empty() {
                    if let Some(summary) = non_empty_str(&payload, &["summary", "answer", "message"]) {
                        insights.push(Insight::new(
                            default_insight_type(category),
                            default_insight_title(category),
                            summary,
                            InsightSeverity::Medium,
                        ));
                    }
                }
                for key in ["battery_score", "data_score", "performance_score"] {
                    if let Some(value) = payload.get(key) {
                        score_overrides.insert(key.to_string(), value.clone());
                    }
                }
            }
            None => {
                let text = raw_payload.trim();
                if !text.is_empty() {
                    debug!(text_len = text.len(), "비구조 응답 — 단일 인사이트로 변환");
                    insights.push(Insight::new(
                        default_insight_type(category),
                        default_insight_title(category),
                        text,
                        InsightSeverity::Medium,
                    ));
                }
            }
        }

        if category.requires_actionables() && actionables.is_empty() {
            let params = keywords::extract_parameters(original_query);
            actionables = ranking::synthesize_actionables(
                category,
                original_query,
                &params,
                snapshot,
                &self.rules,
            );
            debug!(
                category = %category,
                count = actionables.len(),
                "유효 액션 없음 — 결정적 합성"
            );
            if insights.is_empty() {
                let kept = ranking::excluded_packages(original_query, &params, snapshot);
                insights.push(ranking::action_summary(
                    category,
                    &params,
                    &actionables,
                    snapshot,
                    &kept,
                ));
            }
        }

        if insights.is_empty() {
            insights.push(Insight::new(
                InsightType::Information,
                "Information unavailable",
                DEGRADED_MESSAGE,
                InsightSeverity::Low,
            ));
        }

        if category == QueryCategory::Information && keywords::mentions_data(original_query) {
            insights = insights
                .into_iter()
                .map(|insight| insight.retagged(InsightType::Data))
                .collect();
        }

        let score = |key: &str, computed: u8| -> u8 {
            score_overrides
                .get(key)
                .and_then(lenient_f64)
                .filter(|v| (0.0..=100.0).contains(v))
                .map_or(computed, |v| v.round() as u8)
        };

        AnalysisResult {
            estimated_savings: EstimatedSavings::from_actionables(&actionables),
            battery_score: score("battery_score", scores.battery),
            data_score: score("data_score", scores.data),
            performance_score: score("performance_score", scores.performance),
            insights,
            actionables,
        }
    }
}

/// 사용자가 유지하라고 한 앱("keep X", "except X")을 대상으로 한 모델 액션 제거
fn drop_kept_apps(
    actionables: Vec<Actionable>,
    snapshot: &DeviceSnapshot,
    query: &str,
) -> Vec<Actionable> {
    let priority_apps = keywords::extract_parameters(query).priority_apps;
    if priority_apps.is_empty() {
        return actionables;
    }

    let is_kept = |package: &str| {
        priority_apps.iter().any(|name| {
            package.eq_ignore_ascii_case(name)
                || snapshot
                    .find_app_by_name(name)
                    .is_some_and(|app| app.package_name.eq_ignore_ascii_case(package))
        })
    };

    actionables
        .into_iter()
        .filter(|actionable| {
            let kept = is_kept(actionable.package_name());
            if kept {
                warn!(
                    action = %actionable.actionable_type(),
                    package = actionable.package_name(),
                    "유지 요청된 앱을 대상으로 한 액션 폐기"
                );
            }
            !kept
        })
        .collect()
}

// ============================================================
// 인사이트 파싱
// ============================================================

fn parse_insights(payload: &Map<String, Value>, category: QueryCategory) -> Vec<Insight> {
    let Some(items) = payload.get("insights").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) if !text.trim().is_empty() => Some(Insight::new(
                default_insight_type(category),
                default_insight_title(category),
                text.trim(),
                InsightSeverity::Medium,
            )),
            Value::Object(map) => {
                let title = non_empty_str(map, &["title"]);
                let description = non_empty_str(map, &["description", "text", "detail"]);
                if title.is_none() && description.is_none() {
                    warn!("제목/설명 없는 인사이트 폐기");
                    return None;
                }
                let insight_type = map
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(InsightType::from_wire)
                    .unwrap_or_else(|| default_insight_type(category));
                let severity = map
                    .get("severity")
                    .and_then(Value::as_str)
                    .and_then(InsightSeverity::from_wire)
                    .unwrap_or_default();
                Some(Insight::new(
                    insight_type,
                    title.unwrap_or(default_insight_title(category)),
                    description.or(title).unwrap_or_default(),
                    severity,
                ))
            }
            _ => None,
        })
        .collect()
}

// ============================================================
// 액션 파싱 + 허용 목록 검증
// ============================================================

/// 모델이 제안한 액션 배열을 검증한다. 잘못된 요소는 로그 후 폐기.
fn parse_actionables(value: &Value, snapshot: &DeviceSnapshot) -> Vec<Actionable> {
    let Some(items) = value.as_array() else {
        warn!("actionable 필드가 배열이 아님 — 무시");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let Some(map) = item.as_object() else {
                warn!("객체가 아닌 액션 요소 폐기");
                return None;
            };
            parse_actionable(map, snapshot)
        })
        .collect()
}

fn parse_actionable(map: &Map<String, Value>, snapshot: &DeviceSnapshot) -> Option<Actionable> {
    let raw_type = non_empty_str(map, &["type", "action", "action_type"]).unwrap_or_default();
    let Some((actionable_type, resource_hint)) = ActionableType::from_wire(raw_type) else {
        warn!(raw_type, "허용 목록 밖 액션 타입 폐기");
        return None;
    };

    let package_name = match non_empty_str(map, &["package_name", "packageName", "package"]) {
        // 모델이 표시 이름을 넣은 경우 스냅샷의 패키지로 해석
        Some(name) => snapshot
            .find_app_by_name(name)
            .map_or_else(|| name.to_string(), |app| app.package_name.clone()),
        None if !actionable_type.requires_package() => SYSTEM_PACKAGE.to_string(),
        None => {
            warn!(actionable_type = %actionable_type, "패키지 이름 없는 액션 폐기");
            return None;
        }
    };

    let description = non_empty_str(map, &["description", "title"])
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} for {}", actionable_type, package_name));

    let mut actionable = Actionable::new(actionable_type, package_name, description);

    if let Some(reason) = non_empty_str(map, &["reason"]) {
        actionable = actionable.with_reason(reason);
    }
    if let Some(mode) = non_empty_str(map, &["new_mode", "newMode"]) {
        actionable = actionable.with_new_mode(mode);
    }
    if let Some(minutes) = map
        .get("estimated_battery_savings")
        .or_else(|| map.get("estimated_battery_savings_minutes"))
        .and_then(lenient_f64)
        .filter(|v| *v >= 0.0)
    {
        actionable = actionable.with_battery_savings(minutes);
    }
    if let Some(megabytes) = map
        .get("estimated_data_savings")
        .or_else(|| map.get("estimated_data_savings_mb"))
        .and_then(lenient_f64)
        .filter(|v| *v >= 0.0)
    {
        actionable = actionable.with_data_savings(megabytes);
    }
    let severity = map
        .get("severity")
        .and_then(lenient_f64)
        .map_or(Actionable::DEFAULT_SEVERITY, |v| {
            v.round().clamp(1.0, 5.0) as u8
        });
    actionable = actionable.with_severity(severity);
    if let Some(level) = map
        .get("throttle_level")
        .or_else(|| map.get("throttleLevel"))
        .and_then(lenient_f64)
    {
        actionable = actionable.with_throttle_level(level.round() as i32);
    }
    if let Some(enabled) = map.get("enabled").and_then(Value::as_bool) {
        actionable = actionable.with_enabled(enabled);
    }

    if let Some(Value::Object(extra)) = map.get("parameters") {
        for (key, value) in extra {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            actionable = actionable.with_parameter(key.clone(), text);
        }
    }

    let mut resource = resource_hint.or_else(|| {
        actionable
            .parameter("resource_type")
            .and_then(|r| match r.trim().to_ascii_lowercase().as_str() {
                "battery" => Some(ResourceType::Battery),
                "data" => Some(ResourceType::Data),
                _ => None,
            })
    });

    if let Some(threshold) = map.get("threshold").and_then(lenient_f64) {
        actionable = actionable.with_parameter("threshold", format_number(threshold));
        resource.get_or_insert(ResourceType::Battery);
    }
    let threshold_mb = map.get("threshold_mb").and_then(|value| match value {
        Value::String(s) => keywords::parse_data_size_mb(s),
        other => lenient_f64(other),
    });
    if let Some(megabytes) = threshold_mb {
        actionable = actionable.with_parameter("threshold_mb", format_number(megabytes.round()));
        resource.get_or_insert(ResourceType::Data);
    }

    if actionable_type == ActionableType::SetAlert {
        if let Some(resource) = resource {
            actionable = actionable.with_parameter("resource_type", resource.as_str());
        }
    }

    Some(actionable)
}
