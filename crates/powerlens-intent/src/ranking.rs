//! 결정적 순위/합성 규칙.
//!
//! 모델 응답에 액션이 없을 때(정규화기)와 모델 없이 계산할 때(오프라인 분석기)
//! 같은 함수를 사용하므로 두 경로의 액션 집합과 순위가 일치한다.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use powerlens_core::config::{AlertDefaults, AppConfig};
use powerlens_core::models::actionable::{Actionable, ActionableType, SYSTEM_PACKAGE};
use powerlens_core::models::insight::{Insight, InsightSeverity, InsightType};
use powerlens_core::models::query::{ExtractedParameters, QueryCategory, ResourceType};
use powerlens_core::models::telemetry::{bytes_to_mb, AppUsage, DeviceSnapshot};

use crate::json_extract::format_number;
use crate::keywords;

/// 대기 버킷 제한 모드
pub const RESTRICTED_BUCKET: &str = "restricted";

/// 배터리 1%당 예상 절감 분 (10시간 사용 기준, 제한 시 절반 절감)
const BATTERY_MINUTES_PER_PERCENT: f64 = 3.0;

/// 공유 토큰으로 인정하는 최소 길이
const MIN_SHARED_TOKEN_LEN: usize = 4;

/// 점수 계산에 쓰는 상위 앱 수
const SCORE_TOP_APPS: usize = 3;

/// 백그라운드 데이터 20MB당 데이터 점수 1점 감점
const DATA_SCORE_MB_PER_POINT: f64 = 20.0;

/// 저전력 감점 기준 (%)
const LOW_BATTERY_PERCENT: u8 = 20;

/// 합성 규칙 파라미터
#[derive(Debug, Clone)]
pub struct RankingRules {
    pub alert_defaults: AlertDefaults,
    pub default_top_n: usize,
    pub optimization_top_n: usize,
}

impl RankingRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            alert_defaults: config.alerts.clone(),
            default_top_n: config.pipeline.default_top_n as usize,
            optimization_top_n: config.pipeline.optimization_top_n as usize,
        }
    }
}

impl Default for RankingRules {
    fn default() -> Self {
        Self::from_config(&AppConfig::default_config())
    }
}

// ============================================================
// 제외 앱 / 순위
// ============================================================

/// 사용자가 제한하지 않기를 원하는 앱의 패키지 집합.
///
/// 질의에 이름이나 패키지가 등장하거나, 이름이 질의와 4자 이상 토큰을 공유하거나,
/// 우선 앱으로 추출된 앱.
pub fn excluded_packages(
    query: &str,
    params: &ExtractedParameters,
    snapshot: &DeviceSnapshot,
) -> BTreeSet<String> {
    let lower = query.to_lowercase();
    let query_tokens: BTreeSet<String> = keywords::tokens(query)
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_SHARED_TOKEN_LEN)
        .collect();

    snapshot
        .apps
        .iter()
        .filter(|app| {
            let named = (!app.app_name.is_empty() && lower.contains(&app.app_name.to_lowercase()))
                || (!app.package_name.is_empty()
                    && lower.contains(&app.package_name.to_lowercase()));
            let shares_token = keywords::tokens(&app.app_name)
                .iter()
                .any(|t| query_tokens.contains(t));
            let prioritized = params.priority_apps.iter().any(|p| {
                app.app_name.eq_ignore_ascii_case(p) || app.package_name.eq_ignore_ascii_case(p)
            });
            named || shares_token || prioritized
        })
        .map(|app| app.package_name.clone())
        .collect()
}

/// 리소스별 사용량 지표 (배터리 %, 또는 백그라운드 바이트)
pub fn usage_metric(app: &AppUsage, resource: ResourceType) -> f64 {
    match resource {
        ResourceType::Battery => app.battery_usage_percent,
        ResourceType::Data => app.background_bytes as f64,
    }
}

fn by_usage_desc(a: &AppUsage, b: &AppUsage, metric: impl Fn(&AppUsage) -> f64) -> Ordering {
    metric(b)
        .partial_cmp(&metric(a))
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.package_name.cmp(&b.package_name))
}

/// 제외 앱을 뺀 나머지를 사용량 내림차순으로 (동률은 패키지 이름순, 사용량 0은 제외)
pub fn rank_for_optimization<'a>(
    snapshot: &'a DeviceSnapshot,
    resource: ResourceType,
    excluded: &BTreeSet<String>,
) -> Vec<&'a AppUsage> {
    let mut ranked: Vec<&AppUsage> = snapshot
        .apps
        .iter()
        .filter(|app| !excluded.contains(&app.package_name))
        .filter(|app| usage_metric(app, resource) > 0.0)
        .collect();
    ranked.sort_by(|a, b| by_usage_desc(a, b, |app| usage_metric(app, resource)));
    ranked
}

// ============================================================
// 액션 합성
// ============================================================

fn battery_severity(percent: f64) -> u8 {
    match percent {
        p if p >= 20.0 => 5,
        p if p >= 10.0 => 4,
        p if p >= 5.0 => 3,
        _ => 2,
    }
}

fn data_severity(megabytes: f64) -> u8 {
    match megabytes {
        mb if mb >= 500.0 => 5,
        mb if mb >= 200.0 => 4,
        mb if mb >= 50.0 => 3,
        _ => 2,
    }
}

fn display_name(app: &AppUsage) -> &str {
    if app.app_name.is_empty() {
        &app.package_name
    } else {
        &app.app_name
    }
}

/// 최적화 액션: 상위 N개 앱에 SetStandbyBucket(배터리) 또는 RestrictBackgroundData(데이터)
pub fn optimization_actionables(
    query: &str,
    params: &ExtractedParameters,
    snapshot: &DeviceSnapshot,
    top_n: usize,
) -> Vec<Actionable> {
    let resource = params.primary_resource();
    let excluded = excluded_packages(query, params, snapshot);

    rank_for_optimization(snapshot, resource, &excluded)
        .into_iter()
        .take(top_n)
        .map(|app| match resource {
            ResourceType::Battery => Actionable::new(
                ActionableType::SetStandbyBucket,
                app.package_name.clone(),
                format!("Restrict background activity of {}", display_name(app)),
            )
            .with_reason(format!(
                "{} used {:.1}% of battery",
                display_name(app),
                app.battery_usage_percent
            ))
            .with_new_mode(RESTRICTED_BUCKET)
            .with_battery_savings(app.battery_usage_percent * BATTERY_MINUTES_PER_PERCENT)
            .with_severity(battery_severity(app.battery_usage_percent))
            .with_parameter("resource_type", ResourceType::Battery.as_str()),
            ResourceType::Data => {
                let background_mb = app.background_mb();
                Actionable::new(
                    ActionableType::RestrictBackgroundData,
                    app.package_name.clone(),
                    format!("Restrict background data for {}", display_name(app)),
                )
                .with_reason(format!(
                    "{} used {:.1} MB in the background",
                    display_name(app),
                    background_mb
                ))
                .with_data_savings(background_mb)
                .with_severity(data_severity(background_mb))
                .with_parameter("resource_type", ResourceType::Data.as_str())
            }
        })
        .collect()
}

/// 모니터링 액션: 언급된 리소스마다 SetAlert 하나
pub fn monitoring_actionables(
    query: &str,
    params: &ExtractedParameters,
    snapshot: &DeviceSnapshot,
    defaults: &AlertDefaults,
) -> Vec<Actionable> {
    let text_battery = keywords::battery_threshold_percent(query);
    let text_data = keywords::data_threshold_mb(query);

    let mut resources = params.resource_type.clone();
    if text_battery.is_some() {
        resources.insert(ResourceType::Battery);
    }
    if text_data.is_some() {
        resources.insert(ResourceType::Data);
    }
    if resources.is_empty() {
        resources.insert(ResourceType::Battery);
    }

    let app = snapshot.find_app_mentioned_in(query).or_else(|| {
        params
            .apps
            .iter()
            .find_map(|name| snapshot.find_app_by_name(name))
    });
    let package = app.map_or(SYSTEM_PACKAGE, |a| a.package_name.as_str());
    let subject = app.map(display_name);

    resources
        .into_iter()
        .map(|resource| match resource {
            ResourceType::Battery => {
                let threshold = text_battery
                    .or(params.thresholds.and_then(|t| t.battery))
                    .unwrap_or(defaults.battery_threshold_percent);
                let description = match subject {
                    Some(name) => {
                        format!("Alert when battery drops to {threshold}% while using {name}")
                    }
                    None => format!("Alert when battery drops to {threshold}%"),
                };
                Actionable::new(ActionableType::SetAlert, package, description)
                    .with_reason("Battery threshold requested")
                    .with_parameter("resource_type", ResourceType::Battery.as_str())
                    .with_parameter("threshold", threshold.to_string())
            }
            ResourceType::Data => {
                let threshold_mb = text_data
                    .or(params.thresholds.and_then(|t| t.data))
                    .unwrap_or(defaults.data_threshold_mb);
                let description = match subject {
                    Some(name) => format!("Alert when {name} data usage exceeds {threshold_mb} MB"),
                    None => format!("Alert when data usage exceeds {threshold_mb} MB"),
                };
                Actionable::new(ActionableType::SetAlert, package, description)
                    .with_reason("Data usage threshold requested")
                    .with_parameter("resource_type", ResourceType::Data.as_str())
                    .with_parameter("threshold_mb", threshold_mb.to_string())
            }
        })
        .collect()
}

/// 카테고리에 필요한 액션 합성 (Optimization / Monitoring 외에는 빈 목록)
pub fn synthesize_actionables(
    category: QueryCategory,
    query: &str,
    params: &ExtractedParameters,
    snapshot: &DeviceSnapshot,
    rules: &RankingRules,
) -> Vec<Actionable> {
    match category {
        QueryCategory::Optimization => {
            optimization_actionables(query, params, snapshot, rules.optimization_top_n)
        }
        QueryCategory::Monitoring => {
            monitoring_actionables(query, params, snapshot, &rules.alert_defaults)
        }
        _ => Vec::new(),
    }
}

/// 합성된 액션을 설명하는 요약 인사이트
pub fn action_summary(
    category: QueryCategory,
    params: &ExtractedParameters,
    actionables: &[Actionable],
    snapshot: &DeviceSnapshot,
    kept: &BTreeSet<String>,
) -> Insight {
    let resource = params.primary_resource();
    match category {
        QueryCategory::Monitoring => {
            let description = if actionables.is_empty() {
                "No alert could be configured for this request.".to_string()
            } else {
                actionables
                    .iter()
                    .map(Actionable::description)
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            Insight::new(
                InsightType::Monitoring,
                "Usage alerts",
                description,
                InsightSeverity::Low,
            )
        }
        _ => {
            let names: Vec<&str> = actionables
                .iter()
                .map(|a| {
                    snapshot
                        .apps
                        .iter()
                        .find(|app| app.package_name == a.package_name())
                        .map_or(a.package_name(), display_name)
                })
                .collect();
            let mut description = if names.is_empty() {
                "No apps with significant usage were found to restrict.".to_string()
            } else {
                format!(
                    "Restricting the top {} {} consumers: {}.",
                    names.len(),
                    resource.as_str(),
                    names.join(", ")
                )
            };
            let kept_names: Vec<&str> = snapshot
                .apps
                .iter()
                .filter(|app| kept.contains(&app.package_name))
                .map(display_name)
                .collect();
            if !kept_names.is_empty() {
                description.push_str(&format!(" Kept unrestricted: {}.", kept_names.join(", ")));
            }
            let title = match resource {
                ResourceType::Battery => "Battery optimization plan",
                ResourceType::Data => "Data optimization plan",
            };
            let severity = if names.is_empty() {
                InsightSeverity::Low
            } else {
                InsightSeverity::Medium
            };
            Insight::new(InsightType::Optimization, title, description, severity)
        }
    }
}

// ============================================================
// 정보성 순위
// ============================================================

/// 리소스 상위 N개 앱 인사이트. 데이터는 전체 바이트 기준.
pub fn top_usage_insight(snapshot: &DeviceSnapshot, resource: ResourceType, n: usize) -> Insight {
    let mut apps: Vec<&AppUsage> = snapshot.apps.iter().collect();
    match resource {
        ResourceType::Battery => {
            apps.sort_by(|a, b| by_usage_desc(a, b, |app| app.battery_usage_percent))
        }
        ResourceType::Data => apps.sort_by(|a, b| by_usage_desc(a, b, |app| app.total_bytes() as f64)),
    }
    apps.truncate(n);

    let shown = if apps.is_empty() { n } else { apps.len() };
    let title = match resource {
        ResourceType::Battery => format!("Top {shown} battery-consuming apps"),
        ResourceType::Data => format!("Top {shown} data-consuming apps"),
    };

    if apps.is_empty() {
        return Insight::new(
            resource.into(),
            title,
            "No per-app usage data is available.",
            InsightSeverity::Low,
        );
    }

    let description = apps
        .iter()
        .enumerate()
        .map(|(i, app)| match resource {
            ResourceType::Battery => {
                format!("{}. {}: {:.1}%", i + 1, display_name(app), app.battery_usage_percent)
            }
            ResourceType::Data => format!(
                "{}. {}: {} MB",
                i + 1,
                display_name(app),
                format_number((bytes_to_mb(app.total_bytes()) * 10.0).round() / 10.0)
            ),
        })
        .collect::<Vec<_>>()
        .join("\n");

    Insight::new(resource.into(), title, description, InsightSeverity::Medium)
}

// ============================================================
// 점수
// ============================================================

/// 배터리/데이터/종합 점수 (0~100)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scores {
    pub battery: u8,
    pub data: u8,
    pub performance: u8,
}

fn clamp_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// 스냅샷 기준 점수
pub fn compute_scores(snapshot: &DeviceSnapshot) -> Scores {
    let mut battery_usage: Vec<f64> = snapshot
        .apps
        .iter()
        .map(|app| app.battery_usage_percent.max(0.0))
        .collect();
    battery_usage.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    let top_drain: f64 = battery_usage.iter().take(SCORE_TOP_APPS).sum();

    let mut battery = 100.0 - top_drain;
    if !snapshot.battery.is_charging && snapshot.battery.level_percent < LOW_BATTERY_PERCENT {
        battery -= 10.0;
    }
    let battery = clamp_score(battery);

    let data = clamp_score(100.0 - snapshot.total_background_mb() / DATA_SCORE_MB_PER_POINT);
    let performance = clamp_score((f64::from(battery) + f64::from(data)) / 2.0);

    Scores {
        battery,
        data,
        performance,
    }
}
