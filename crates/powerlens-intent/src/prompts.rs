//! 고정 프롬프트 템플릿.
//!
//! 분류 지시문 1개와 카테고리별 추천 지시문 4개. 프로세스 전역 `&'static str` 상수이며
//! 변경되지 않는다.

use powerlens_core::models::query::QueryCategory;

/// 분류 지시문. `{query}` 자리에 사용자 질의가 들어간다.
pub const CLASSIFICATION_TEMPLATE: &str = r#"Classify the following question about a phone's battery or data usage.

Categories:
- "information": asks for facts about current or past usage (which apps, how much, top N).
- "predictive": asks whether the battery or data will last, or how long something can be done.
- "optimization": asks to save, reduce, preserve or optimize battery or data.
- "monitoring": asks to be notified, alerted or warned when a condition happens.
- "invalid": not about battery or data usage at all.

Respond with a single JSON object and nothing else:
{
  "category": "<information|predictive|optimization|monitoring|invalid>",
  "parameters": {
    "apps": ["<app names mentioned>"],
    "app_categories": ["<e.g. social, video>"],
    "duration": {"value": <int>, "unit": "<minutes|hours|days>"},
    "time_period": {"value": <int>, "unit": "<hour|day|week|month>"},
    "resource_type": ["<battery|data>"],
    "thresholds": {"battery": <percent>, "data": <megabytes>},
    "limit": <int>,
    "context": "<short free-text context>",
    "priority_apps": ["<apps the user wants to keep running>"],
    "condition_type": "<while_using|exceeds_usage|reaches_threshold>"
  }
}
Omit any parameter that is not specified. Data thresholds are always in megabytes (1 GB = 1000 MB).

Question: {query}"#;

/// 정보 질의 지시문
pub const INFORMATION_INSTRUCTIONS: &str = "\
This is an INFORMATION request. Answer with facts only.
- Do NOT include any actionable, recommendation or suggested action. The \"actionable\" array must be empty.
- If the user asks for a top N list, return exactly N apps ranked in descending order of usage. \
If N is not specified, use {top_n}.
- Use the per-app numbers from the device snapshot. Do not invent apps.
- If the user asks about data, label every insight with type \"data\".";

/// 예측 질의 지시문
pub const PREDICTIVE_INSTRUCTIONS: &str = "\
This is a PREDICTIVE request.
- Start the first insight with a clear yes or no verdict.
- Give a time estimate (hours remaining for battery, megabytes remaining for data) based on the \
current level, drain rate and usage in the snapshot.
- If the answer is no, you may add up to 3 actionables that would make it a yes.";

/// 최적화 질의 지시문
pub const OPTIMIZATION_INSTRUCTIONS: &str = "\
This is an OPTIMIZATION request.
- Provide 3 to 5 ranked, high-impact actionables, most impactful first.
- Apps explicitly named or implied in the question as ones to keep (\"keep X\", \"except X\") \
must NOT be restricted, killed or throttled.
- Prefer set_standby_bucket for battery and restrict_background_data for data.
- Estimate savings per actionable when possible.";

/// 모니터링 질의 지시문
pub const MONITORING_INSTRUCTIONS: &str = "\
This is a MONITORING request.
- Create exactly one set_alert actionable per resource mentioned (battery and/or data).
- Battery alerts carry \"threshold\" as a percent; data alerts carry \"threshold_mb\" in megabytes \
(1 GB = 1000 MB).
- If a specific app is mentioned, use its package_name from the snapshot; otherwise use \"system\".
- Use the threshold from the question; default to {battery_threshold}% for battery and \
{data_threshold} MB for data.";

/// 응답 형식 계약 (모든 추천 프롬프트 끝에 붙는다)
pub const OUTPUT_CONTRACT: &str = r#"Respond with a single JSON object:
{
  "insights": [{"type": "<battery|data|information|prediction|optimization|monitoring>", "title": "...", "description": "...", "severity": "<low|medium|high>"}],
  "actionable": [{"type": "<kill_app|manage_wake_locks|restrict_background_data|set_standby_bucket|set_alert|set_scheduled_alarm>", "package_name": "...", "description": "...", "reason": "...", "new_mode": "...", "threshold": <percent>, "threshold_mb": <megabytes>, "estimated_battery_savings": <minutes>, "estimated_data_savings": <megabytes>, "severity": <1-5>, "throttle_level": <int>}],
  "battery_score": <0-100>,
  "data_score": <0-100>,
  "performance_score": <0-100>
}
Only the listed actionable types are accepted; anything else is discarded."#;

/// 카테고리별 지시문. `Invalid`는 지시문이 없다.
pub fn instructions_for(category: QueryCategory) -> Option<&'static str> {
    match category {
        QueryCategory::Information => Some(INFORMATION_INSTRUCTIONS),
        QueryCategory::Predictive => Some(PREDICTIVE_INSTRUCTIONS),
        QueryCategory::Optimization => Some(OPTIMIZATION_INSTRUCTIONS),
        QueryCategory::Monitoring => Some(MONITORING_INSTRUCTIONS),
        QueryCategory::Invalid => None,
    }
}

/// 분류 프롬프트
pub fn classification_prompt(query: &str) -> String {
    CLASSIFICATION_TEMPLATE.replace("{query}", query.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_valid_category_has_instructions() {
        for category in [
            QueryCategory::Information,
            QueryCategory::Predictive,
            QueryCategory::Optimization,
            QueryCategory::Monitoring,
        ] {
            assert!(instructions_for(category).is_some());
        }
        assert!(instructions_for(QueryCategory::Invalid).is_none());
    }

    #[test]
    fn information_forbids_actionables() {
        assert!(INFORMATION_INSTRUCTIONS.contains("Do NOT include any actionable"));
        assert!(INFORMATION_INSTRUCTIONS.contains("exactly N"));
    }

    #[test]
    fn classification_prompt_embeds_query() {
        let prompt = classification_prompt("  Which apps use data?  ");
        assert!(prompt.ends_with("Question: Which apps use data?"));
        assert!(!prompt.contains("{query}"));
    }
}
