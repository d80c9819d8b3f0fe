//! 결정적 키워드 규칙.
//!
//! LLM 분류가 실패했을 때의 카테고리 판정과, 두 경로 모두에서 쓰는
//! 파라미터/임계값 추출을 담당한다. 패턴은 프로세스 전역 불변 상수이다.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use powerlens_core::models::query::{
    ConditionType, DurationUnit, ExtractedParameters, PeriodUnit, QueryCategory, ResourceType,
    Thresholds, TimePeriod, UsageDuration,
};

// ============================================================
// 패턴 상수
// ============================================================

/// 예측 표현 — 정보 표현과 어휘가 겹치므로 가장 먼저 검사한다
const PREDICTIVE_PHRASES: &[&str] = &["can i", "will i", "enough"];

/// 약한 예측 표현. 최적화/모니터링 표현이 없을 때만 적용한다.
const WEAK_PREDICTIVE_PHRASES: &[&str] = &["will my", "how long", "last until", "make it"];

const INFORMATION_PHRASES: &[&str] = &["show", "list", "which", "what", "how much"];

const OPTIMIZATION_PHRASES: &[&str] = &[
    "optimize", "optimise", "save", "preserve", "reduce", "conserve", "extend", "restrict",
    "improve",
];

const MONITORING_PHRASES: &[&str] = &[
    "notify",
    "alert",
    "warn",
    "remind",
    "let me know",
    "tell me when",
];

/// 다른 키워드와 무관하게 Monitoring으로 고정되는 단어 (부분 문자열 매칭)
const MONITORING_OVERRIDES: &[&str] = &["notify", "alert"];

const DATA_WORDS: &[&str] = &["data", "internet", "bandwidth", "megabytes", "gigabytes", "mobile data"];

const BATTERY_WORDS: &[&str] = &["battery", "batteries"];

const APP_CATEGORY_WORDS: &[(&str, &str)] = &[
    ("social", "social"),
    ("streaming", "streaming"),
    ("video", "video"),
    ("music", "music"),
    ("games", "games"),
    ("game", "games"),
    ("messaging", "messaging"),
    ("browser", "browser"),
    ("browsers", "browser"),
];

/// 대문자로 시작하지만 앱 이름이 아닌 단어
const NON_APP_WORDS: &[&str] = &[
    "a", "all", "alert", "an", "and", "any", "app", "apps", "are", "battery", "but", "can",
    "check", "could", "data", "do", "does", "find", "for", "get", "give", "help", "how", "i",
    "if", "is", "it", "keep", "let", "limit", "list", "make", "me", "monitor", "my", "notify",
    "on", "optimize", "please", "preserve", "reduce", "remind", "restrict", "save", "set",
    "should", "show", "stop", "tell", "that", "the", "them", "this", "today", "tonight", "top",
    "warn", "what", "when", "which", "while", "who", "why", "will", "with", "would",
];

static DATA_SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mb|gb|megabytes?|gigabytes?)\b").expect("data size regex")
});

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,3})\s*(?:%|percent\b)").expect("percent regex"));

static TOP_N_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btop\s+(\d+)\b|\b(\d+)\s+(?:\w+\s+)?apps?\b").expect("top-n regex")
});

static LAST_PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:last|past)\s+(\d+)\s+(hour|day|week|month)s?\b").expect("period regex")
});

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:for\s+(?:another\s+|the\s+next\s+|a\s+)?|next\s+)(\d+)\s*-?\s*(minute|min|hour|hr|day)s?\b|\b(\d+)\s+more\s+(minute|min|hour|hr|day)s?\b",
    )
    .expect("duration regex")
});

static PRIORITY_APP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:keep|except|excluding|but\s+not)\s+(?:my\s+|the\s+)?([A-Za-z][A-Za-z0-9._]*)")
        .expect("priority app regex")
});

// ============================================================
// 텍스트 헬퍼
// ============================================================

/// 소문자 단어를 공백 하나로 이어붙이고 양끝을 공백으로 감싼다.
/// `has_phrase`가 단어 경계로 매칭하도록 ("whatsapp" 안의 "what"은 매칭되지 않음).
fn word_string(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    format!(" {} ", words.join(" "))
}

fn has_phrase(words: &str, phrase: &str) -> bool {
    words.contains(&format!(" {phrase} "))
}

fn has_any(words: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| has_phrase(words, p))
}

/// 소문자 토큰 목록 (영숫자 기준 분리)
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// 질의가 알림 요청인지 ("notify"/"alert" 포함)
pub fn mentions_notification(query: &str) -> bool {
    let lower = query.to_lowercase();
    MONITORING_OVERRIDES.iter().any(|w| lower.contains(w))
}

/// 질의에 "data"가 단어로 등장하는지
pub fn mentions_data(query: &str) -> bool {
    has_phrase(&word_string(query), "data")
}

// ============================================================
// 카테고리 판정
// ============================================================

/// 키워드 우선순위 규칙으로 카테고리 판정.
///
/// 알림 단어 > 예측 > 정보 > 최적화 > 모니터링 > 약한 예측 > 기본값 Information.
/// "top 3" 같은 순위 질의는 기본값으로 Information이 된다. 빈 질의는 `Invalid`.
pub fn keyword_category(query: &str) -> QueryCategory {
    if query.trim().is_empty() {
        return QueryCategory::Invalid;
    }
    if mentions_notification(query) {
        return QueryCategory::Monitoring;
    }

    let words = word_string(query);
    if has_any(&words, PREDICTIVE_PHRASES) {
        QueryCategory::Predictive
    } else if has_any(&words, INFORMATION_PHRASES) {
        QueryCategory::Information
    } else if has_any(&words, OPTIMIZATION_PHRASES) {
        QueryCategory::Optimization
    } else if has_any(&words, MONITORING_PHRASES) {
        QueryCategory::Monitoring
    } else if has_any(&words, WEAK_PREDICTIVE_PHRASES) {
        QueryCategory::Predictive
    } else {
        QueryCategory::Information
    }
}

// ============================================================
// 임계값
// ============================================================

/// 질의에 등장한 첫 데이터 크기를 MB로 (1GB = 1000MB)
pub fn data_threshold_mb(text: &str) -> Option<u64> {
    DATA_SIZE_RE
        .captures(text)
        .and_then(|caps| size_to_mb(&caps[1], &caps[2]))
        .map(|mb| mb.round() as u64)
}

/// 질의에 등장한 첫 배터리 퍼센트 (0~100)
pub fn battery_threshold_percent(text: &str) -> Option<u32> {
    PERCENT_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|pct| *pct <= 100)
}

/// "2GB", "500 MB", "750" 같은 값을 MB로. 단위가 없으면 MB로 본다.
pub fn parse_data_size_mb(text: &str) -> Option<f64> {
    if let Some(caps) = DATA_SIZE_RE.captures(text) {
        return size_to_mb(&caps[1], &caps[2]);
    }
    text.trim().parse::<f64>().ok().filter(|v| *v >= 0.0)
}

fn size_to_mb(value: &str, unit: &str) -> Option<f64> {
    let value: f64 = value.parse().ok()?;
    let unit = unit.to_ascii_lowercase();
    if unit.starts_with('g') {
        Some(value * 1000.0)
    } else {
        Some(value)
    }
}

/// 질의 텍스트의 임계값 (없으면 None)
pub fn thresholds_in(query: &str) -> Option<Thresholds> {
    let thresholds = Thresholds {
        battery: battery_threshold_percent(query),
        data: data_threshold_mb(query),
    };
    if thresholds.battery.is_none() && thresholds.data.is_none() {
        None
    } else {
        Some(thresholds)
    }
}

// ============================================================
// 파라미터 추출
// ============================================================

/// 질의에 언급된 리소스. 아무것도 없으면 battery.
///
/// battery는 "battery"라는 단어나 퍼센트 임계값이 있을 때만 명시적으로 추가된다.
pub fn resource_types(query: &str) -> BTreeSet<ResourceType> {
    let words = word_string(query);
    let mut resources = BTreeSet::new();
    if has_any(&words, DATA_WORDS) || DATA_SIZE_RE.is_match(query) {
        resources.insert(ResourceType::Data);
    }
    if has_any(&words, BATTERY_WORDS) || PERCENT_RE.is_match(query) {
        resources.insert(ResourceType::Battery);
    }
    if resources.is_empty() {
        resources.insert(ResourceType::Battery);
    }
    resources
}

fn limit_in(query: &str) -> Option<u32> {
    TOP_N_RE.captures(query).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|n| *n > 0)
    })
}

fn time_period_in(query: &str) -> Option<TimePeriod> {
    if let Some(caps) = LAST_PERIOD_RE.captures(query) {
        let value = caps[1].parse::<u32>().ok()?;
        let unit = match caps[2].to_ascii_lowercase().as_str() {
            "hour" => PeriodUnit::Hour,
            "day" => PeriodUnit::Day,
            "week" => PeriodUnit::Week,
            _ => PeriodUnit::Month,
        };
        return Some(TimePeriod { value, unit });
    }

    let words = word_string(query);
    let unit = if has_any(&words, &["today", "yesterday", "tonight"]) {
        PeriodUnit::Day
    } else if has_any(&words, &["this week", "last week", "past week"]) {
        PeriodUnit::Week
    } else if has_any(&words, &["this month", "last month", "past month"]) {
        PeriodUnit::Month
    } else {
        return None;
    };
    Some(TimePeriod { value: 1, unit })
}

fn duration_in(query: &str) -> Option<UsageDuration> {
    let caps = DURATION_RE.captures(query)?;
    let (value, unit) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
        (Some(v), Some(u), _, _) | (_, _, Some(v), Some(u)) => (v.as_str(), u.as_str()),
        _ => return None,
    };
    let value = value.parse::<u32>().ok()?;
    let unit = match unit.to_ascii_lowercase().as_str() {
        "minute" | "min" => DurationUnit::Minutes,
        "hour" | "hr" => DurationUnit::Hours,
        _ => DurationUnit::Days,
    };
    Some(UsageDuration { value, unit })
}

fn condition_type_in(query: &str) -> Option<ConditionType> {
    let words = word_string(query);
    if has_any(&words, &["while using", "while i use", "while i m using", "when using"]) {
        Some(ConditionType::WhileUsing)
    } else if has_any(
        &words,
        &["reaches", "drops below", "falls below", "goes below", "hits", "drops to", "below"],
    ) {
        Some(ConditionType::ReachesThreshold)
    } else if has_any(
        &words,
        &["exceeds", "more than", "over", "above", "uses", "goes over"],
    ) {
        Some(ConditionType::ExceedsUsage)
    } else {
        None
    }
}

fn priority_apps_in(query: &str) -> BTreeSet<String> {
    PRIORITY_APP_RE
        .captures_iter(query)
        .map(|caps| caps[1].trim_end_matches('.').to_string())
        .filter(|name| !NON_APP_WORDS.contains(&name.to_lowercase().as_str()))
        .collect()
}

/// 대문자로 시작하는 비-질의어 토큰을 앱 이름 후보로 본다
fn apps_in(query: &str) -> BTreeSet<String> {
    query
        .split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .map(|w| w.trim_end_matches('.'))
        .filter(|w| w.len() >= 2)
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !NON_APP_WORDS.contains(&w.to_lowercase().as_str()))
        .filter(|w| DATA_SIZE_RE.find(w).is_none())
        .map(str::to_string)
        .collect()
}

fn app_categories_in(query: &str) -> BTreeSet<String> {
    let words = word_string(query);
    APP_CATEGORY_WORDS
        .iter()
        .filter(|(word, _)| has_phrase(&words, word))
        .map(|(_, category)| category.to_string())
        .collect()
}

/// 질의 텍스트만으로 파라미터 추출
pub fn extract_parameters(query: &str) -> ExtractedParameters {
    let mut apps = apps_in(query);
    let priority_apps = priority_apps_in(query);
    apps.extend(priority_apps.iter().cloned());

    ExtractedParameters {
        apps,
        app_categories: app_categories_in(query),
        duration: duration_in(query),
        time_period: time_period_in(query),
        resource_type: resource_types(query),
        thresholds: thresholds_in(query),
        limit: limit_in(query),
        context: None,
        priority_apps,
        condition_type: condition_type_in(query),
    }
}
