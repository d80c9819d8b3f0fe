//! 모델 응답 텍스트에서 JSON 객체 추출.
//!
//! 모델은 JSON 앞뒤에 설명 문장을 붙이는 경우가 많다.
//! 첫 `{`부터 마지막 `}`까지를 잘라 파싱하고, 나머지 텍스트는 버린다.

use serde_json::{Map, Value};

/// 텍스트에 포함된 첫 번째 `{` ~ 마지막 `}` 구간을 JSON 객체로 파싱한다.
///
/// 구간이 없거나 객체가 아니면 `None`.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// 숫자 또는 숫자 문자열을 f64로 읽는다
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// 문자열 필드를 읽는다 (빈 문자열은 없는 것으로 취급)
pub fn non_empty_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// 정수로 떨어지면 소수점 없이 표기
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = "Sure! Here is the analysis:\n{\"insights\": [], \"actionable\": []}\nHope it helps.";
        let map = extract_json_object(text).unwrap();
        assert!(map.contains_key("insights"));
    }

    #[test]
    fn spans_first_to_last_brace() {
        let text = r#"{"a": {"b": 1}} trailing }"#;
        // 마지막 `}`까지 포함하면 파싱 실패
        assert!(extract_json_object(text).is_none());
        assert!(extract_json_object(r#"x {"a": {"b": 1}} y"#).is_some());
    }

    #[test]
    fn rejects_missing_or_inverted_braces() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("} oops {").is_none());
        assert!(extract_json_object("").is_none());
    }

    #[test]
    fn lenient_numbers() {
        assert_eq!(lenient_f64(&serde_json::json!(500)), Some(500.0));
        assert_eq!(lenient_f64(&serde_json::json!("20%")), Some(20.0));
        assert_eq!(lenient_f64(&serde_json::json!("lots")), None);
        assert_eq!(format_number(500.0), "500");
        assert_eq!(format_number(1.5), "1.5");
    }
}
