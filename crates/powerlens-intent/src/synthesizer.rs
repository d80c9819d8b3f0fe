//! 추천 합성기.
//!
//! 분류 결과 + 텔레메트리 스냅샷 + 카테고리 지시문으로 프롬프트를 만들고
//! LLM 원문 응답을 그대로 돌려준다. 백엔드 에러는 숨기지 않고 호출자(오케스트레이터)에게
//! 전달한다. 폴백 정책은 호출자 몫이다.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::debug;

use powerlens_core::config::AppConfig;
use powerlens_core::error::CoreError;
use powerlens_core::models::query::{QueryAnalysis, QueryCategory};
use powerlens_core::models::telemetry::{bytes_to_mb, AppUsage, DeviceSnapshot, NetworkType};
use powerlens_core::ports::llm_provider::{CompletionOptions, LlmProvider};

use crate::prompts;
use crate::ranking::RankingRules;

/// 프롬프트에 포함하는 최대 앱 수
const MAX_PROMPT_APPS: usize = 25;

/// 추천 합성기
pub struct RecommendationSynthesizer {
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    rules: RankingRules,
}

impl RecommendationSynthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>, options: CompletionOptions, rules: RankingRules) -> Self {
        Self {
            llm,
            options,
            rules,
        }
    }

    pub fn from_config(llm: Arc<dyn LlmProvider>, config: &AppConfig) -> Self {
        Self::new(
            llm,
            config.pipeline.synthesis_options(),
            RankingRules::from_config(config),
        )
    }

    /// 추천 요청. `Invalid` 카테고리는 계약 위반.
    pub async fn synthesize(
        &self,
        analysis: &QueryAnalysis,
        snapshot: &DeviceSnapshot,
    ) -> Result<String, CoreError> {
        let prompt = self.build_prompt(analysis, snapshot)?;
        debug!(
            category = %analysis.category(),
            prompt_len = prompt.len(),
            max_tokens = self.options.max_tokens,
            "추천 합성 요청"
        );
        self.llm.complete(&prompt, &self.options).await
    }

    /// 스냅샷 요약 + 분류 + 지시문 + 응답 형식을 하나의 프롬프트로
    pub fn build_prompt(
        &self,
        analysis: &QueryAnalysis,
        snapshot: &DeviceSnapshot,
    ) -> Result<String, CoreError> {
        let category = analysis.category();
        let instructions = prompts::instructions_for(category).ok_or_else(|| {
            CoreError::ContractViolation(format!("{category} 카테고리는 합성 대상이 아님"))
        })?;

        let top_n = analysis
            .params()
            .limit
            .map(|n| n as usize)
            .unwrap_or(self.rules.default_top_n);
        let instructions = instructions
            .replace("{top_n}", &top_n.to_string())
            .replace(
                "{battery_threshold}",
                &self.rules.alert_defaults.battery_threshold_percent.to_string(),
            )
            .replace(
                "{data_threshold}",
                &self.rules.alert_defaults.data_threshold_mb.to_string(),
            );

        let params = serde_json::to_string(analysis.params())?;

        let mut prompt = snapshot_summary(snapshot);
        let _ = write!(
            prompt,
            "\nClassification:\n- category: {}\n- parameters: {}\n\n{}\n\n{}",
            category,
            params,
            instructions,
            prompts::OUTPUT_CONTRACT
        );
        if category == QueryCategory::Information {
            prompt.push_str("\nFor this request \"actionable\" must be an empty array.");
        }
        Ok(prompt)
    }
}

fn network_label(network: NetworkType) -> &'static str {
    match network {
        NetworkType::Wifi => "wifi",
        NetworkType::Cellular => "cellular",
        NetworkType::Ethernet => "ethernet",
        NetworkType::None => "offline",
        NetworkType::Unknown => "unknown",
    }
}

/// 스냅샷 요약 텍스트 (배터리 사용량 내림차순, 최대 25개 앱)
pub fn snapshot_summary(snapshot: &DeviceSnapshot) -> String {
    let mut text = format!(
        "Device snapshot (captured {}):\n",
        snapshot.captured_at.format("%Y-%m-%d %H:%M UTC")
    );

    let battery = &snapshot.battery;
    let _ = write!(
        text,
        "- Battery: {}% ({})",
        battery.level_percent,
        if battery.is_charging {
            "charging"
        } else {
            "not charging"
        }
    );
    if let Some(drain) = battery.drain_percent_per_hour {
        let _ = write!(text, ", draining {drain:.1}%/h");
    }
    text.push('\n');

    let _ = write!(
        text,
        "- Network: {}",
        network_label(snapshot.network.network_type)
    );
    if let Some(limit) = snapshot.network.data_limit_mb {
        let _ = write!(text, ", data plan limit {limit:.0} MB");
    }
    text.push('\n');

    if snapshot.apps.is_empty() {
        text.push_str("- No per-app usage data available.\n");
        return text;
    }

    let mut apps: Vec<&AppUsage> = snapshot.apps.iter().collect();
    apps.sort_by(|a, b| {
        b.battery_usage_percent
            .partial_cmp(&a.battery_usage_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.total_bytes().cmp(&a.total_bytes()))
    });

    text.push_str("Apps (name, package, battery %, background MB, foreground MB):\n");
    for app in apps.iter().take(MAX_PROMPT_APPS) {
        let _ = writeln!(
            text,
            "- {} ({}): battery {:.1}%, background {:.1} MB, foreground {:.1} MB",
            app.app_name,
            app.package_name,
            app.battery_usage_percent,
            bytes_to_mb(app.background_bytes),
            bytes_to_mb(app.foreground_bytes)
        );
    }
    if apps.len() > MAX_PROMPT_APPS {
        let _ = writeln!(text, "- ... and {} more apps", apps.len() - MAX_PROMPT_APPS);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::test_support::mixed_snapshot;
    use async_trait::async_trait;
    use powerlens_core::models::query::ExtractedParameters;
    use std::sync::Mutex;

    /// 받은 프롬프트와 옵션을 기록하는 테스트용 LLM
    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
        options: Mutex<Option<CompletionOptions>>,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn complete(
            &self,
            prompt: &str,
            options: &CompletionOptions,
        ) -> Result<String, CoreError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            *self.options.lock().unwrap() = Some(*options);
            if self.fail {
                Err(CoreError::Network("unreachable".into()))
            } else {
                Ok(r#"{"insights": []}"#.to_string())
            }
        }

        fn provider_name(&self) -> &str {
            "recording"
        }

        fn is_external(&self) -> bool {
            false
        }
    }

    fn recording(fail: bool) -> Arc<RecordingLlm> {
        Arc::new(RecordingLlm {
            prompts: Default::default(),
            options: Default::default(),
            fail,
        })
    }

    fn synthesizer(llm: Arc<RecordingLlm>) -> RecommendationSynthesizer {
        RecommendationSynthesizer::from_config(llm, &AppConfig::default_config())
    }

    #[tokio::test]
    async fn forwards_prompt_with_bounded_options() {
        let llm = recording(false);
        let analysis = QueryAnalysis::new(QueryCategory::Optimization, ExtractedParameters::default());
        let raw = synthesizer(llm.clone())
            .synthesize(&analysis, &mixed_snapshot())
            .await
            .unwrap();
        assert_eq!(raw, r#"{"insights": []}"#);

        let prompt = llm.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("OPTIMIZATION request"));
        assert!(prompt.contains("TikTok (com.zhiliaoapp.musically)"));
        assert!(prompt.contains("category: optimization"));

        let options = llm.options.lock().unwrap().unwrap();
        assert_eq!(options.max_tokens, 1024);
        assert!(options.temperature <= 0.3);
    }

    #[tokio::test]
    async fn information_prompt_uses_requested_top_n() {
        let llm = recording(false);
        let params = ExtractedParameters {
            limit: Some(5),
            ..Default::default()
        };
        let analysis = QueryAnalysis::new(QueryCategory::Information, params);
        synthesizer(llm.clone())
            .synthesize(&analysis, &mixed_snapshot())
            .await
            .unwrap();
        let prompt = llm.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("If N is not specified, use 5."));
        assert!(prompt.contains("must be an empty array"));
    }

    #[tokio::test]
    async fn backend_errors_propagate() {
        let analysis = QueryAnalysis::new(QueryCategory::Monitoring, ExtractedParameters::default());
        let err = synthesizer(recording(true))
            .synthesize(&analysis, &mixed_snapshot())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn invalid_category_is_contract_violation() {
        let llm = recording(false);
        let analysis = QueryAnalysis::new(QueryCategory::Invalid, ExtractedParameters::default());
        let err = synthesizer(llm.clone())
            .synthesize(&analysis, &DeviceSnapshot::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ContractViolation(_)));
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn summary_mentions_battery_state_and_empty_apps() {
        let mut snapshot = DeviceSnapshot::empty();
        snapshot.battery.level_percent = 42;
        snapshot.battery.drain_percent_per_hour = Some(7.5);
        let summary = snapshot_summary(&snapshot);
        assert!(summary.contains("Battery: 42% (not charging), draining 7.5%/h"));
        assert!(summary.contains("No per-app usage data"));
    }
}
