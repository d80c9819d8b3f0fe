//! # powerlens-app
//!
//! POWERLENS 바이너리 진입점.
//! 설정 로드, 어댑터 와이어링(DI), 질의 한 건 실행, 결과 JSON 출력.

mod effector;
mod snapshot_source;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use powerlens_automation::ActionDispatcher;
use powerlens_core::config::{AppConfig, LlmProviderType};
use powerlens_core::config_manager::ConfigManager;
use powerlens_core::ports::llm_provider::LlmProvider;
use powerlens_intent::{DisabledLlmProvider, QueryOrchestrator};
use powerlens_network::RemoteLlmProvider;

use crate::effector::DryRunEffector;
use crate::snapshot_source::SnapshotFileSource;

/// POWERLENS — 배터리/데이터 사용량 질의 분석기
///
/// 자연어 질문을 분류하고, 디바이스 스냅샷을 근거로 인사이트와 실행 가능한 액션을 만든다.
#[derive(Parser, Debug)]
#[command(name = "powerlens")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 자연어 질의 (예: "Save battery but keep WhatsApp running")
    query: String,

    /// 디바이스 스냅샷 JSON 파일 (없으면 빈 스냅샷)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 오프라인 모드 (LLM 호출 없이 로컬 규칙만 사용)
    #[arg(long, short = 'o')]
    offline: bool,

    /// 결과 액션을 드라이런 실행기로 디스패치
    #[arg(long)]
    execute: bool,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

/// 설정 로드. 지정 경로 실패는 에러, 기본 경로 실패는 기본값으로 대체.
fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let manager = ConfigManager::with_path(path.clone())
                .with_context(|| format!("설정 로드 실패: {}", path.display()))?;
            Ok(manager.get().clone())
        }
        None => match ConfigManager::new() {
            Ok(manager) => {
                info!("설정 파일: {}", manager.config_path().display());
                Ok(manager.get().clone())
            }
            Err(e) => {
                warn!("설정 관리자 초기화 실패, 기본 설정 사용: {e}");
                Ok(AppConfig::default_config())
            }
        },
    }
}

/// 설정과 CLI 플래그로 LLM 제공자 선택
fn build_llm_provider(config: &AppConfig, offline: bool) -> Result<Arc<dyn LlmProvider>> {
    if offline {
        info!("오프라인 모드: LLM 비활성");
        return Ok(Arc::new(DisabledLlmProvider::new()));
    }

    let ai = &config.ai_provider;
    match (ai.llm_provider, &ai.llm_api) {
        (LlmProviderType::Remote, Some(api)) => match RemoteLlmProvider::new(api) {
            Ok(provider) => {
                info!(
                    provider = provider.provider_name(),
                    endpoint = %api.endpoint,
                    "외부 LLM 제공자 사용"
                );
                Ok(Arc::new(provider))
            }
            Err(e) if ai.fallback_to_local => {
                warn!("외부 LLM 제공자 생성 실패, 오프라인으로 대체: {e}");
                Ok(Arc::new(DisabledLlmProvider::new()))
            }
            Err(e) => Err(anyhow!("외부 LLM 제공자 생성 실패: {e}")),
        },
        (LlmProviderType::Remote, None) => {
            if ai.fallback_to_local {
                warn!("llm_api 미설정 — 오프라인으로 대체");
                Ok(Arc::new(DisabledLlmProvider::new()))
            } else {
                Err(anyhow!("llm_provider=Remote 이지만 llm_api 설정이 없음"))
            }
        }
        (LlmProviderType::Disabled, _) => Ok(Arc::new(DisabledLlmProvider::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout은 JSON 결과 전용, 로그는 stderr
    let log_filter = format!(
        "powerlens={},powerlens_app={},powerlens_core={},powerlens_intent={},powerlens_network={},powerlens_automation={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(args.config.clone())?;
    if args.offline {
        config.pipeline.offline_only = true;
    }

    let llm = build_llm_provider(&config, args.offline)?;
    let telemetry = Arc::new(SnapshotFileSource::new(args.snapshot.clone()));
    let orchestrator = Arc::new(QueryOrchestrator::new(llm, telemetry, &config));

    info!(query = %args.query, "질의 처리 시작");
    let result = orchestrator
        .spawn_process(args.query.clone())
        .await
        .context("질의 처리 태스크 실패")?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if args.execute {
        let effector = Arc::new(DryRunEffector::new());
        let dispatcher = ActionDispatcher::new(effector.clone(), &config.automation);
        let outcomes = dispatcher.execute(&result.actionables).await;
        info!(
            requested = result.actionables.len(),
            applied = effector.applied_count(),
            "드라이런 디스패치 완료"
        );
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerlens_core::config::{AiProviderType, ExternalApiEndpoint};

    fn remote_config(api_key: &str, fallback: bool) -> AppConfig {
        let mut config = AppConfig::default_config();
        config.ai_provider.llm_provider = LlmProviderType::Remote;
        config.ai_provider.fallback_to_local = fallback;
        config.ai_provider.llm_api = Some(ExternalApiEndpoint {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: api_key.to_string(),
            model: None,
            timeout_secs: 30,
            provider_type: AiProviderType::Anthropic,
        });
        config
    }

    #[test]
    fn default_config_uses_offline_provider() {
        let provider = build_llm_provider(&AppConfig::default_config(), false).unwrap();
        assert!(!provider.is_available());
    }

    #[test]
    fn remote_provider_when_configured() {
        let provider = build_llm_provider(&remote_config("sk-test", false), false).unwrap();
        assert!(provider.is_external());
        assert!(provider.is_available());
    }

    #[test]
    fn offline_flag_overrides_remote() {
        let provider = build_llm_provider(&remote_config("sk-test", false), true).unwrap();
        assert!(!provider.is_available());
    }

    #[test]
    fn missing_key_falls_back_or_fails() {
        let provider = build_llm_provider(&remote_config("", true), false).unwrap();
        assert!(!provider.is_available());
        assert!(build_llm_provider(&remote_config("", false), false).is_err());
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"pipeline": {"default_top_n": 5}}"#).unwrap();
        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.pipeline.default_top_n, 5);
    }

    #[test]
    fn args_parse_flags() {
        let args = Args::parse_from([
            "powerlens",
            "Top 3 data apps today",
            "--offline",
            "--execute",
            "--snapshot",
            "snap.json",
        ]);
        assert_eq!(args.query, "Top 3 data apps today");
        assert!(args.offline && args.execute);
        assert_eq!(args.snapshot, Some(PathBuf::from("snap.json")));
        assert_eq!(args.log_level, "info");
    }
}
