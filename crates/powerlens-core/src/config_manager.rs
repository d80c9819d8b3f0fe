//! 설정 파일 관리.
//!
//! 계층형 로드: 내장 기본값 → JSON 설정 파일 → `POWERLENS__SECTION__KEY` 환경변수.
//! 설정 파일은 플랫폼별 설정 디렉토리(`directories`) 또는 지정 경로를 사용한다.

use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::CoreError;

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 환경변수 접두사
const ENV_PREFIX: &str = "POWERLENS";

/// 설정 관리자
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 로드된 설정
    config: AppConfig,
    /// 설정 파일 경로 (존재하지 않을 수 있음)
    config_path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 기본 경로에서 설정 로드
    pub fn new() -> Result<Self, CoreError> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// 지정 경로에서 설정 로드. 파일이 없으면 기본값 + 환경변수만 적용한다.
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        let config = Self::load_layered(&config_path)?;
        config.validate()?;
        debug!(path = %config_path.display(), "설정 로드 완료");
        Ok(Self {
            config,
            config_path,
        })
    }

    /// 현재 설정
    pub fn get(&self) -> &AppConfig {
        &self.config
    }

    /// 설정 파일 경로
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 현재 설정을 파일로 저장 (디렉토리 자동 생성)
    pub fn save(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "설정 디렉토리 생성 실패: {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
                info!("설정 디렉토리 생성: {}", parent.display());
            }
        }
        let content = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.config_path, content).map_err(|e| {
            CoreError::Config(format!(
                "설정 파일 저장 실패: {}: {}",
                self.config_path.display(),
                e
            ))
        })?;
        debug!("설정 저장 완료: {}", self.config_path.display());
        Ok(())
    }

    /// 플랫폼별 기본 설정 파일 경로
    pub fn default_config_path() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("com", "powerlens", "powerlens")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }

    fn load_layered(path: &Path) -> Result<AppConfig, CoreError> {
        let defaults = Config::try_from(&AppConfig::default_config())
            .map_err(|e| CoreError::Config(format!("기본 설정 직렬화 실패: {e}")))?;

        let loaded = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(path)
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| {
                CoreError::Config(format!("설정 파일 파싱 실패: {}: {}", path.display(), e))
            })?;

        loaded
            .try_deserialize::<AppConfig>()
            .map_err(|e| CoreError::Config(format!("설정 역직렬화 실패: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProviderType;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("absent.json")).unwrap();
        assert_eq!(manager.get().pipeline.synthesis_timeout_ms, 8_000);
        assert_eq!(manager.get().alerts.data_threshold_mb, 1000);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "ai_provider": {
                    "llm_provider": "Remote",
                    "llm_api": {"endpoint": "http://localhost:9/v1/messages", "provider_type": "Anthropic"}
                },
                "alerts": {"battery_threshold_percent": 15}
            }"#,
        )
        .unwrap();

        let manager = ConfigManager::with_path(path).unwrap();
        let config = manager.get();
        assert_eq!(config.ai_provider.llm_provider, LlmProviderType::Remote);
        assert_eq!(config.alerts.battery_threshold_percent, 15);
        assert_eq!(config.alerts.data_threshold_mb, 1000);
        let api = config.ai_provider.llm_api.as_ref().unwrap();
        assert_eq!(api.timeout_secs, 30);
    }

    #[test]
    fn invalid_file_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"pipeline": {"max_tokens": 0}}"#).unwrap();
        assert!(ConfigManager::with_path(path).is_err());
    }

    #[test]
    fn save_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let manager = ConfigManager::with_path(path.clone()).unwrap();
        manager.save().unwrap();
        assert!(path.exists());

        let reloaded = ConfigManager::with_path(path).unwrap();
        assert_eq!(
            reloaded.get().pipeline.max_tokens,
            manager.get().pipeline.max_tokens
        );
    }
}
