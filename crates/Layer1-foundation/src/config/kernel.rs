//! Kernel Config - 커널 런타임 설정
//!
//! `<project>/.keel/kernel.json` 에서 로드하며, 파일이 없으면 기본값을 사용합니다.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 설정 파일명
pub const KERNEL_CONFIG_FILE: &str = "kernel.json";

/// 프로젝트 설정 디렉토리
pub const PROJECT_DIR: &str = ".keel";

/// 커널 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KernelConfig {
    /// 커널 이름 (로그 구분용)
    pub name: String,

    /// 보관할 최근 이벤트 수 (0이면 보관 안 함)
    pub event_history_size: usize,

    /// `watch()` 브로드캐스트 채널 용량
    pub event_channel_capacity: usize,

    /// 기본 클래스 로더 이름
    pub default_class_loader: String,

    /// 모든 이벤트 전달을 trace 로그로 남김
    pub debug_events: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "keel".to_string(),
            event_history_size: 256,
            event_channel_capacity: 256,
            default_class_loader: "system".to_string(),
            debug_events: false,
        }
    }
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_event_history(mut self, size: usize) -> Self {
        self.event_history_size = size;
        self
    }

    /// 프로젝트 설정 파일 경로
    pub fn project_file(root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(PROJECT_DIR).join(KERNEL_CONFIG_FILE)
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 파일에서 로드 (필수)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;

        debug!(path = %path.display(), kernel = %config.name, "Loaded kernel config");
        Ok(config)
    }

    /// 파일이 없으면 기본값
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// 프로젝트 루트 기준 로드
    pub fn load_project(root: impl AsRef<Path>) -> Result<Self> {
        Self::load_or_default(Self::project_file(root))
    }

    /// 파일로 저장 (상위 디렉토리 자동 생성)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create directory: {}", e)))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("kernel name must not be empty".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::Config(
                "eventChannelCapacity must be greater than zero".into(),
            ));
        }
        if self.default_class_loader.trim().is_empty() {
            return Err(Error::Config("defaultClassLoader must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = KernelConfig::load_project(dir.path()).unwrap();
        assert_eq!(config, KernelConfig::default());
    }

    #[test]
    fn test_save_and_load_project() {
        let dir = tempfile::tempdir().unwrap();
        let config = KernelConfig::new().with_name("test").with_event_history(8);
        config.save(KernelConfig::project_file(dir.path())).unwrap();

        let loaded = KernelConfig::load_project(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.json");
        std::fs::write(&path, r#"{ "name": "partial", "debugEvents": true }"#).unwrap();

        let config = KernelConfig::load(&path).unwrap();
        assert_eq!(config.name, "partial");
        assert!(config.debug_events);
        assert_eq!(config.event_history_size, 256);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(KernelConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.json");
        std::fs::write(&path, r#"{ "eventChannelCapacity": 0 }"#).unwrap();
        assert!(matches!(KernelConfig::load(&path), Err(Error::Config(_))));
    }
}
