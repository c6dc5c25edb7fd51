//! 应用配置和持久化
//!
//! 提供块大小、连接超时、默认设备等设置的存储和读取。

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::LogLevel;
use crate::transfer::TransferConfig;
use crate::transfer::engine::{DEFAULT_CHUNK_SIZE, DEFAULT_CONNECT_TIMEOUT};

/// 传输实现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// BlueZ RFCOMM
    #[default]
    Bluez,
    /// TCP (开发/测试)
    Tcp,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("chunk_size must be greater than 0")]
    ZeroChunkSize,

    #[error("connect_timeout_secs must be greater than 0")]
    ZeroTimeout,

    #[error("Failed to write settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// 应用设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 内容块大小（字节）
    pub chunk_size: usize,
    /// 连接超时（秒）
    pub connect_timeout_secs: u64,
    /// 未指定设备时使用的对端地址
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_device: Option<String>,
    pub transport: TransportKind,
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            default_device: None,
            transport: TransportKind::default(),
            log_level: LogLevel::Info,
        }
    }
}

impl Settings {
    /// 获取配置文件路径
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sppsend");
        config_dir.join("settings.toml")
    }

    /// 加载设置（如果文件不存在则使用默认值）
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<Settings>(&content) {
                    Ok(settings) => match settings.validate() {
                        Ok(()) => {
                            debug!("Loaded settings from {:?}", path);
                            return settings;
                        }
                        Err(e) => {
                            log::warn!("Invalid settings: {}, using defaults", e);
                        }
                    },
                    Err(e) => {
                        log::warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// 引擎配置
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            chunk_size: self.chunk_size,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.chunk_size, 1024);
        assert_eq!(settings.transport, TransportKind::Bluez);
        assert!(settings.validate().is_ok());

        let config = settings.transfer_config();
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            transport = "tcp"
            default_device = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(settings.transport, TransportKind::Tcp);
        assert_eq!(settings.default_device.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(settings.chunk_size, 1024);
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let settings = Settings {
            chunk_size: 4096,
            log_level: LogLevel::Debug,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        fs::write(&path, "chunk_size = 0").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());

        fs::write(&path, "not toml at all [").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.save_to(&dir.path().join("s.toml")),
            Err(ConfigError::ZeroChunkSize)
        ));
    }
}
