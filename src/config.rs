//! Storage configuration module / 存储配置模块
//!
//! Process-wide settings loaded from `qiniu_storage.json` and environment variables.
//! Individual adapters may still be built from a modified copy of these settings.
//! 单个存储实例可以基于全局配置的副本进行覆盖

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::drivers::local::LocalConfig;
use crate::drivers::qiniu::QiniuConfig;
use crate::error::{StorageError, StorageResult};

/// Global settings instance / 全局配置实例
static SETTINGS: OnceCell<Arc<RwLock<StorageSettings>>> = OnceCell::new();

/// Default settings file name / 默认配置文件名
pub const SETTINGS_FILE: &str = "qiniu_storage.json";

/// Storage settings / 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Backend type: "qiniu" or "local" / 后端类型
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Qiniu configuration / 七牛配置
    #[serde(default)]
    pub qiniu: QiniuConfig,
    /// Local filesystem configuration / 本地存储配置
    #[serde(default)]
    pub local: LocalConfig,
}

fn default_backend() -> String {
    "qiniu".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            qiniu: QiniuConfig::default(),
            local: LocalConfig::default(),
        }
    }
}

impl StorageSettings {
    /// Apply environment overrides / 应用环境变量覆盖
    ///
    /// Uses the same setting names web applications configure for this adapter.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (env in production, map in tests)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("QINIU_STORAGE_BACKEND") {
            self.backend = v;
        }
        if let Some(v) = lookup("QINIU_ACCESS_KEY") {
            self.qiniu.access_key = v;
        }
        if let Some(v) = lookup("QINIU_SECRET_KEY") {
            self.qiniu.secret_key = v;
        }
        if let Some(v) = lookup("QINIU_BUCKET_KEY") {
            self.qiniu.bucket = v;
        }
        if let Some(v) = lookup("QINIU_BUCKET_HOST") {
            self.qiniu.bucket_host = v;
        }
        if let Some(v) = lookup("QINIU_ENCRYPT_FUNC") {
            self.qiniu.encrypt_func = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("QINIU_AES_KEY") {
            self.qiniu.aes_key = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("QINIU_BUCKET_IS_PRIVATED") {
            self.qiniu.is_private = parse_bool(&v);
        }
        if let Some(v) = lookup("QINIU_RS_HOST") {
            self.qiniu.rs_host = v;
        }
        if let Some(v) = lookup("QINIU_UP_HOST") {
            self.qiniu.up_host = v;
        }
        if let Some(v) = lookup("QINIU_LOCAL_ROOT") {
            self.local.root = v;
        }
        if let Some(v) = lookup("QINIU_LOCAL_BASE_URL") {
            self.local.base_url = v;
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Get the default settings file path / 获取配置文件路径
fn get_settings_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(SETTINGS_FILE)
}

/// Load settings from a file (if it exists) then environment / 加载配置文件并应用环境变量
pub fn load_settings_from(path: &Path) -> StorageResult<StorageSettings> {
    let mut settings = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let settings: StorageSettings = serde_json::from_str(&content)
            .map_err(|e| StorageError::Config(format!("Failed to parse {:?}: {}", path, e)))?;
        tracing::info!("Loaded storage settings from {:?}", path);
        settings
    } else {
        tracing::debug!("No settings file at {:?}, using defaults", path);
        StorageSettings::default()
    };

    settings.apply_env();
    Ok(settings)
}

/// Load settings from the default location / 从默认位置加载配置
pub fn load_settings() -> StorageResult<StorageSettings> {
    load_settings_from(&get_settings_path())
}

/// Initialize global settings / 初始化全局配置
pub fn init_settings(settings: StorageSettings) -> StorageResult<Arc<RwLock<StorageSettings>>> {
    let settings_arc = Arc::new(RwLock::new(settings));

    SETTINGS
        .set(settings_arc.clone())
        .map_err(|_| StorageError::Config("Settings already initialized".to_string()))?;

    Ok(settings_arc)
}

/// Get global settings instance / 获取全局配置实例
pub fn get_settings() -> Arc<RwLock<StorageSettings>> {
    SETTINGS
        .get_or_init(|| {
            let settings = load_settings().unwrap_or_else(|e| {
                tracing::warn!("Failed to load storage settings, using defaults: {}", e);
                StorageSettings::default()
            });
            Arc::new(RwLock::new(settings))
        })
        .clone()
}

/// Get a read-only snapshot of current settings / 获取当前配置的只读快照
pub fn settings() -> StorageSettings {
    get_settings().read().clone()
}
