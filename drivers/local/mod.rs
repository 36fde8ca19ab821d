//! 本地文件系统存储
//! Local filesystem storage, an alternative implementer of the storage interface

use serde::{Deserialize, Serialize};

mod driver;

pub use driver::{LocalFile, LocalStorage};

/// 本地存储配置 / Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// 根目录 / Root directory
    #[serde(default)]
    pub root: String,
    /// 访问URL前缀 / Public URL prefix
    #[serde(default)]
    pub base_url: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: "media".to_string(),
            base_url: "/media".to_string(),
        }
    }
}
