use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::Storage;
use crate::cipher::CipherRegistry;
use crate::config::StorageSettings;
use crate::error::{StorageError, StorageResult};

pub type StorageBox = Arc<dyn Storage>;

/// Storage factory trait / 存储工厂 trait
pub trait StorageFactory: Send + Sync {
    /// Backend type name, matched against `StorageSettings::backend` / 后端类型名称
    fn backend_type(&self) -> &'static str;

    /// Create a storage instance / 创建存储实例
    fn create_storage(
        &self,
        settings: &StorageSettings,
        ciphers: &CipherRegistry,
    ) -> StorageResult<StorageBox>;
}

/// Backend registry (selects the implementer by configuration) / 后端注册表
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: Arc<RwLock<HashMap<String, Arc<dyn StorageFactory>>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in backend / 注册所有内置后端
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        crate::drivers::register_all(&registry);
        registry
    }

    /// Register storage factory / 注册存储工厂
    pub fn register_factory(&self, factory: Arc<dyn StorageFactory>) {
        let backend_type = factory.backend_type().to_string();
        self.factories.write().insert(backend_type.clone(), factory);
        tracing::debug!("Storage factory registered: {}", backend_type);
    }

    /// List all available backend types / 列出所有可用的后端类型
    pub fn backend_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Create the backend named in settings / 根据配置创建存储实例
    pub fn create_storage(
        &self,
        settings: &StorageSettings,
        ciphers: &CipherRegistry,
    ) -> StorageResult<StorageBox> {
        let factory = self.factories.read().get(&settings.backend).cloned();
        let factory = factory.ok_or_else(|| {
            StorageError::Config(format!(
                "Storage backend not found: {} (available: {})",
                settings.backend,
                self.backend_types().join(", ")
            ))
        })?;

        match factory.create_storage(settings, ciphers) {
            Ok(storage) => {
                tracing::info!("Storage created: {}", settings.backend);
                Ok(storage)
            }
            Err(e) => {
                tracing::error!("Storage creation failed: {} - {}", settings.backend, e);
                Err(e)
            }
        }
    }
}

/// Create the configured storage with the built-in backends / 使用内置后端创建存储
pub fn create_storage(
    settings: &StorageSettings,
    ciphers: &CipherRegistry,
) -> StorageResult<StorageBox> {
    BackendRegistry::with_defaults().create_storage(settings, ciphers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backends() {
        let registry = BackendRegistry::with_defaults();
        assert_eq!(registry.backend_types(), vec!["local".to_string(), "qiniu".to_string()]);
    }

    #[test]
    fn test_unknown_backend() {
        let mut settings = StorageSettings::default();
        settings.backend = "ftp".to_string();
        let result = create_storage(&settings, &CipherRegistry::new());
        assert!(matches!(result, Err(StorageError::Config(_))));
    }

    #[test]
    fn test_create_qiniu() {
        let mut settings = StorageSettings::default();
        settings.qiniu.access_key = "ak".to_string();
        settings.qiniu.secret_key = "sk".to_string();
        settings.qiniu.bucket = "test".to_string();
        settings.qiniu.bucket_host = "cdn.example.com".to_string();

        let storage = create_storage(&settings, &CipherRegistry::new()).unwrap();
        assert_eq!(storage.name(), "qiniu");
        assert_eq!(storage.url("img.png").unwrap(), "http://cdn.example.com/img.png");
    }

    #[test]
    fn test_create_qiniu_with_builtin_aes() {
        let mut settings = StorageSettings::default();
        settings.qiniu.bucket = "test".to_string();
        settings.qiniu.encrypt_func = Some("aes".to_string());
        settings.qiniu.aes_key = Some("0123456789abcdef".to_string());

        let ciphers = CipherRegistry::with_builtin(settings.qiniu.aes_key.as_deref()).unwrap();
        let storage = create_storage(&settings, &ciphers).unwrap();
        assert_eq!(storage.name(), "qiniu");

        // without a key "aes" is not registered
        let ciphers = CipherRegistry::with_builtin(None).unwrap();
        assert!(matches!(
            create_storage(&settings, &ciphers),
            Err(StorageError::Config(_))
        ));
    }

    #[test]
    fn test_create_qiniu_unresolved_cipher() {
        let mut settings = StorageSettings::default();
        settings.qiniu.encrypt_func = Some("myapp.crypto.encrypt".to_string());
        let result = create_storage(&settings, &CipherRegistry::new());
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
