use std::path::PathBuf;
use std::sync::Arc;

use super::{StorageBox, StorageFactory};
use crate::cipher::CipherRegistry;
use crate::config::StorageSettings;
use crate::drivers::local;
use crate::error::{StorageError, StorageResult};

pub struct LocalStorageFactory;

impl StorageFactory for LocalStorageFactory {
    fn backend_type(&self) -> &'static str {
        "local"
    }

    fn create_storage(
        &self,
        settings: &StorageSettings,
        _ciphers: &CipherRegistry,
    ) -> StorageResult<StorageBox> {
        let config = &settings.local;
        if config.root.is_empty() {
            return Err(StorageError::Config("缺少 local.root 配置".to_string()));
        }

        let root = PathBuf::from(&config.root);

        // 同步初始化（工厂方法是同步的）
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }
        let canonical_root = root.canonicalize()?;

        tracing::info!("Local storage initialized, root: {:?}", canonical_root);

        Ok(Arc::new(local::LocalStorage::new(
            canonical_root,
            config.base_url.clone(),
        )))
    }
}
