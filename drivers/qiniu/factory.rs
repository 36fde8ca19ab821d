//! 七牛存储工厂

use std::sync::Arc;

use super::driver::QiniuStorage;
use crate::cipher::CipherRegistry;
use crate::config::StorageSettings;
use crate::error::StorageResult;
use crate::storage::{StorageBox, StorageFactory};

/// 七牛存储工厂
pub struct QiniuStorageFactory;

impl StorageFactory for QiniuStorageFactory {
    fn backend_type(&self) -> &'static str {
        "qiniu"
    }

    fn create_storage(
        &self,
        settings: &StorageSettings,
        ciphers: &CipherRegistry,
    ) -> StorageResult<StorageBox> {
        let storage = QiniuStorage::new(settings.qiniu.clone(), ciphers)?;
        Ok(Arc::new(storage))
    }
}
