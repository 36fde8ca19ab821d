// Driver package / 驱动包
pub mod local;
pub mod qiniu;

use std::sync::Arc;

use crate::storage::{BackendRegistry, LocalStorageFactory};

/// Register all backends to BackendRegistry / 注册所有存储后端
pub fn register_all(registry: &BackendRegistry) {
    // Register local filesystem backend / 注册本地存储
    registry.register_factory(Arc::new(LocalStorageFactory));
    // Register Qiniu backend / 注册七牛云存储
    registry.register_factory(Arc::new(qiniu::QiniuStorageFactory));
}
