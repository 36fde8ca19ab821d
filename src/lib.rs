pub mod cipher;
pub mod config;
pub mod error;
pub mod storage;
pub mod utils;

// Backend modules (point to project root drivers via path attribute) / 后端模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use cipher::{AesCbcCipher, CipherDirection, CipherRef, CipherRegistry, ContentCipher};
pub use config::StorageSettings;
pub use drivers::local::{LocalConfig, LocalFile, LocalStorage};
pub use drivers::qiniu::{QiniuConfig, QiniuFile, QiniuStorage};
pub use error::{StorageError, StorageResult};
pub use storage::manager::create_storage;
pub use storage::{BackendRegistry, OpenMode, Storage, StorageBox, StorageFile};
