//! 七牛云存储驱动模块
//! Qiniu cloud storage driver module
//!
//! 基于七牛 HTTP API（上传 / 下载 / stat / delete）实现的存储后端
//! Storage backend built on Qiniu's upload, download, stat and delete APIs

mod auth;
mod types;
mod driver;
mod factory;

#[cfg(test)]
mod tests;

pub use auth::{encoded_entry_uri, Credentials, PutPolicy};
pub use driver::{QiniuFile, QiniuStorage};
pub use factory::QiniuStorageFactory;
pub use types::{QiniuConfig, StatInfo};
