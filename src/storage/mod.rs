use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

use crate::error::{StorageError, StorageResult};
use crate::utils::{clean_name, numbered_name};

/// File open mode / 文件打开模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// "r", "rb"
    Read,
    /// "w", "wb"
    Write,
    /// "r+", "w+", "rb+" ...
    ReadWrite,
    /// "a", "ab"
    Append,
}

impl OpenMode {
    pub fn is_readable(&self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    /// Whether `write` is allowed / 是否可写
    pub fn is_writable(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        OpenMode::Read
    }
}

impl FromStr for OpenMode {
    type Err = StorageError;

    /// Parse a stdio-style mode string ("rb", "wb", "r+b", "ab") / 解析模式字符串
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let base: String = s.chars().filter(|c| *c != 'b' && *c != 't').collect();
        match base.as_str() {
            "r" => Ok(OpenMode::Read),
            "w" | "x" => Ok(OpenMode::Write),
            "a" => Ok(OpenMode::Append),
            "r+" | "w+" | "a+" | "x+" => Ok(OpenMode::ReadWrite),
            _ => Err(StorageError::Config(format!("Invalid open mode: {:?}", s))),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpenMode::Read => "rb",
            OpenMode::Write => "wb",
            OpenMode::ReadWrite => "r+b",
            OpenMode::Append => "ab",
        };
        f.write_str(s)
    }
}

/// Storage interface (the capability set host applications consume) / 存储接口
///
/// Every name passed in is normalized with [`clean_name`] before touching the backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Backend name / 后端名称
    fn name(&self) -> &str;

    /// Open a file handle without performing I/O / 打开文件句柄（不产生I/O）
    fn open<'a>(&'a self, name: &str, mode: OpenMode) -> StorageResult<Box<dyn StorageFile + 'a>>;

    /// Save content under a collision-free name, returning the name used / 保存文件并返回最终文件名
    async fn save(&self, name: &str, content: Bytes) -> StorageResult<String>;

    /// Delete a file / 删除文件
    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// Check whether a file exists / 判断文件是否存在
    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// File size in bytes, 0 when absent / 文件大小，不存在时为0
    async fn size(&self, name: &str) -> StorageResult<u64>;

    /// Public (or signed) URL of a file / 文件访问URL
    fn url(&self, name: &str) -> StorageResult<String>;

    /// Return a name that does not exist yet / 返回一个尚不存在的文件名
    ///
    /// While the candidate exists, `_1`, `_2`, ... is inserted before the extension.
    /// `a/b.txt` with `b.txt` and `b_1.txt` taken yields `a/b_2.txt`.
    async fn get_available_name(&self, name: &str) -> StorageResult<String> {
        let name = clean_name(name);
        let mut candidate = name.clone();
        let mut count = 0u64;

        while self.exists(&candidate).await? {
            count += 1;
            candidate = numbered_name(&name, count);
        }

        if count > 0 {
            tracing::debug!("Name {} taken, using {}", name, candidate);
        }
        Ok(candidate)
    }
}

/// Open file handle / 文件句柄
///
/// States: open-clean, open-dirty (write buffered), closed. Only `close` persists
/// buffered writes.
#[async_trait]
pub trait StorageFile: Send {
    /// Normalized file name / 规范化后的文件名
    fn name(&self) -> &str;

    fn mode(&self) -> OpenMode;

    /// Whether a write is pending upload / 是否有待上传的写入
    fn is_dirty(&self) -> bool;

    /// Read the whole file (`None`) or the next `n` bytes / 读取整个文件或接下来的n字节
    async fn read(&mut self, num_bytes: Option<u64>) -> StorageResult<Bytes>;

    /// Replace the buffered content / 替换缓冲区内容
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Total file size, fetched once and memoized / 文件大小（首次获取后缓存）
    async fn size(&mut self) -> StorageResult<u64>;

    /// Persist pending writes and release the buffer / 提交写入并释放缓冲区
    async fn close(&mut self) -> StorageResult<()>;
}

pub mod range;
pub mod file;
pub mod manager;
pub mod local_factory;

pub use range::{ByteRange, ContentRange};
pub use file::{BufferedFile, FileBackend};
pub use manager::{BackendRegistry, StorageFactory, StorageBox};
pub use local_factory::LocalStorageFactory;
