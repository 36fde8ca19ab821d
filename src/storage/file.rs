//! Buffered file handle shared by the backends / 后端共用的缓冲文件句柄
//!
//! The handle never streams: a write replaces the whole buffer and is uploaded on
//! `close`, a read fetches either the whole object or one range.

use async_trait::async_trait;
use bytes::Bytes;

use super::{ByteRange, ContentRange, OpenMode, Storage, StorageFile};
use crate::error::{StorageError, StorageResult};

/// Primitive operations a handle needs from its backend / 句柄依赖的后端原语
#[async_trait]
pub trait FileBackend: Storage {
    /// Fetch the object, or one inclusive range of it / 读取整个对象或指定范围
    ///
    /// Full reads are decrypted when a cipher is configured, ranged reads never are.
    /// The second element is the response's content range, when the backend reports one.
    async fn read_range(
        &self,
        name: &str,
        range: Option<ByteRange>,
    ) -> StorageResult<(Bytes, Option<ContentRange>)>;

    /// Store content under an exact name, overwriting / 按指定名称写入（覆盖）
    async fn put_file(&self, name: &str, content: Bytes) -> StorageResult<()>;
}

/// Buffered file handle / 缓冲文件句柄
pub struct BufferedFile<'a, B: FileBackend + ?Sized> {
    name: String,
    storage: &'a B,
    mode: OpenMode,
    is_dirty: bool,
    closed: bool,
    buffer: Bytes,
    /// Offset of the next ranged read / 下一次范围读取的起始位置
    start_range: u64,
    size: Option<u64>,
}

impl<'a, B: FileBackend + ?Sized> BufferedFile<'a, B> {
    /// `name` must already be normalized / name 需已规范化
    pub fn new(name: String, storage: &'a B, mode: OpenMode) -> Self {
        Self {
            name,
            storage,
            mode,
            is_dirty: false,
            closed: false,
            buffer: Bytes::new(),
            start_range: 0,
            size: None,
        }
    }

    /// Current buffer content / 当前缓冲区内容
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Offset the next ranged read starts at / 下一次范围读取的起始位置
    pub fn position(&self) -> u64 {
        self.start_range
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::Closed(self.name.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl<'a, B: FileBackend + ?Sized> StorageFile for BufferedFile<'a, B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    async fn read(&mut self, num_bytes: Option<u64>) -> StorageResult<Bytes> {
        self.ensure_open()?;

        let range = match num_bytes {
            None => {
                self.start_range = 0;
                None
            }
            Some(n) => match ByteRange::from_len(self.start_range, n) {
                Some(range) => Some(range),
                None => return Ok(Bytes::new()),
            },
        };

        let (data, content_range) = self.storage.read_range(&self.name, range).await?;

        if let Some(content_range) = content_range {
            if let Some(total) = content_range.total {
                self.size = Some(total);
            }
            self.start_range = content_range.next_offset();
        }

        tracing::debug!(
            "Read {} bytes from {} (next offset {})",
            data.len(),
            self.name,
            self.start_range
        );

        self.buffer = data.clone();
        Ok(data)
    }

    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.ensure_open()?;
        if !self.mode.is_writable() {
            return Err(StorageError::ReadOnly(self.name.clone()));
        }
        self.buffer = data;
        self.is_dirty = true;
        Ok(())
    }

    async fn size(&mut self) -> StorageResult<u64> {
        self.ensure_open()?;
        if let Some(size) = self.size {
            return Ok(size);
        }
        let size = Storage::size(self.storage, &self.name).await?;
        self.size = Some(size);
        Ok(size)
    }

    async fn close(&mut self) -> StorageResult<()> {
        if self.closed {
            return Ok(());
        }
        if self.is_dirty {
            self.storage.put_file(&self.name, self.buffer.clone()).await?;
            self.is_dirty = false;
        }
        self.buffer = Bytes::new();
        self.closed = true;
        Ok(())
    }
}
