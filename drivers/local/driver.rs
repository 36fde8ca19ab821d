use async_trait::async_trait;
use bytes::Bytes;
use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{StorageError, StorageResult};
use crate::storage::{
    BufferedFile, ByteRange, ContentRange, FileBackend, OpenMode, Storage, StorageFile,
};
use crate::utils::{clean_name, encode_path};

/// 本地文件句柄 / Local file handle
pub type LocalFile<'a> = BufferedFile<'a, LocalStorage>;

pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalStorage {
    pub fn new(root: PathBuf, base_url: String) -> Self {
        Self { root, base_url }
    }

    /// Get root directory / 获取根目录
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn open_file(&self, name: &str, mode: OpenMode) -> LocalFile<'_> {
        BufferedFile::new(clean_name(name), self, mode)
    }

    /// Map a name under the root, rejecting names that escape it / 将文件名映射到根目录下
    fn full_path(&self, name: &str) -> StorageResult<PathBuf> {
        let name = clean_name(name);
        let relative = name.trim_start_matches('/');

        if relative == ".." || relative.starts_with("../") {
            return Err(StorageError::InvalidName(format!(
                "{} exceeds root directory scope",
                name
            )));
        }
        if relative == "." || relative.is_empty() {
            return Ok(self.root.clone());
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn name(&self) -> &str {
        "local"
    }

    fn open<'a>(&'a self, name: &str, mode: OpenMode) -> StorageResult<Box<dyn StorageFile + 'a>> {
        self.full_path(name)?;
        Ok(Box::new(self.open_file(name, mode)))
    }

    async fn save(&self, name: &str, content: Bytes) -> StorageResult<String> {
        let name = self.get_available_name(name).await?;
        self.put_file(&name, content).await?;
        Ok(name)
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let full_path = self.full_path(name)?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::info!("Local deleted: {:?}", full_path);
                Ok(())
            }
            // 文件不存在视为已删除
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let full_path = self.full_path(name)?;
        Ok(tokio::fs::try_exists(&full_path).await?)
    }

    async fn size(&self, name: &str) -> StorageResult<u64> {
        let full_path = self.full_path(name)?;
        match tokio::fs::metadata(&full_path).await {
            Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
            Ok(_) => Ok(0),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn url(&self, name: &str) -> StorageResult<String> {
        let name = clean_name(name);
        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            encode_path(name.trim_start_matches('/'))
        ))
    }
}

#[async_trait]
impl FileBackend for LocalStorage {
    async fn read_range(
        &self,
        name: &str,
        range: Option<ByteRange>,
    ) -> StorageResult<(Bytes, Option<ContentRange>)> {
        let full_path = self.full_path(name)?;

        let Some(range) = range else {
            let data = tokio::fs::read(&full_path).await?;
            return Ok((Bytes::from(data), None));
        };

        let mut file = tokio::fs::File::open(&full_path).await?;
        let total = file.metadata().await?.len();
        if range.start >= total {
            return Ok((Bytes::new(), None));
        }

        file.seek(SeekFrom::Start(range.start)).await?;
        let mut data = Vec::with_capacity(range.byte_len().min(total - range.start) as usize);
        file.take(range.byte_len()).read_to_end(&mut data).await?;

        let content_range = ContentRange {
            start: range.start,
            end: range.start + data.len() as u64 - 1,
            total: Some(total),
        };
        Ok((Bytes::from(data), Some(content_range)))
    }

    async fn put_file(&self, name: &str, content: Bytes) -> StorageResult<()> {
        let full_path = self.full_path(name)?;

        // Ensure parent directory exists / 确保父目录存在
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, &content).await?;

        tracing::info!("Local saved: {:?} ({} bytes)", full_path, content.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path().to_path_buf(), "http://localhost/media/".to_string())
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let name = storage
            .save("docs\\report.txt", Bytes::from_static(b"quarterly numbers"))
            .await
            .unwrap();
        assert_eq!(name, "docs/report.txt");
        assert!(storage.exists(&name).await.unwrap());
        assert_eq!(storage.size(&name).await.unwrap(), 17);

        let mut file = storage.open(&name, OpenMode::Read).unwrap();
        assert_eq!(file.read(None).await.unwrap(), Bytes::from_static(b"quarterly numbers"));
        assert_eq!(file.size().await.unwrap(), 17);
    }

    #[tokio::test]
    async fn test_save_collision() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        assert_eq!(storage.save("a/b.txt", Bytes::from_static(b"1")).await.unwrap(), "a/b.txt");
        assert_eq!(storage.save("a/b.txt", Bytes::from_static(b"2")).await.unwrap(), "a/b_1.txt");
        assert_eq!(storage.save("a/b.txt", Bytes::from_static(b"3")).await.unwrap(), "a/b_2.txt");
    }

    #[tokio::test]
    async fn test_chunked_reads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        let content: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
        storage.put_file("blob.bin", Bytes::from(content.clone())).await.unwrap();

        let mut file = storage.open_file("blob.bin", OpenMode::Read);
        let first = file.read(Some(100)).await.unwrap();
        let second = file.read(Some(100)).await.unwrap();
        let third = file.read(Some(100)).await.unwrap();
        let fourth = file.read(Some(100)).await.unwrap();

        assert_eq!(&first[..], &content[0..100]);
        assert_eq!(&second[..], &content[100..200]);
        assert_eq!(&third[..], &content[200..250]);
        assert!(fourth.is_empty());
        assert_eq!(file.position(), 250);
    }

    #[tokio::test]
    async fn test_read_rest_with_huge_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage.put_file("f.txt", Bytes::from_static(b"0123456789")).await.unwrap();

        let mut file = storage.open_file("f.txt", OpenMode::Read);
        assert_eq!(file.read(Some(4)).await.unwrap(), Bytes::from_static(b"0123"));
        assert_eq!(file.read(Some(u64::MAX)).await.unwrap(), Bytes::from_static(b"456789"));
        assert_eq!(file.position(), 10);
    }

    #[tokio::test]
    async fn test_write_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let mut file = storage.open("new.txt", OpenMode::Write).unwrap();
        file.write(Bytes::from_static(b"pending")).await.unwrap();
        assert!(!storage.exists("new.txt").await.unwrap());
        file.close().await.unwrap();
        assert!(storage.exists("new.txt").await.unwrap());

        let mut file = storage.open("new.txt", "rb".parse().unwrap()).unwrap();
        assert!(matches!(
            file.write(Bytes::from_static(b"x")).await,
            Err(StorageError::ReadOnly(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        storage.put_file("gone.txt", Bytes::from_static(b"x")).await.unwrap();
        storage.delete("gone.txt").await.unwrap();
        assert!(!storage.exists("gone.txt").await.unwrap());
        assert_eq!(storage.size("gone.txt").await.unwrap(), 0);
        storage.delete("gone.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_escape_root_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        assert!(matches!(
            storage.exists("../outside.txt").await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(storage.open("a/../../etc/passwd", OpenMode::Read).is_err());
        // absolute names stay inside the root
        assert_eq!(storage.full_path("/abs.txt").unwrap(), dir.path().join("abs.txt"));
    }

    #[test]
    fn test_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        assert_eq!(storage.url("a\\b c.png").unwrap(), "http://localhost/media/a/b%20c.png");
    }
}
