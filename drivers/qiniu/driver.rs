//! 七牛存储核心实现
//!
//! 设计原则：
//! - 上传与完整下载都在内存中完成
//! - 完整下载自动解密，范围下载不解密（由调用方拼接后自行解密）
//! - 服务端错误原样转为 StorageError::Provider，不重试

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};

use super::auth::{deadline_after, encoded_entry_uri, Credentials, PutPolicy};
use super::types::{ErrorResponse, PutRet, QiniuConfig, StatInfo, STATUS_NO_SUCH_ENTRY};
use crate::cipher::{CipherRef, CipherRegistry};
use crate::error::{StorageError, StorageResult};
use crate::storage::{
    BufferedFile, ByteRange, ContentRange, FileBackend, OpenMode, Storage, StorageFile,
};
use crate::utils::{clean_name, encode_path};

/// 七牛文件句柄 / Qiniu file handle
pub type QiniuFile<'a> = BufferedFile<'a, QiniuStorage>;

/// 七牛存储 / Qiniu storage
pub struct QiniuStorage {
    config: QiniuConfig,
    credentials: Credentials,
    cipher: Option<CipherRef>,
    client: Client,
}

impl QiniuStorage {
    /// 创建七牛存储实例 / Create a Qiniu storage
    ///
    /// A configured `encrypt_func` is resolved against `ciphers` here, so an unknown
    /// name fails immediately instead of on the first upload.
    pub fn new(config: QiniuConfig, ciphers: &CipherRegistry) -> StorageResult<Self> {
        let cipher = match config.encrypt_func.as_deref() {
            Some(name) if !name.is_empty() => Some(ciphers.resolve(name)?),
            _ => None,
        };

        let client = Client::builder().build()?;
        let credentials = Credentials::new(&config.access_key, &config.secret_key);

        tracing::debug!(
            "Qiniu storage created: bucket={}, host={}, private={}, encrypted={}",
            config.bucket,
            config.bucket_host,
            config.is_private,
            cipher.is_some()
        );

        Ok(Self {
            config,
            credentials,
            cipher,
            client,
        })
    }

    /// 直接指定加密器（覆盖 encrypt_func）/ Use a cipher value directly
    pub fn with_cipher(mut self, cipher: CipherRef) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn config(&self) -> &QiniuConfig {
        &self.config
    }

    /// 打开七牛文件句柄 / Open a typed Qiniu handle
    pub fn open_file(&self, name: &str, mode: OpenMode) -> QiniuFile<'_> {
        BufferedFile::new(clean_name(name), self, mode)
    }

    /// 不带签名的下载地址 / Plain download URL: `host/name`
    fn base_url(&self, name: &str) -> String {
        let host = self.config.bucket_host.trim_end_matches('/');
        let host = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        };
        format!("{}/{}", host, encode_path(name))
    }

    /// 调用资源管理接口 / Call a management (rs) endpoint
    async fn rs_post(&self, path: &str) -> StorageResult<Response> {
        let url = format!("{}{}", self.config.rs_host.trim_end_matches('/'), path);
        let token = self.credentials.management_token(path, None);

        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, token)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await?;
        Ok(resp)
    }

    /// 查询文件信息，文件不存在时返回None / Stat an object, `None` when absent
    pub async fn stat(&self, name: &str) -> StorageResult<Option<StatInfo>> {
        let name = clean_name(name);
        let path = format!("/stat/{}", encoded_entry_uri(&self.config.bucket, &name));

        tracing::debug!("Qiniu stat: {}", name);
        let resp = self.rs_post(&path).await?;
        let status = resp.status();

        if status.is_success() {
            let info: StatInfo = resp.json().await?;
            return Ok(Some(info));
        }
        if is_missing(status) {
            return Ok(None);
        }
        Err(provider_error(resp).await)
    }

    /// 上传凭证 / Upload token scoped to the bucket
    fn upload_token(&self) -> StorageResult<String> {
        let policy = PutPolicy::new(&self.config.bucket, self.config.upload_token_ttl);
        self.credentials.upload_token(&policy)
    }
}

fn is_missing(status: StatusCode) -> bool {
    status.as_u16() == STATUS_NO_SUCH_ENTRY || status == StatusCode::NOT_FOUND
}

/// 将失败的响应转为存储错误 / Turn a failed response into a provider error
async fn provider_error(resp: Response) -> StorageError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(err) if !err.error.is_empty() => err.error,
        _ => text,
    };
    tracing::warn!("Qiniu request failed: {} {}", status, message);
    StorageError::provider(status, message)
}

#[async_trait]
impl Storage for QiniuStorage {
    fn name(&self) -> &str {
        "qiniu"
    }

    fn open<'a>(&'a self, name: &str, mode: OpenMode) -> StorageResult<Box<dyn StorageFile + 'a>> {
        Ok(Box::new(self.open_file(name, mode)))
    }

    async fn save(&self, name: &str, content: Bytes) -> StorageResult<String> {
        let name = self.get_available_name(name).await?;
        self.put_file(&name, content).await?;
        Ok(name)
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let name = clean_name(name);
        let path = format!("/delete/{}", encoded_entry_uri(&self.config.bucket, &name));

        let resp = self.rs_post(&path).await?;
        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        tracing::info!("Qiniu deleted: {}", name);
        Ok(())
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.stat(name).await?.is_some())
    }

    async fn size(&self, name: &str) -> StorageResult<u64> {
        Ok(self.stat(name).await?.map(|info| info.fsize).unwrap_or(0))
    }

    fn url(&self, name: &str) -> StorageResult<String> {
        let base_url = self.base_url(&clean_name(name));
        if self.config.is_private {
            let deadline = deadline_after(self.config.private_url_ttl);
            Ok(self.credentials.private_download_url(&base_url, deadline))
        } else {
            Ok(base_url)
        }
    }
}

#[async_trait]
impl FileBackend for QiniuStorage {
    async fn read_range(
        &self,
        name: &str,
        range: Option<ByteRange>,
    ) -> StorageResult<(Bytes, Option<ContentRange>)> {
        let url = self.url(name)?;

        let mut request = self.client.get(&url);
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }

        tracing::debug!("Qiniu get: {} range={:?}", name, range);
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        let content_range = match resp.headers().get(CONTENT_RANGE) {
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| StorageError::InvalidContentRange(format!("{:?}", value)))?;
                Some(value.parse::<ContentRange>()?)
            }
            None => None,
        };

        let data = resp.bytes().await?;
        let data = match (&range, &self.cipher) {
            (None, Some(cipher)) => Bytes::from(cipher.decrypt(&data)?),
            _ => data,
        };

        Ok((data, content_range))
    }

    async fn put_file(&self, name: &str, content: Bytes) -> StorageResult<()> {
        let name = clean_name(name);
        let content = match &self.cipher {
            Some(cipher) => cipher.encrypt(&content)?,
            None => content.to_vec(),
        };
        let size = content.len();

        let token = self.upload_token()?;
        let file_name = name.rsplit('/').next().unwrap_or(&name).to_string();
        let mime = mime_guess::from_path(&name).first_or_octet_stream();
        let part = Part::bytes(content)
            .file_name(file_name)
            .mime_str(mime.as_ref())?;
        let form = Form::new()
            .text("token", token)
            .text("key", name.clone())
            .part("file", part);

        let resp = self
            .client
            .post(&self.config.up_host)
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        match resp.json::<PutRet>().await {
            Ok(ret) => tracing::info!("Qiniu uploaded: {} ({} bytes, hash={})", name, size, ret.hash),
            Err(_) => tracing::info!("Qiniu uploaded: {} ({} bytes)", name, size),
        }
        Ok(())
    }
}
