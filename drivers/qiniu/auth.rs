//! 七牛鉴权签名
//! Qiniu request signing: management tokens, upload tokens and private download URLs
//!
//! All signatures are `urlsafe_base64(hmac_sha1(secret_key, data))`.

use base64::{engine::general_purpose::URL_SAFE as BASE64_URL, Engine as _};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;

use crate::error::StorageResult;

type HmacSha1 = Hmac<Sha1>;

/// HMAC-SHA1 摘要 / HMAC-SHA1 digest
pub fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// URL安全的Base64编码 / URL-safe base64
pub fn urlsafe_b64(data: &[u8]) -> String {
    BASE64_URL.encode(data)
}

/// EncodedEntryURI = urlsafe_base64("<bucket>:<key>")
pub fn encoded_entry_uri(bucket: &str, key: &str) -> String {
    urlsafe_b64(format!("{}:{}", bucket, key).as_bytes())
}

/// 上传策略 / Upload put policy
#[derive(Debug, Clone, Serialize)]
pub struct PutPolicy {
    /// `<bucket>` or `<bucket>:<key>`
    pub scope: String,
    /// Unix timestamp after which the token is rejected / 过期时间戳
    pub deadline: i64,
}

impl PutPolicy {
    pub fn new(bucket: &str, ttl_secs: u64) -> Self {
        Self {
            scope: bucket.to_string(),
            deadline: deadline_after(ttl_secs),
        }
    }
}

/// Unix timestamp `ttl_secs` from now / 当前时间之后ttl秒的时间戳
pub fn deadline_after(ttl_secs: u64) -> i64 {
    chrono::Utc::now().timestamp() + ttl_secs as i64
}

/// Access/secret key pair / AK/SK 凭证
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// `<ak>:<sign>`
    pub fn sign(&self, data: &[u8]) -> String {
        let digest = hmac_sha1(self.secret_key.as_bytes(), data);
        format!("{}:{}", self.access_key, urlsafe_b64(&digest))
    }

    /// `<ak>:<sign>:<encoded data>` (signature over the encoded data)
    pub fn sign_with_data(&self, data: &[u8]) -> String {
        let encoded = urlsafe_b64(data);
        format!("{}:{}", self.sign(encoded.as_bytes()), encoded)
    }

    /// Authorization header for management (rs) requests / 管理凭证
    ///
    /// Signs `path[?query]\n` followed by the form body, if any.
    pub fn management_token(&self, path_and_query: &str, body: Option<&[u8]>) -> String {
        let mut data = Vec::with_capacity(path_and_query.len() + 1);
        data.extend_from_slice(path_and_query.as_bytes());
        data.push(b'\n');
        if let Some(body) = body {
            data.extend_from_slice(body);
        }
        format!("QBox {}", self.sign(&data))
    }

    /// Upload token for a put policy / 上传凭证
    pub fn upload_token(&self, policy: &PutPolicy) -> StorageResult<String> {
        let policy_json = serde_json::to_vec(policy)?;
        Ok(self.sign_with_data(&policy_json))
    }

    /// Signed, time-limited URL for a private bucket / 私有空间下载链接
    pub fn private_download_url(&self, base_url: &str, deadline: i64) -> String {
        let separator = if base_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}e={}", base_url, separator, deadline);
        let token = self.sign(url.as_bytes());
        format!("{}&token={}", url, token)
    }
}
