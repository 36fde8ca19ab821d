//! 七牛存储类型定义
//! Qiniu storage type definitions

use serde::{Deserialize, Serialize};

/// 七牛配置 / Qiniu configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QiniuConfig {
    /// Access Key
    #[serde(default)]
    pub access_key: String,

    /// Secret Key
    #[serde(default)]
    pub secret_key: String,

    /// 存储空间名称 / Bucket name
    #[serde(default)]
    pub bucket: String,

    /// 下载域名，可带协议头 / Download domain, scheme optional
    #[serde(default)]
    pub bucket_host: String,

    /// 是否为私有空间 / Whether the bucket is private
    #[serde(default)]
    pub is_private: bool,

    /// 加密器名称（在 CipherRegistry 中查找）
    /// Name of a registered content cipher
    #[serde(default)]
    pub encrypt_func: Option<String>,

    /// 内置 AES 加密器的密钥（16字节）/ Key for the built-in "aes" cipher, 16 bytes
    #[serde(default)]
    pub aes_key: Option<String>,

    /// 资源管理域名 / Management API host
    #[serde(default = "default_rs_host")]
    pub rs_host: String,

    /// 上传域名 / Upload host
    #[serde(default = "default_up_host")]
    pub up_host: String,

    /// 上传凭证有效期（秒）/ Upload token lifetime in seconds
    #[serde(default = "default_ttl")]
    pub upload_token_ttl: u64,

    /// 私有链接有效期（秒）/ Signed download URL lifetime in seconds
    #[serde(default = "default_ttl")]
    pub private_url_ttl: u64,
}

fn default_rs_host() -> String {
    "https://rs.qiniu.com".to_string()
}

fn default_up_host() -> String {
    "https://up.qiniu.com".to_string()
}

fn default_ttl() -> u64 {
    3600
}

impl Default for QiniuConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            bucket: String::new(),
            bucket_host: String::new(),
            is_private: false,
            encrypt_func: None,
            aes_key: None,
            rs_host: default_rs_host(),
            up_host: default_up_host(),
            upload_token_ttl: default_ttl(),
            private_url_ttl: default_ttl(),
        }
    }
}

// ============ API 响应结构体 / API Response Structures ============

/// 文件信息 (stat) / File info
#[derive(Debug, Clone, Deserialize)]
pub struct StatInfo {
    /// 文件大小 / File size
    pub fsize: u64,
    /// 文件哈希 / ETag
    #[serde(default)]
    pub hash: String,
    #[serde(default, rename = "mimeType")]
    pub mime_type: String,
    /// 上传时间（100纳秒）/ Put time in 100ns units
    #[serde(default, rename = "putTime")]
    pub put_time: i64,
}

/// 上传返回 / Upload response
#[derive(Debug, Clone, Deserialize)]
pub struct PutRet {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub key: String,
}

/// 错误响应 / Error response
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: String,
}

/// 文件不存在的状态码 / Status code for a missing object
pub const STATUS_NO_SUCH_ENTRY: u16 = 612;
