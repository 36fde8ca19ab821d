//! Content encryption hooks / 内容加密钩子
//!
//! An adapter may carry one [`ContentCipher`]. It is applied to every upload and to
//! full (non-ranged) downloads. Ranged downloads are returned as stored; callers
//! reassemble the chunks and decrypt them themselves.
//!
//! Ciphers are supplied either directly (any closure with the right signature) or
//! by name through a [`CipherRegistry`] resolved once when the adapter is built.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{StorageError, StorageResult};

/// Setting name reported when a cipher name cannot be resolved
pub const ENCRYPT_FUNC_SETTING: &str = "QINIU_ENCRYPT_FUNC";

/// Name the built-in [`AesCbcCipher`] is registered under / 内置 AES 加密器名称
pub const AES_CIPHER_NAME: &str = "aes";

const BLOCK_SIZE: usize = 16;

/// Direction of a cipher call / 加解密方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherDirection {
    Encrypt,
    Decrypt,
}

/// Content cipher applied around uploads and full downloads / 内容加解密接口
pub trait ContentCipher: Send + Sync {
    fn encrypt(&self, data: &[u8]) -> StorageResult<Vec<u8>>;

    fn decrypt(&self, data: &[u8]) -> StorageResult<Vec<u8>>;
}

impl<F> ContentCipher for F
where
    F: Fn(&[u8], CipherDirection) -> StorageResult<Vec<u8>> + Send + Sync,
{
    fn encrypt(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        self(data, CipherDirection::Encrypt)
    }

    fn decrypt(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        self(data, CipherDirection::Decrypt)
    }
}

/// Shared cipher handle / 共享的加密器
pub type CipherRef = Arc<dyn ContentCipher>;

/// Named cipher registry / 加密器注册表
#[derive(Clone, Default)]
pub struct CipherRegistry {
    ciphers: HashMap<String, CipherRef>,
}

impl CipherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in ciphers / 包含内置加密器的注册表
    ///
    /// `"aes"` is registered only when a key is configured; a key that is not
    /// exactly 16 bytes is a configuration error.
    pub fn with_builtin(aes_key: Option<&str>) -> StorageResult<Self> {
        let mut registry = Self::new();
        if let Some(key) = aes_key.filter(|k| !k.is_empty()) {
            let cipher = AesCbcCipher::from_slice(key.as_bytes())?;
            registry.register(AES_CIPHER_NAME, Arc::new(cipher));
        }
        Ok(registry)
    }

    /// Register a cipher under a name, replacing any previous one / 注册加密器
    pub fn register(&mut self, name: impl Into<String>, cipher: CipherRef) -> &mut Self {
        let name = name.into();
        tracing::debug!("Cipher registered: {}", name);
        self.ciphers.insert(name, cipher);
        self
    }

    pub fn get(&self, name: &str) -> Option<CipherRef> {
        self.ciphers.get(name).cloned()
    }

    /// Resolve a configured cipher name, failing fast when unknown / 解析配置的加密器
    pub fn resolve(&self, name: &str) -> StorageResult<CipherRef> {
        self.get(name).ok_or_else(|| {
            StorageError::Config(format!(
                "Could not resolve '{}' for setting '{}': no cipher registered under that name",
                name, ENCRYPT_FUNC_SETTING
            ))
        })
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ciphers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for CipherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherRegistry")
            .field("ciphers", &self.names())
            .finish()
    }
}

/// AES-128-CBC cipher with PKCS7 padding / AES-128-CBC 加密器
///
/// Output layout: `iv (16 bytes) || ciphertext`. A fresh random IV is drawn per call.
pub struct AesCbcCipher {
    cipher: Aes128,
}

impl AesCbcCipher {
    pub fn new(key: [u8; 16]) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(&key)),
        }
    }

    /// Build from a key slice, which must be exactly 16 bytes / 从密钥切片创建
    pub fn from_slice(key: &[u8]) -> StorageResult<Self> {
        let key: [u8; 16] = key
            .try_into()
            .map_err(|_| StorageError::Config(format!("AES key must be 16 bytes, got {}", key.len())))?;
        Ok(Self::new(key))
    }

    fn encrypt_with_iv(&self, plaintext: &[u8], iv: [u8; BLOCK_SIZE]) -> Vec<u8> {
        let padded = pkcs7_pad(plaintext);
        let mut result = Vec::with_capacity(BLOCK_SIZE + padded.len());
        result.extend_from_slice(&iv);

        let mut prev_block = iv;
        for chunk in padded.chunks(BLOCK_SIZE) {
            let mut block = GenericArray::clone_from_slice(chunk);
            for (b, p) in block.iter_mut().zip(prev_block.iter()) {
                *b ^= p;
            }
            self.cipher.encrypt_block(&mut block);
            prev_block.copy_from_slice(&block);
            result.extend_from_slice(&block);
        }

        result
    }
}

impl ContentCipher for AesCbcCipher {
    fn encrypt(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        Ok(self.encrypt_with_iv(data, rand::random::<[u8; BLOCK_SIZE]>()))
    }

    fn decrypt(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        if data.len() < 2 * BLOCK_SIZE || data.len() % BLOCK_SIZE != 0 {
            return Err(StorageError::Cipher(format!(
                "ciphertext length {} is not a whole number of blocks",
                data.len()
            )));
        }

        let (iv, body) = data.split_at(BLOCK_SIZE);
        let mut result = Vec::with_capacity(body.len());
        let mut prev_block = iv;

        for chunk in body.chunks(BLOCK_SIZE) {
            let mut block = GenericArray::clone_from_slice(chunk);
            self.cipher.decrypt_block(&mut block);
            result.extend(block.iter().zip(prev_block.iter()).map(|(a, b)| a ^ b));
            prev_block = chunk;
        }

        pkcs7_unpad(&result).ok_or_else(|| StorageError::Cipher("bad padding".to_string()))
    }
}

/// PKCS7填充 / PKCS7 padding
fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let padding = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut padded = data.to_vec();
    padded.extend(std::iter::repeat(padding as u8).take(padding));
    padded
}

/// PKCS7去填充 / PKCS7 unpad
fn pkcs7_unpad(data: &[u8]) -> Option<Vec<u8>> {
    let padding = *data.last()? as usize;
    if padding == 0 || padding > BLOCK_SIZE || padding > data.len() {
        return None;
    }
    if !data[data.len() - padding..].iter().all(|b| *b as usize == padding) {
        return None;
    }
    Some(data[..data.len() - padding].to_vec())
}
