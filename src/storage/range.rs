//! HTTP `Range` / `Content-Range` helpers / 范围请求头处理
//!
//! Request:  `bytes=<start>-<end>` (inclusive)
//! Response: `bytes <start>-<end>/<total>`

use std::fmt;
use std::str::FromStr;

use crate::error::StorageError;

/// Inclusive byte range for a `Range` request header / 请求的字节范围（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Range covering `len` bytes from `start`; `None` when `len` is 0
    ///
    /// The end is clamped at `u64::MAX`.
    pub fn from_len(start: u64, len: u64) -> Option<Self> {
        if len == 0 {
            return None;
        }
        Some(Self {
            start,
            end: start.saturating_add(len - 1),
        })
    }

    /// Number of bytes covered, saturating at `u64::MAX` / 覆盖的字节数
    pub fn byte_len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// Header value / 请求头值
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Parsed `Content-Range` response header / 解析后的 Content-Range 响应头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    /// Total resource size, `None` for `*` / 资源总大小
    pub total: Option<u64>,
}

impl ContentRange {
    /// Offset right after this range / 下一次读取的起始位置
    pub fn next_offset(&self) -> u64 {
        self.end.saturating_add(1)
    }
}

impl FromStr for ContentRange {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StorageError::InvalidContentRange(s.to_string());

        let (unit, rest) = s.trim().split_once(' ').ok_or_else(invalid)?;
        if !unit.eq_ignore_ascii_case("bytes") {
            return Err(invalid());
        }

        let (current, total) = rest.trim().split_once('/').ok_or_else(invalid)?;
        let (start, end) = current.split_once('-').ok_or_else(invalid)?;

        let start: u64 = start.trim().parse().map_err(|_| invalid())?;
        let end: u64 = end.trim().parse().map_err(|_| invalid())?;
        if end < start {
            return Err(invalid());
        }

        let total = match total.trim() {
            "*" => None,
            t => Some(t.parse::<u64>().map_err(|_| invalid())?),
        };

        Ok(Self { start, end, total })
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "bytes {}-{}/{}", self.start, self.end, total),
            None => write!(f, "bytes {}-{}/*", self.start, self.end),
        }
    }
}
