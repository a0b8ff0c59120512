//! 分割アップロードの計画
//!
//! サーバ側の分割アップロードに合わせて、バイト列をチャンクに分ける。
//! 最後のチャンクのみ短くなりうる。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// サーバ既定のチャンクサイズ（50MB）
pub const DEFAULT_CHUNK_SIZE: usize = 50 * 1024 * 1024;

/// アップロード初期化の応答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInfo {
    pub upload_id: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// チャンク分割の計画
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPlan {
    total_size: usize,
    chunk_size: usize,
    chunk_count: usize,
}

impl UploadPlan {
    /// # Errors
    /// - `total_size == 0`: `Error::EmptyPayload`（通信前に中断する）
    /// - `chunk_size == 0`: `Error::InvalidUpload`
    pub fn new(total_size: usize, chunk_size: usize) -> Result<Self> {
        if total_size == 0 {
            return Err(Error::EmptyPayload);
        }
        if chunk_size == 0 {
            return Err(Error::InvalidUpload("chunk size must be positive".into()));
        }

        Ok(Self {
            total_size,
            chunk_size,
            chunk_count: total_size.div_ceil(chunk_size),
        })
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// `(index, chunk)` の列
    ///
    /// # Errors
    /// `bytes` の長さが計画と異なる場合は `Error::InvalidUpload`
    pub fn chunks<'a>(&self, bytes: &'a [u8]) -> Result<impl Iterator<Item = (usize, &'a [u8])>> {
        if bytes.len() != self.total_size {
            return Err(Error::InvalidUpload(format!(
                "expected {} bytes, got {}",
                self.total_size,
                bytes.len()
            )));
        }
        Ok(bytes.chunks(self.chunk_size).enumerate())
    }
}
