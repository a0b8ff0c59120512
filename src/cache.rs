//! OCR結果キャッシュモジュール
//!
//! 切り抜き後JPEGのSHA-256をキーにOCRの行データを保存し、
//! 同じ切り抜きの再アップロード・再OCRをスキップする。

use crate::error::Result;
use pantry_scan_common::Line;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = ".ocr-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrCache {
    /// バージョン（互換性チェック用）
    version: u32,
    /// JPEGハッシュ → OCR結果
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 元画像ファイル名
    pub file_name: String,
    /// JPEGのバイト数
    pub byte_len: usize,
    pub lines: Vec<Line>,
}

impl OcrCache {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（無い・壊れている場合は空）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        let reader = BufReader::new(file);
        match serde_json::from_reader::<_, OcrCache>(reader) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                log::warn!("[CACHE] キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                log::warn!("[CACHE] キャッシュ読み込み失敗: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::cache_path(folder))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// キャッシュファイルを削除。存在しなければ false
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, hash: &str) -> Option<&[Line]> {
        self.entries.get(hash).map(|e| e.lines.as_slice())
    }

    pub fn insert(&mut self, hash: String, file_name: String, byte_len: usize, lines: Vec<Line>) {
        self.entries.insert(hash, CacheEntry {
            file_name,
            byte_len,
            lines,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OcrCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// バイト列のSHA-256（16進）
pub fn compute_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
