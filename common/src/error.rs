//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 画像のロード/レイアウト完了前にジオメトリを参照した
    #[error("Image not ready: crop geometry is unavailable until the image has loaded")]
    GeometryNotReady,

    /// 幅または高さが0以下の選択範囲
    #[error("Degenerate selection: {width}x{height}")]
    DegenerateSelection { width: f64, height: f64 },

    /// 確定済みのコントローラへの操作
    #[error("Crop already confirmed")]
    AlreadyConfirmed,

    /// 0バイトのアップロード
    #[error("Empty payload: nothing to upload")]
    EmptyPayload,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
