use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("認証トークンが設定されていません。`pantry-scan config --set-token YOUR_TOKEN` で設定してください")]
    MissingToken,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像エンコードエラー: {0}")]
    Encode(String),

    #[error("画像サイズが大きすぎます: {size} bytes（上限 {limit} bytes）。切り抜き範囲を小さくしてください")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("通信エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API呼び出しエラー ({status}): {message}")]
    ApiCall { status: String, message: String },

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error(transparent)]
    Common(#[from] pantry_scan_common::Error),
}

impl ScanError {
    /// 通信・API応答に起因するエラーか（ユーザーへのアラート対象）
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ScanError::Http(_) | ScanError::ApiCall { .. } | ScanError::ApiParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
