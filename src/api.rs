//! バックエンドAPI連携
//!
//! レスポンスは共通の封筒形式:
//! `{"success": "success"|"fail"|"error", "status": 200, "message": "...", "payload": ...}`
//!
//! `success` 以外、またはHTTPステータスが2xx以外はエラー。リトライはしない。

use crate::config::Config;
use crate::error::{ScanError, Result};
use base64::Engine;
use pantry_scan_common::{Line, Template, UploadInfo};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// パイプラインが必要とするバックエンド操作
#[allow(async_fn_in_trait)]
pub trait ReceiptBackend {
    /// アップロードを初期化（総バイト数を通知）
    async fn initialize_upload(&self, total_size: usize) -> Result<UploadInfo>;

    /// チャンクを1つ送信
    async fn upload_chunk(&self, info: &UploadInfo, index: usize, bytes: &[u8]) -> Result<()>;

    /// アップロード済み画像のOCR
    async fn scan_receipt(&self, upload_id: &str) -> Result<Vec<Line>>;

    /// スキャンキーに紐付いたテンプレートID
    async fn scan_key_template(&self, scan_key: &str) -> Result<Option<String>>;

    /// 登録済みテンプレート一覧
    async fn list_templates(&self) -> Result<Vec<Template>>;
}

/// APIレスポンスの封筒
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: String,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    pub payload: Option<T>,
}

impl<T> Envelope<T> {
    /// `success` なら payload を返す
    pub fn into_payload(self) -> Result<Option<T>> {
        if self.success == "success" {
            Ok(self.payload)
        } else {
            Err(ScanError::ApiCall {
                status: self.success,
                message: self.message.unwrap_or_else(|| "(メッセージなし)".into()),
            })
        }
    }

    /// payload 必須版
    pub fn require_payload(self) -> Result<T> {
        self.into_payload()?
            .ok_or_else(|| ScanError::ApiParse("payloadがありません".into()))
    }
}

/// 封筒のJSONを解釈する（HTTPステータスも考慮）
pub fn parse_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<Envelope<T>> {
    let parsed: std::result::Result<Envelope<T>, _> = serde_json::from_str(body);

    match parsed {
        Ok(envelope) if (200..300).contains(&status) => Ok(envelope),
        Ok(envelope) => Err(ScanError::ApiCall {
            status: format!("HTTP {}", status),
            message: envelope.message.unwrap_or_else(|| envelope.success.clone()),
        }),
        Err(_) if !(200..300).contains(&status) => Err(ScanError::ApiCall {
            status: format!("HTTP {}", status),
            message: body.chars().take(200).collect(),
        }),
        Err(e) => Err(ScanError::ApiParse(e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanKeyResponse {
    template_id: Option<String>,
}

/// 確認済み品目の登録リクエスト
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemFromTemplate {
    pub template_id: String,
    pub amount: f64,
    pub unit_price: f64,
}

/// HTTPクライアント
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url: crate::config::normalize_api_url(base_url),
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_url(), Some(config.get_token()?), config.timeout_seconds)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        let mut request = self.http.post(self.url(path)).json(body);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        log::debug!("[API] POST {} -> {} ({} bytes)", path, status, text.len());
        parse_envelope(status, &text)
    }

    /// スキャンキーとテンプレートの紐付けを保存（Noneで解除）
    pub async fn set_scan_key(&self, scan_key: &str, template_id: Option<&str>) -> Result<()> {
        let envelope: Envelope<serde_json::Value> = self
            .post("set-scan-key", &json!({ "key": scan_key, "templateId": template_id }))
            .await?;
        envelope.into_payload()?;
        Ok(())
    }

    /// 確認済み品目をパントリーに登録
    pub async fn add_food_items(&self, items: &[FoodItemFromTemplate]) -> Result<()> {
        let envelope: Envelope<serde_json::Value> =
            self.post("add-food-items", &json!({ "items": items })).await?;
        envelope.into_payload()?;
        Ok(())
    }
}

impl ReceiptBackend for ApiClient {
    async fn initialize_upload(&self, total_size: usize) -> Result<UploadInfo> {
        self.post("initialize-upload", &json!({ "totalSize": total_size }))
            .await?
            .require_payload()
    }

    async fn upload_chunk(&self, info: &UploadInfo, index: usize, bytes: &[u8]) -> Result<()> {
        let body = json!({
            "uploadId": info.upload_id,
            "index": index,
            "base64Data": base64::engine::general_purpose::STANDARD.encode(bytes),
        });
        let envelope: Envelope<serde_json::Value> = self.post("upload-chunk", &body).await?;
        envelope.into_payload()?;
        Ok(())
    }

    async fn scan_receipt(&self, upload_id: &str) -> Result<Vec<Line>> {
        self.post("scan-receipt", &json!({ "uploadId": upload_id }))
            .await?
            .require_payload()
    }

    async fn scan_key_template(&self, scan_key: &str) -> Result<Option<String>> {
        let response: Option<ScanKeyResponse> = self
            .post("get-scan-key", &json!({ "key": scan_key }))
            .await?
            .into_payload()?;
        Ok(response.and_then(|r| r.template_id))
    }

    async fn list_templates(&self) -> Result<Vec<Template>> {
        let templates: Option<Vec<Template>> = self
            .post("get-food-item-templates", &json!({ "search": null }))
            .await?
            .into_payload()?;
        Ok(templates.unwrap_or_default())
    }
}
