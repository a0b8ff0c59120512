//! レシートスキャンのパイプライン
//!
//! 切り抜き+JPEGエンコード → 分割アップロード → OCR → 行パース → テンプレート照合
//!
//! 各ステップは前のステップの完了を待ってから実行する。
//! 失敗したステップでパイプライン全体を中断し、途中結果は残さない。

use crate::api::ReceiptBackend;
use crate::cache::{compute_hash, OcrCache};
use crate::config::Config;
use crate::error::{ScanError, Result};
use crate::image_ops;
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use pantry_scan_common::{parse_lines, ConfirmationItem, CropRegion, Line, Template, UploadInfo, UploadPlan};

/// パイプラインの設定
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_width: u32,
    pub jpeg_quality: u8,
    pub max_upload_bytes: usize,
    /// 候補ごとにテンプレートを照合する
    pub match_templates: bool,
    pub show_progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_width: config.max_width,
            jpeg_quality: config.jpeg_quality,
            max_upload_bytes: config.max_upload_bytes(),
            match_templates: true,
            show_progress: false,
        }
    }
}

/// 1枚のスキャン要求
pub struct ScanRequest<'a> {
    pub image: &'a DynamicImage,
    pub region: CropRegion,
    /// キャッシュ記録用のファイル名
    pub file_name: &'a str,
}

/// スキャン結果
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub jpeg_size: usize,
    pub from_cache: bool,
    pub lines: Vec<Line>,
    pub items: Vec<ConfirmationItem>,
}

/// 切り抜いてJPEGにする（空・サイズ超過はここで中断）
pub fn encode_crop(image: &DynamicImage, region: CropRegion, options: &ScanOptions) -> Result<Vec<u8>> {
    let jpeg = image_ops::crop_and_encode(image, region, options.max_width, options.jpeg_quality)
        .inspect_err(|e| log::error!("[CROP] 切り抜き失敗: {}", e))?;

    if jpeg.is_empty() {
        return Err(pantry_scan_common::Error::EmptyPayload.into());
    }
    if jpeg.len() > options.max_upload_bytes {
        return Err(ScanError::PayloadTooLarge {
            size: jpeg.len(),
            limit: options.max_upload_bytes,
        });
    }

    log::info!(
        "[CROP] {}x{} at ({},{}) -> {} bytes",
        region.width,
        region.height,
        region.origin_x,
        region.origin_y,
        jpeg.len()
    );
    Ok(jpeg)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("アップロード中");
    bar
}

/// 初期化 → チャンクを順に送信
pub async fn upload<B: ReceiptBackend>(backend: &B, bytes: &[u8], show_progress: bool) -> Result<UploadInfo> {
    // 0バイトは通信前に中断
    UploadPlan::new(bytes.len(), bytes.len().max(1))?;

    let info = backend.initialize_upload(bytes.len()).await?;
    let plan = UploadPlan::new(bytes.len(), info.chunk_size)?;
    log::info!(
        "[UPLOAD] id={} {} bytes / {} chunks",
        info.upload_id,
        plan.total_size(),
        plan.chunk_count()
    );

    let bar = progress_bar(plan.chunk_count(), show_progress);
    for (index, chunk) in plan.chunks(bytes)? {
        backend.upload_chunk(&info, index, chunk).await.inspect_err(|e| {
            bar.abandon();
            log::error!("[UPLOAD] chunk {} 失敗: {}", index, e);
        })?;
        bar.inc(1);
    }
    bar.finish_and_clear();

    Ok(info)
}

/// アップロードしてOCR結果を得る
pub async fn recognize<B: ReceiptBackend>(backend: &B, jpeg: &[u8], show_progress: bool) -> Result<Vec<Line>> {
    let info = upload(backend, jpeg, show_progress).await?;
    let lines = backend.scan_receipt(&info.upload_id).await?;

    log::info!("[OCR] {} lines", lines.len());
    for line in &lines {
        log::debug!("[OCR] {}", line.text());
    }
    Ok(lines)
}

/// スキャンキーからテンプレートを照合（照合失敗は警告のみ）
///
/// 戻り値は照合できた件数。
pub async fn match_templates<B: ReceiptBackend>(backend: &B, items: &mut [ConfirmationItem]) -> usize {
    let mut templates: Option<Vec<Template>> = None;
    let mut matched = 0;

    for item in items.iter_mut() {
        let template_id = match backend.scan_key_template(&item.scan_name).await {
            Ok(Some(id)) => id,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("[MATCH] '{}' の照合に失敗: {}", item.scan_name, e);
                continue;
            }
        };

        if templates.is_none() {
            match backend.list_templates().await {
                Ok(list) => templates = Some(list),
                Err(e) => {
                    log::warn!("[MATCH] テンプレート一覧の取得に失敗: {}", e);
                    return matched;
                }
            }
        }

        let found = templates
            .iter()
            .flatten()
            .find(|t| t.template_id == template_id);
        if let Some(template) = found {
            item.template = Some(template.clone());
            matched += 1;
        }
    }

    log::info!("[MATCH] {}/{} items matched", matched, items.len());
    matched
}

/// パイプライン全体
pub async fn run_scan<B: ReceiptBackend>(
    backend: &B,
    request: ScanRequest<'_>,
    options: &ScanOptions,
    cache: Option<&mut OcrCache>,
) -> Result<ScanOutcome> {
    let jpeg = encode_crop(request.image, request.region, options)?;
    let hash = compute_hash(&jpeg);

    let cached = cache.as_ref().and_then(|c| c.get(&hash)).map(|lines| lines.to_vec());
    let from_cache = cached.is_some();
    let lines = match cached {
        Some(lines) => {
            log::info!("[CACHE] hit {}", request.file_name);
            lines
        }
        None => {
            let lines = recognize(backend, &jpeg, options.show_progress).await?;
            if let Some(cache) = cache {
                cache.insert(hash, request.file_name.to_string(), jpeg.len(), lines.clone());
            }
            lines
        }
    };

    let mut items = parse_lines(&lines);
    log::info!("[PARSE] {} candidates", items.len());

    if options.match_templates && !items.is_empty() {
        match_templates(backend, &mut items).await;
    }

    Ok(ScanOutcome {
        jpeg_size: jpeg.len(),
        from_cache,
        lines,
        items,
    })
}

/// 一括スキャンの1件分の結果
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub file_name: String,
    pub items: Vec<ConfirmationItem>,
    /// 失敗した場合の理由（他の画像の処理は続行）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
