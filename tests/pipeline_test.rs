//! パイプラインテスト
//!
//! メモリ上のバックエンドで アップロード → OCR → パース → 照合 の流れを検証

use image::{DynamicImage, RgbImage};
use pantry_scan::api::ReceiptBackend;
use pantry_scan::cache::OcrCache;
use pantry_scan::common::{CropRegion, ImageSize, Line, Template, TemplateDetails, UploadInfo};
use pantry_scan::error::{Result, ScanError};
use pantry_scan::pipeline::{self, ScanOptions, ScanRequest};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct MockBackend {
    chunk_size: usize,
    lines: Vec<Line>,
    scan_keys: HashMap<String, String>,
    templates: Vec<Template>,
    fail_chunk: Option<usize>,
    calls: Mutex<Vec<String>>,
    chunks: Mutex<Vec<(usize, Vec<u8>)>>,
}

impl MockBackend {
    fn new(chunk_size: usize) -> Self {
        Self { chunk_size, ..Default::default() }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReceiptBackend for MockBackend {
    async fn initialize_upload(&self, total_size: usize) -> Result<UploadInfo> {
        self.record(format!("init:{}", total_size));
        Ok(UploadInfo { upload_id: "up-1".into(), chunk_size: self.chunk_size })
    }

    async fn upload_chunk(&self, info: &UploadInfo, index: usize, bytes: &[u8]) -> Result<()> {
        self.record(format!("chunk:{}", index));
        assert_eq!(info.upload_id, "up-1");
        if self.fail_chunk == Some(index) {
            return Err(ScanError::ApiCall { status: "error".into(), message: "chunk rejected".into() });
        }
        self.chunks.lock().unwrap().push((index, bytes.to_vec()));
        Ok(())
    }

    async fn scan_receipt(&self, upload_id: &str) -> Result<Vec<Line>> {
        self.record(format!("scan:{}", upload_id));
        Ok(self.lines.clone())
    }

    async fn scan_key_template(&self, scan_key: &str) -> Result<Option<String>> {
        self.record("get-scan-key");
        Ok(self.scan_keys.get(scan_key).cloned())
    }

    async fn list_templates(&self) -> Result<Vec<Template>> {
        self.record("templates");
        Ok(self.templates.clone())
    }
}

fn template(id: &str, name: &str) -> Template {
    Template {
        template_id: id.into(),
        template: TemplateDetails {
            name: name.into(),
            amount: 1.0,
            unit: "gal".into(),
            shelf_life_days: 10,
            category: "Dairy".into(),
        },
    }
}

fn receipt_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, image::Rgb([240, 240, 240])))
}

fn options() -> ScanOptions {
    ScanOptions {
        max_width: 1024,
        jpeg_quality: 70,
        max_upload_bytes: 7 * 1024 * 1024,
        match_templates: true,
        show_progress: false,
    }
}

/// チャンクは順番通り、連結すると元のバイト列
#[tokio::test]
async fn test_upload_chunks_in_order() {
    let backend = MockBackend::new(4);
    let bytes: Vec<u8> = (0u8..10).collect();

    let info = pipeline::upload(&backend, &bytes, false).await.unwrap();
    assert_eq!(info.upload_id, "up-1");
    assert_eq!(backend.calls(), vec!["init:10", "chunk:0", "chunk:1", "chunk:2"]);

    let chunks = backend.chunks.lock().unwrap();
    let lengths: Vec<usize> = chunks.iter().map(|(_, c)| c.len()).collect();
    assert_eq!(lengths, vec![4, 4, 2]);
    let joined: Vec<u8> = chunks.iter().flat_map(|(_, c)| c.clone()).collect();
    assert_eq!(joined, bytes);
}

/// 空のデータは通信せずに中断
#[tokio::test]
async fn test_empty_payload_makes_no_calls() {
    let backend = MockBackend::new(4);
    let err = pipeline::upload(&backend, &[], false).await.unwrap_err();

    assert!(matches!(err, ScanError::Common(pantry_scan::common::Error::EmptyPayload)));
    assert!(backend.calls().is_empty());
}

/// チャンク送信の失敗でOCRまで進まない
#[tokio::test]
async fn test_chunk_failure_aborts_pipeline() {
    let mut backend = MockBackend::new(4);
    backend.fail_chunk = Some(1);
    let bytes = vec![7u8; 10];

    let err = pipeline::recognize(&backend, &bytes, false).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(backend.calls(), vec!["init:10", "chunk:0", "chunk:1"]);
}

/// 切り抜き → OCR → パース → テンプレート照合
#[tokio::test]
async fn test_run_scan_end_to_end() {
    let mut backend = MockBackend::new(1024 * 1024);
    backend.lines = vec![
        Line::from_texts(&["MILK", "$3.49"]),
        Line::from_texts(&["2", "@", "$3.49"]),
        Line::from_texts(&["BREAD", "2.99"]),
        Line::from_texts(&["THANK", "YOU"]),
    ];
    backend.scan_keys.insert("MILK ".into(), "t-milk".into());
    backend.templates = vec![template("t-milk", "Whole Milk")];

    let image = receipt_image();
    let region = CropRegion::full(ImageSize::new(200, 100));
    let request = ScanRequest { image: &image, region, file_name: "receipt.jpg" };

    let outcome = pipeline::run_scan(&backend, request, &options(), None).await.unwrap();

    assert!(outcome.jpeg_size > 0);
    assert!(!outcome.from_cache);
    assert_eq!(outcome.lines.len(), 4);
    assert_eq!(outcome.items.len(), 2);

    let milk = &outcome.items[0];
    assert_eq!(milk.scan_name, "MILK ");
    assert_eq!(milk.qty, Some(2.0));
    assert_eq!(milk.price, Some(3.49));
    assert_eq!(milk.template.as_ref().map(|t| t.template_id.as_str()), Some("t-milk"));

    let bread = &outcome.items[1];
    assert_eq!(bread.qty, Some(1.0));
    assert!(bread.template.is_none());

    // テンプレート一覧は1回だけ取得
    let calls = backend.calls();
    assert_eq!(calls.iter().filter(|c| *c == "templates").count(), 1);
    assert_eq!(calls.iter().filter(|c| *c == "get-scan-key").count(), 2);
}

/// 照合を無効にするとスキャンキーを問い合わせない
#[tokio::test]
async fn test_run_scan_without_templates() {
    let mut backend = MockBackend::new(1024 * 1024);
    backend.lines = vec![Line::from_texts(&["EGGS", "4.19"])];

    let image = receipt_image();
    let request = ScanRequest {
        image: &image,
        region: CropRegion { origin_x: 10, origin_y: 10, width: 50, height: 40 },
        file_name: "receipt.jpg",
    };
    let mut opts = options();
    opts.match_templates = false;

    let outcome = pipeline::run_scan(&backend, request, &opts, None).await.unwrap();
    assert_eq!(outcome.items.len(), 1);
    assert!(!backend.calls().iter().any(|c| c == "get-scan-key"));
}

/// サイズ上限を超えるとアップロードしない
#[tokio::test]
async fn test_oversized_jpeg_is_rejected() {
    let backend = MockBackend::new(1024);
    let image = receipt_image();
    let request = ScanRequest {
        image: &image,
        region: CropRegion::full(ImageSize::new(200, 100)),
        file_name: "receipt.jpg",
    };
    let mut opts = options();
    opts.max_upload_bytes = 10;

    let err = pipeline::run_scan(&backend, request, &opts, None).await.unwrap_err();
    assert!(matches!(err, ScanError::PayloadTooLarge { limit: 10, .. }));
    assert!(backend.calls().is_empty());
}

/// 2回目はキャッシュからOCR結果を得る
#[tokio::test]
async fn test_run_scan_uses_cache() {
    let mut backend = MockBackend::new(1024 * 1024);
    backend.lines = vec![Line::from_texts(&["APPLES", "$2.50"])];
    let image = receipt_image();
    let region = CropRegion::full(ImageSize::new(200, 100));
    let mut cache = OcrCache::default();
    let mut opts = options();
    opts.match_templates = false;

    let first = pipeline::run_scan(
        &backend,
        ScanRequest { image: &image, region, file_name: "a.jpg" },
        &opts,
        Some(&mut cache),
    )
    .await
    .unwrap();
    assert!(!first.from_cache);
    assert_eq!(cache.len(), 1);

    let calls_before = backend.calls().len();
    let second = pipeline::run_scan(
        &backend,
        ScanRequest { image: &image, region, file_name: "a.jpg" },
        &opts,
        Some(&mut cache),
    )
    .await
    .unwrap();
    assert!(second.from_cache);
    assert_eq!(second.items, first.items);
    assert_eq!(backend.calls().len(), calls_before);
}
