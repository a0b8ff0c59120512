use clap::Parser;
use image::DynamicImage;
use pantry_scan::{api, cache, cli, config, error, image_ops, pipeline, review, scanner};
use pantry_scan::common::{
    deserialize_items, group_words, parse_lines, serialize_items, ConfirmationItem, CropController, CropRegion,
    Line, Size, Template, Word,
};
use api::{ApiClient, ReceiptBackend};
use cache::OcrCache;
use cli::{Cli, Commands, DisplaySize, SelectionArg};
use config::Config;
use error::{Result, ScanError};
use pipeline::{BatchEntry, ScanOptions, ScanRequest};
use std::path::{Path, PathBuf};

/// 選択範囲を確定して元画像の切り抜き領域を得る
///
/// 表示領域の省略時は画像サイズ、選択の省略時は初期選択（5%内側）。
fn select_region(
    image: &DynamicImage,
    container: Option<DisplaySize>,
    selection: Option<SelectionArg>,
    full: bool,
) -> Result<CropRegion> {
    let original = image_ops::image_size(image);
    let container = container
        .map(|c| c.0)
        .unwrap_or_else(|| Size::new(original.width as f64, original.height as f64));

    let mut controller = CropController::new(original);
    controller.on_image_load(container)?;
    if full {
        controller.select_all()?;
    } else if let Some(selection) = selection {
        controller.set_selection(selection.0)?;
    }
    Ok(controller.confirm()?)
}

fn write_or_print(output: Option<&Path>, json: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("✔ 結果を保存: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// 画像全体を選択してスキャン（一括処理用）
async fn scan_whole_image(
    client: &ApiClient,
    receipt: &scanner::ReceiptImage,
    options: &ScanOptions,
    cache: Option<&mut OcrCache>,
) -> Result<pipeline::ScanOutcome> {
    let decoded = image_ops::load_image(&receipt.path)?;
    let region = select_region(&decoded, None, None, true)?;
    let request = ScanRequest { image: &decoded, region, file_name: &receipt.file_name };
    pipeline::run_scan(client, request, options, cache).await
}

async fn load_templates(client: &ApiClient) -> Vec<Template> {
    match client.list_templates().await {
        Ok(templates) => templates,
        Err(e) => {
            log::warn!("[MATCH] テンプレート一覧の取得に失敗: {}", e);
            Vec::new()
        }
    }
}

async fn review_and_submit(client: &ApiClient, items: &mut Vec<ConfirmationItem>) -> Result<()> {
    let templates = load_templates(client).await;
    review::run_review(items, &templates)?;

    let count = review::submit_items(client, items).await?;
    println!("✔ {}件を登録しました", count);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config::load()?;

    match cli.command {
        Commands::Scan { image, container, selection, full, output, use_cache, no_templates, review: interactive } => {
            println!("🧾 pantry-scan - レシートスキャン\n");

            if !image.exists() {
                return Err(ScanError::FileNotFound(image.display().to_string()));
            }

            // 1. 切り抜き範囲の確定
            println!("[1/3] 切り抜き範囲を確定中...");
            let decoded = image_ops::load_image(&image)?;
            let region = select_region(&decoded, container, selection, full)?;
            println!(
                "✔ {}x{} at ({}, {})\n",
                region.width, region.height, region.origin_x, region.origin_y
            );

            // 2. アップロード + OCR
            println!("[2/3] アップロード・OCR中...{}", if use_cache { " (キャッシュ有効)" } else { "" });
            let client = ApiClient::from_config(&config)?;
            let mut options = ScanOptions::from_config(&config);
            options.match_templates = !no_templates;
            options.show_progress = true;

            let folder = image.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
            let mut ocr_cache = use_cache.then(|| OcrCache::load(&folder));
            let file_name = file_name_of(&image);
            let request = ScanRequest { image: &decoded, region, file_name: &file_name };

            let mut outcome = pipeline::run_scan(&client, request, &options, ocr_cache.as_mut()).await?;
            if let Some(cache) = &ocr_cache {
                cache.save(&folder)?;
            }
            println!(
                "✔ {}行 → {}件の候補{}\n",
                outcome.lines.len(),
                outcome.items.len(),
                if outcome.from_cache { " (キャッシュ)" } else { "" }
            );

            // 3. 結果出力
            println!("[3/3] 結果を出力中...");
            if interactive {
                review_and_submit(&client, &mut outcome.items).await?;
            }
            let json = serialize_items(&outcome.items)?;
            write_or_print(output.as_deref(), &json)?;

            println!("\n✅ スキャン完了");
        }

        Commands::Crop { image, container, selection, full, output } => {
            if !image.exists() {
                return Err(ScanError::FileNotFound(image.display().to_string()));
            }

            let decoded = image_ops::load_image(&image)?;
            let region = select_region(&decoded, container, selection, full)?;
            let jpeg = pipeline::encode_crop(&decoded, region, &ScanOptions::from_config(&config))?;
            std::fs::write(&output, &jpeg)?;

            println!(
                "✔ {}x{} at ({}, {}) → {} ({} bytes)",
                region.width,
                region.height,
                region.origin_x,
                region.origin_y,
                output.display(),
                jpeg.len()
            );
        }

        Commands::Parse { input, group_words: from_words, output } => {
            let content = std::fs::read_to_string(&input)?;
            let lines: Vec<Line> = if from_words {
                let words: Vec<Word> = serde_json::from_str(&content)?;
                group_words(words)
            } else {
                serde_json::from_str(&content)?
            };

            let items = parse_lines(&lines);
            log::info!("[PARSE] {} lines -> {} items", lines.len(), items.len());
            write_or_print(output.as_deref(), &serialize_items(&items)?)?;
        }

        Commands::Batch { folder, output, use_cache } => {
            println!("🧾 pantry-scan - 一括スキャン\n");

            // 1. 画像スキャン
            println!("[1/3] 画像をスキャン中...");
            let images = scanner::scan_folder(&folder)?;
            println!("✔ {}枚の画像を検出\n", images.len());

            if images.is_empty() {
                return Err(ScanError::NoImagesFound(folder.display().to_string()));
            }

            // 2. OCR
            println!("[2/3] アップロード・OCR中...{}", if use_cache { " (キャッシュ有効)" } else { "" });
            let client = ApiClient::from_config(&config)?;
            let options = ScanOptions::from_config(&config);
            let mut ocr_cache = use_cache.then(|| OcrCache::load(&folder));
            let progress = indicatif::ProgressBar::new(images.len() as u64);

            let mut entries = Vec::with_capacity(images.len());
            for receipt in &images {
                progress.set_message(receipt.file_name.clone());
                let result = scan_whole_image(&client, receipt, &options, ocr_cache.as_mut()).await;

                let entry = match result {
                    Ok(outcome) => BatchEntry {
                        file_name: receipt.file_name.clone(),
                        items: outcome.items,
                        error: None,
                    },
                    Err(e) => {
                        log::error!("[BATCH] {}: {}", receipt.file_name, e);
                        BatchEntry {
                            file_name: receipt.file_name.clone(),
                            items: Vec::new(),
                            error: Some(e.to_string()),
                        }
                    }
                };
                entries.push(entry);
                progress.inc(1);
            }
            progress.finish_and_clear();

            if let Some(cache) = &ocr_cache {
                cache.save(&folder)?;
            }
            let failed = entries.iter().filter(|e| e.error.is_some()).count();
            println!("✔ 完了（失敗 {}件）\n", failed);

            // 3. 結果保存
            println!("[3/3] 結果を保存中...");
            let output = output.unwrap_or_else(|| folder.join("items.json"));
            let json = serde_json::to_string_pretty(&entries)?;
            std::fs::write(&output, json)?;
            println!("✔ 結果を保存: {}", output.display());

            println!("\n✅ 一括スキャン完了");
        }

        Commands::Review { input, output, no_submit } => {
            println!("🧾 pantry-scan - 品目確認\n");

            let content = std::fs::read_to_string(&input)?;
            let mut items = deserialize_items(&content)?;

            let client = if no_submit { None } else { Some(ApiClient::from_config(&config)?) };
            let templates = match &client {
                Some(client) => load_templates(client).await,
                None => Vec::new(),
            };
            review::run_review(&mut items, &templates)?;

            let output = output.unwrap_or_else(|| input.clone());
            std::fs::write(&output, serialize_items(&items)?)?;
            println!("\n✔ 保存しました: {}", output.display());

            if let Some(client) = client {
                let count = review::submit_items(&client, &items).await?;
                println!("✔ {}件を登録しました", count);
            }
        }

        Commands::Config { set_api_url, set_token, show } => {
            let mut config = config;

            if let Some(url) = set_api_url {
                config.set_api_url(url)?;
                println!("✔ API URLを設定しました");
            }

            if let Some(token) = set_token {
                config.set_token(token)?;
                println!("✔ 認証トークンを設定しました");
            }

            if show {
                println!("設定:");
                println!("  API URL: {}", config.api_url());
                println!("  最大幅: {}px", config.max_width);
                println!("  JPEG品質: {}", config.jpeg_quality);
                println!("  送信上限: {}MB", config.max_upload_mb);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  トークン: {}", if config.get_token().is_ok() { "設定済み" } else { "未設定" });
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = OcrCache::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = OcrCache::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match OcrCache::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}
