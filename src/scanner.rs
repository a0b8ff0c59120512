use crate::error::{ScanError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// フォルダ内のレシート画像
#[derive(Debug, Clone)]
pub struct ReceiptImage {
    pub path: PathBuf,
    pub file_name: String,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

fn is_image_extension(ext: &str) -> bool {
    let lower = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&lower.as_str())
}

/// 直下の画像をファイル名順で返す
pub fn scan_folder(folder: &Path) -> Result<Vec<ReceiptImage>> {
    if !folder.is_dir() {
        return Err(ScanError::FolderNotFound(folder.display().to_string()));
    }

    let mut images: Vec<ReceiptImage> = WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| is_image_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .map(|e| ReceiptImage {
            path: e.path().to_path_buf(),
            file_name: e.file_name().to_string_lossy().to_string(),
        })
        .collect();

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    log::debug!("[SCAN] {}: {} images", folder.display(), images.len());

    Ok(images)
}
