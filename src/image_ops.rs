//! 画像処理モジュール
//!
//! - EXIF Orientation に従った回転補正
//! - 切り抜き → 縮小 → JPEG再エンコード

use crate::error::{ScanError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use pantry_scan_common::{CropRegion, ImageSize};
use std::io::{BufReader, Cursor};
use std::path::Path;

/// ファイルから画像を読み込み、向きを補正する
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(ScanError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    decode_oriented(&bytes)
}

/// バイト列をデコードし、EXIF Orientation を適用する
pub fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ScanError::ImageLoad(e.to_string()))?;

    Ok(match read_orientation(bytes) {
        Some(orientation) => apply_orientation(image, orientation),
        None => image,
    })
}

/// EXIF Orientation（1〜8）を読む。EXIFが無ければNone
pub fn read_orientation(bytes: &[u8]) -> Option<u32> {
    let mut reader = BufReader::new(Cursor::new(bytes));
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0)
}

/// Orientation値に応じて回転・反転する
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

pub fn image_size(image: &DynamicImage) -> ImageSize {
    ImageSize::new(image.width(), image.height())
}

/// 切り抜き領域を適用し、JPEGにエンコードする
///
/// `max_width` より広い場合はアスペクト比を保って縮小する（0なら縮小しない）。
pub fn crop_and_encode(
    image: &DynamicImage,
    region: CropRegion,
    max_width: u32,
    quality: u8,
) -> Result<Vec<u8>> {
    if region.width == 0 || region.height == 0 {
        return Err(pantry_scan_common::Error::DegenerateSelection {
            width: region.width as f64,
            height: region.height as f64,
        }
        .into());
    }
    if !region.fits_within(image_size(image)) {
        return Err(ScanError::Encode(format!(
            "切り抜き領域が画像外です: {:?} (画像 {}x{})",
            region,
            image.width(),
            image.height()
        )));
    }

    let cropped = image.crop_imm(region.origin_x, region.origin_y, region.width, region.height);
    let resized = if max_width > 0 && cropped.width() > max_width {
        cropped.resize(max_width, u32::MAX, FilterType::Triangle)
    } else {
        cropped
    };

    encode_jpeg(&resized, quality)
}

/// JPEGエンコード（品質 1〜100）
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ScanError::Encode(e.to_string()))?;
    Ok(buffer)
}
