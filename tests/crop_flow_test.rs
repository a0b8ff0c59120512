//! 切り抜きフローテスト
//!
//! 表示座標での選択 → 確定 → 元画像の切り抜き → JPEG の流れを検証

use image::{DynamicImage, GenericImageView, RgbImage};
use pantry_scan::common::{CropController, CropRegion, Handle, ImageSize, Point, Rect, Size};
use pantry_scan::common::Error;
use pantry_scan::error::ScanError;
use pantry_scan::pipeline::{self, ScanOptions};

fn options() -> ScanOptions {
    ScanOptions {
        max_width: 1024,
        jpeg_quality: 70,
        max_upload_bytes: 7 * 1024 * 1024,
        match_templates: false,
        show_progress: false,
    }
}

/// 横長画像を正方形の表示領域に表示（上下に余白）
fn letterboxed() -> CropController {
    let mut controller = CropController::new(ImageSize::new(400, 200));
    controller.on_image_load(Size::new(200.0, 200.0)).unwrap();
    assert_eq!(controller.bounds().unwrap(), Rect::new(0.0, 50.0, 200.0, 150.0));
    controller
}

#[test]
fn test_left_half_selection_maps_to_pixels() {
    let mut controller = letterboxed();
    controller.set_selection(Rect::new(0.0, 50.0, 100.0, 150.0)).unwrap();

    let region = controller.confirm().unwrap();
    assert_eq!(region, CropRegion { origin_x: 0, origin_y: 0, width: 200, height: 200 });
    assert!(controller.is_confirmed());
    assert_eq!(controller.confirmed_region(), Some(region));
}

#[test]
fn test_drag_then_encode() {
    let mut controller = letterboxed();
    controller.set_selection(Rect::new(0.0, 50.0, 100.0, 150.0)).unwrap();
    controller.drag(Handle::BottomRight, Point::new(50.0, 100.0)).unwrap();
    let region = controller.confirm().unwrap();
    assert_eq!(region, CropRegion { origin_x: 0, origin_y: 0, width: 100, height: 100 });

    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 200, image::Rgb([200, 10, 10])));
    let jpeg = pipeline::encode_crop(&image, region, &options()).unwrap();
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!(decoded.dimensions(), (100, 100));
}

#[test]
fn test_drag_past_opposite_edge_keeps_minimum() {
    let mut controller = letterboxed();
    controller.set_selection(Rect::new(0.0, 50.0, 100.0, 150.0)).unwrap();

    let selection = controller.drag(Handle::TopLeft, Point::new(500.0, 500.0)).unwrap();
    assert_eq!(selection, Rect::new(90.0, 140.0, 100.0, 150.0));

    let region = controller.confirm().unwrap();
    assert_eq!(region, CropRegion { origin_x: 180, origin_y: 180, width: 20, height: 20 });
}

#[test]
fn test_select_all_and_resize_wide_image() {
    let mut controller = CropController::new(ImageSize::new(3000, 1000));
    controller.on_image_load(Size::new(600.0, 800.0)).unwrap();
    controller.select_all().unwrap();
    let region = controller.confirm().unwrap();
    assert_eq!(region, CropRegion::full(ImageSize::new(3000, 1000)));

    let image = DynamicImage::ImageRgb8(RgbImage::new(3000, 1000));
    let jpeg = pipeline::encode_crop(&image, region, &options()).unwrap();
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!(decoded.width(), 1024);
}

#[test]
fn test_zero_width_region_is_degenerate() {
    let image = DynamicImage::ImageRgb8(RgbImage::new(200, 100));
    let region = CropRegion { origin_x: 10, origin_y: 10, width: 0, height: 50 };

    let err = pipeline::encode_crop(&image, region, &options()).unwrap_err();
    assert!(matches!(
        err,
        ScanError::Common(Error::DegenerateSelection { width, height }) if width == 0.0 && height == 50.0
    ));
}

#[test]
fn test_initial_selection_is_inset() {
    let mut controller = letterboxed();
    let selection = controller.selection().unwrap();
    assert!((selection.x1 - 10.0).abs() < 1e-9);
    assert!((selection.y1 - 55.0).abs() < 1e-9);
    assert!((selection.x2 - 190.0).abs() < 1e-9);
    assert!((selection.y2 - 145.0).abs() < 1e-9);

    let region = controller.confirm().unwrap();
    assert_eq!(region, CropRegion { origin_x: 20, origin_y: 10, width: 360, height: 180 });
}
