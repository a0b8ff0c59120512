//! 切り抜き範囲の座標計算
//!
//! 表示座標（画面上のピクセル）と元画像のピクセル座標の変換を扱う。
//! - `fit_image_bounds`: コンテナ内でアスペクト比を保って表示される画像の範囲
//! - `initial_selection`: 初期選択範囲（各辺5%内側）
//! - `relative_crop` / `RelativeCrop::to_absolute`: 選択範囲 → 元画像の切り抜き領域

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// 初期選択範囲の内側マージン（表示幅/高さに対する比率）
pub const SELECTION_INSET_RATIO: f64 = 0.05;

/// 2次元座標
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 表示コンテナのサイズ（表示座標）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// 元画像のサイズ（ピクセル）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 幅/高さ。どちらかが0ならNone
    pub fn aspect(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

/// 矩形 `{x1, y1, x2, y2}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// `other` が完全に内側にあるか（境界上は内側扱い）
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x1 >= self.x1 && other.y1 >= self.y1 && other.x2 <= self.x2 && other.y2 <= self.y2
    }

    /// 各座標を `bounds` の内側に収める
    pub fn clamped_to(&self, bounds: &Rect) -> Rect {
        Rect {
            x1: self.x1.max(bounds.x1).min(bounds.x2),
            y1: self.y1.max(bounds.y1).min(bounds.y2),
            x2: self.x2.min(bounds.x2).max(bounds.x1),
            y2: self.y2.min(bounds.y2).max(bounds.y1),
        }
    }

    /// 各辺を指定量だけ内側に寄せる
    pub fn inset(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 - dx,
            y2: self.y2 - dy,
        }
    }
}

/// コンテナ内にアスペクトフィットで表示される画像の範囲を計算
///
/// 余白は左右（または上下）に均等に割り振る。
///
/// # Errors
/// 画像サイズまたはコンテナサイズが確定していない（0以下）場合は
/// `Error::GeometryNotReady`
pub fn fit_image_bounds(container: Size, image: ImageSize) -> Result<Rect> {
    let aspect = image.aspect().ok_or(Error::GeometryNotReady)?;
    if !(container.width > 0.0) || !(container.height > 0.0) {
        return Err(Error::GeometryNotReady);
    }

    let fit_width = container.width.min(container.height * aspect);
    let fit_height = container.height.min(container.width / aspect);

    let x1 = (container.width - fit_width) / 2.0;
    let y1 = (container.height - fit_height) / 2.0;

    Ok(Rect::new(x1, y1, x1 + fit_width, y1 + fit_height))
}

/// 初期選択範囲（表示範囲から各辺5%内側）
pub fn initial_selection(bounds: &Rect) -> Rect {
    bounds.inset(
        bounds.width() * SELECTION_INSET_RATIO,
        bounds.height() * SELECTION_INSET_RATIO,
    )
}

/// 表示範囲に対する相対的な切り抜き範囲（0.0〜1.0）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeCrop {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 元画像ピクセル座標の切り抜き領域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRegion {
    pub origin_x: u32,
    pub origin_y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// 画像全体
    pub fn full(image: ImageSize) -> Self {
        Self {
            origin_x: 0,
            origin_y: 0,
            width: image.width,
            height: image.height,
        }
    }

    /// 画像の内側に収まっているか
    pub fn fits_within(&self, image: ImageSize) -> bool {
        self.origin_x as u64 + self.width as u64 <= image.width as u64
            && self.origin_y as u64 + self.height as u64 <= image.height as u64
    }
}

/// 選択範囲を表示範囲に対する相対値に変換
///
/// # Errors
/// - 表示範囲が空: `Error::GeometryNotReady`
/// - 選択範囲の幅/高さが0以下: `Error::DegenerateSelection`
pub fn relative_crop(selection: &Rect, bounds: &Rect) -> Result<RelativeCrop> {
    let bounds_width = bounds.width();
    let bounds_height = bounds.height();
    if !(bounds_width > 0.0) || !(bounds_height > 0.0) {
        return Err(Error::GeometryNotReady);
    }

    let width = selection.width();
    let height = selection.height();
    if !(width > 0.0) || !(height > 0.0) {
        return Err(Error::DegenerateSelection { width, height });
    }

    Ok(RelativeCrop {
        x: (selection.x1 - bounds.x1) / bounds_width,
        y: (selection.y1 - bounds.y1) / bounds_height,
        width: width / bounds_width,
        height: height / bounds_height,
    })
}

impl RelativeCrop {
    /// 元画像サイズを掛けてピクセル座標に変換
    ///
    /// 始点と終点をそれぞれ丸めてから画像内に収めるため、
    /// 結果は必ず `original` の内側になる。
    pub fn to_absolute(&self, original: ImageSize) -> Result<CropRegion> {
        let (origin_x, width) = scale_span(self.x, self.width, original.width);
        let (origin_y, height) = scale_span(self.y, self.height, original.height);

        if width == 0 || height == 0 {
            return Err(Error::DegenerateSelection {
                width: width as f64,
                height: height as f64,
            });
        }

        Ok(CropRegion {
            origin_x,
            origin_y,
            width,
            height,
        })
    }
}

fn scale_span(start: f64, length: f64, extent: u32) -> (u32, u32) {
    let extent_f = extent as f64;
    let from = (start * extent_f).round().clamp(0.0, extent_f);
    let to = ((start + length) * extent_f).round().clamp(from, extent_f);
    (from as u32, (to - from) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_fit_wide_image_in_tall_container() {
        // 横長画像 2:1 を 100x200 に表示 → 上下に余白
        let bounds = fit_image_bounds(Size::new(100.0, 200.0), ImageSize::new(2000, 1000)).unwrap();
        assert!((bounds.x1 - 0.0).abs() < EPS);
        assert!((bounds.x2 - 100.0).abs() < EPS);
        assert!((bounds.y1 - 75.0).abs() < EPS);
        assert!((bounds.y2 - 125.0).abs() < EPS);
    }

    #[test]
    fn test_fit_tall_image_in_wide_container() {
        let bounds = fit_image_bounds(Size::new(400.0, 300.0), ImageSize::new(1000, 3000)).unwrap();
        assert!((bounds.height() - 300.0).abs() < EPS);
        assert!((bounds.width() - 100.0).abs() < EPS);
        assert!((bounds.x1 - 150.0).abs() < EPS);
        assert!((bounds.y1 - 0.0).abs() < EPS);
    }

    #[test]
    fn test_fit_not_ready() {
        assert!(matches!(
            fit_image_bounds(Size::new(100.0, 100.0), ImageSize::new(0, 100)),
            Err(Error::GeometryNotReady)
        ));
        assert!(matches!(
            fit_image_bounds(Size::new(0.0, 100.0), ImageSize::new(100, 100)),
            Err(Error::GeometryNotReady)
        ));
        assert!(matches!(
            fit_image_bounds(Size::new(f64::NAN, 100.0), ImageSize::new(100, 100)),
            Err(Error::GeometryNotReady)
        ));
    }

    #[test]
    fn test_initial_selection_inset() {
        let bounds = Rect::new(0.0, 50.0, 200.0, 450.0);
        let selection = initial_selection(&bounds);
        assert!((selection.x1 - 10.0).abs() < EPS);
        assert!((selection.y1 - 70.0).abs() < EPS);
        assert!((selection.x2 - 190.0).abs() < EPS);
        assert!((selection.y2 - 430.0).abs() < EPS);
        assert!(bounds.contains_rect(&selection));
    }

    #[test]
    fn test_full_selection_round_trip() {
        let original = ImageSize::new(3024, 4032);
        let bounds = fit_image_bounds(Size::new(390.0, 700.0), original).unwrap();
        let region = relative_crop(&bounds, &bounds).unwrap().to_absolute(original).unwrap();
        assert_eq!(region, CropRegion::full(original));
    }

    #[test]
    fn test_relative_crop_quarter() {
        let bounds = Rect::new(10.0, 20.0, 110.0, 220.0);
        let selection = Rect::new(35.0, 70.0, 85.0, 170.0);
        let rel = relative_crop(&selection, &bounds).unwrap();
        assert!((rel.x - 0.25).abs() < EPS);
        assert!((rel.y - 0.25).abs() < EPS);
        assert!((rel.width - 0.5).abs() < EPS);
        assert!((rel.height - 0.5).abs() < EPS);

        let region = rel.to_absolute(ImageSize::new(1000, 2000)).unwrap();
        assert_eq!(
            region,
            CropRegion { origin_x: 250, origin_y: 500, width: 500, height: 1000 }
        );
    }

    #[test]
    fn test_relative_crop_degenerate() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let inverted = Rect::new(60.0, 10.0, 40.0, 90.0);
        assert!(matches!(
            relative_crop(&inverted, &bounds),
            Err(Error::DegenerateSelection { .. })
        ));

        let flat = Rect::new(10.0, 50.0, 90.0, 50.0);
        assert!(matches!(
            relative_crop(&flat, &bounds),
            Err(Error::DegenerateSelection { .. })
        ));
    }

    #[test]
    fn test_to_absolute_rounds_to_zero_is_degenerate() {
        let rel = RelativeCrop { x: 0.5, y: 0.5, width: 0.0001, height: 0.5 };
        assert!(matches!(
            rel.to_absolute(ImageSize::new(100, 100)),
            Err(Error::DegenerateSelection { .. })
        ));
    }

    #[test]
    fn test_absolute_crop_within_original() {
        let original = ImageSize::new(1234, 987);
        let bounds = fit_image_bounds(Size::new(333.0, 517.0), original).unwrap();
        let selections = [
            initial_selection(&bounds),
            Rect::new(bounds.x1, bounds.y1, bounds.x1 + 1.0, bounds.y1 + 1.0),
            Rect::new(bounds.x2 - 3.0, bounds.y2 - 7.0, bounds.x2, bounds.y2),
            bounds,
        ];

        for selection in selections {
            let region = relative_crop(&selection, &bounds)
                .unwrap()
                .to_absolute(original)
                .unwrap();
            assert!(region.width <= original.width);
            assert!(region.height <= original.height);
            assert!(region.fits_within(original), "{:?}", region);
        }
    }

    #[test]
    fn test_clamped_to() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let outside = Rect::new(-20.0, 10.0, 150.0, 200.0);
        assert_eq!(outside.clamped_to(&bounds), Rect::new(0.0, 10.0, 100.0, 100.0));
    }
}
