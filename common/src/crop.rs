//! 切り抜き範囲コントローラ
//!
//! 写真1枚ごとの状態機械:
//! `Uninitialized` →(画像ロード)→ `Ready` →(確定)→ `Confirmed`
//!
//! ロード前のジオメトリ参照は `Error::GeometryNotReady`、
//! 幅/高さ0以下の選択範囲の確定は `Error::DegenerateSelection` になる。

use crate::error::{Error, Result};
use crate::geometry::{fit_image_bounds, initial_selection, relative_crop, CropRegion, ImageSize, Point, Rect, Size};
use crate::handles::{drag, Handle};

#[derive(Debug, Clone, PartialEq)]
enum CropState {
    Uninitialized,
    Ready { bounds: Rect, selection: Rect },
    Confirmed(CropRegion),
}

/// 表示中の写真に対する切り抜き範囲の管理
#[derive(Debug, Clone)]
pub struct CropController {
    original: ImageSize,
    state: CropState,
}

impl CropController {
    pub fn new(original: ImageSize) -> Self {
        Self {
            original,
            state: CropState::Uninitialized,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, CropState::Ready { .. })
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.state, CropState::Confirmed(_))
    }

    /// 画像ロード完了: 表示範囲と初期選択範囲を確定する
    ///
    /// 表示範囲は写真ごとに一度だけ計算する。`Ready` で再度呼ばれた場合は
    /// 既存の選択範囲をそのまま返す。
    pub fn on_image_load(&mut self, container: Size) -> Result<Rect> {
        match self.state {
            CropState::Uninitialized => {
                let bounds = fit_image_bounds(container, self.original)?;
                let selection = initial_selection(&bounds);
                self.state = CropState::Ready { bounds, selection };
                Ok(selection)
            }
            CropState::Ready { selection, .. } => Ok(selection),
            CropState::Confirmed(_) => Err(Error::AlreadyConfirmed),
        }
    }

    /// 画像の表示範囲
    pub fn bounds(&self) -> Result<Rect> {
        self.ready().map(|(bounds, _)| bounds)
    }

    /// 現在の選択範囲
    pub fn selection(&self) -> Result<Rect> {
        self.ready().map(|(_, selection)| selection)
    }

    /// ハンドルのドラッグ（ポインタ移動イベントごとに呼ぶ）
    pub fn drag(&mut self, handle: Handle, pointer: Point) -> Result<Rect> {
        let (bounds, selection) = self.ready()?;
        let next = drag(selection, handle, pointer, &bounds);
        self.state = CropState::Ready { bounds, selection: next };
        Ok(next)
    }

    /// 選択範囲を直接指定（表示範囲内に収めて設定）
    pub fn set_selection(&mut self, selection: Rect) -> Result<Rect> {
        let (bounds, _) = self.ready()?;
        let next = selection.clamped_to(&bounds);
        self.state = CropState::Ready { bounds, selection: next };
        Ok(next)
    }

    /// 表示範囲全体を選択
    pub fn select_all(&mut self) -> Result<Rect> {
        let bounds = self.bounds()?;
        self.set_selection(bounds)
    }

    /// 初期選択範囲に戻す
    pub fn reset(&mut self) -> Result<Rect> {
        let bounds = self.bounds()?;
        self.set_selection(initial_selection(&bounds))
    }

    /// 選択範囲を確定し、元画像ピクセル座標の切り抜き領域を返す
    ///
    /// 失敗時は `Ready` のまま（選択をやり直せる）。
    pub fn confirm(&mut self) -> Result<CropRegion> {
        let (bounds, selection) = self.ready()?;
        let region = relative_crop(&selection, &bounds)?.to_absolute(self.original)?;
        self.state = CropState::Confirmed(region);
        Ok(region)
    }

    /// 確定済みの切り抜き領域
    pub fn confirmed_region(&self) -> Option<CropRegion> {
        match self.state {
            CropState::Confirmed(region) => Some(region),
            _ => None,
        }
    }

    fn ready(&self) -> Result<(Rect, Rect)> {
        match self.state {
            CropState::Ready { bounds, selection } => Ok((bounds, selection)),
            CropState::Uninitialized => Err(Error::GeometryNotReady),
            CropState::Confirmed(_) => Err(Error::AlreadyConfirmed),
        }
    }
}
