//! 切り抜き範囲のドラッグハンドル
//!
//! 4隅+4辺の8ハンドル。各ハンドルの更新は純粋関数
//! `drag(current, handle, pointer, bounds) -> Rect` で表す。
//!
//! 不変条件（全ハンドル共通）:
//! - 結果の矩形は常に `bounds` の内側
//! - `x1 <= x2`, `y1 <= y2`（反転しない）。余裕があれば
//!   `MIN_SELECTION_SIZE` 以上の幅/高さを保つ

use crate::geometry::{Point, Rect};

/// 選択範囲の最小幅/高さ（表示座標）
pub const MIN_SELECTION_SIZE: f64 = 10.0;

/// ドラッグハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

/// 水平方向に動かす辺
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HorizontalEdge {
    Left,
    Right,
}

/// 垂直方向に動かす辺
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerticalEdge {
    Top,
    Bottom,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    fn horizontal(&self) -> Option<HorizontalEdge> {
        match self {
            Handle::TopLeft | Handle::Left | Handle::BottomLeft => Some(HorizontalEdge::Left),
            Handle::TopRight | Handle::Right | Handle::BottomRight => Some(HorizontalEdge::Right),
            Handle::Top | Handle::Bottom => None,
        }
    }

    fn vertical(&self) -> Option<VerticalEdge> {
        match self {
            Handle::TopLeft | Handle::Top | Handle::TopRight => Some(VerticalEdge::Top),
            Handle::BottomLeft | Handle::Bottom | Handle::BottomRight => Some(VerticalEdge::Bottom),
            Handle::Left | Handle::Right => None,
        }
    }

    /// 矩形上のハンドル位置
    pub fn anchor(&self, rect: &Rect) -> Point {
        let x = match self.horizontal() {
            Some(HorizontalEdge::Left) => rect.x1,
            Some(HorizontalEdge::Right) => rect.x2,
            None => (rect.x1 + rect.x2) / 2.0,
        };
        let y = match self.vertical() {
            Some(VerticalEdge::Top) => rect.y1,
            Some(VerticalEdge::Bottom) => rect.y2,
            None => (rect.y1 + rect.y2) / 2.0,
        };
        Point::new(x, y)
    }
}

/// ハンドルを `pointer` 位置までドラッグした後の矩形
///
/// 動かす座標だけを更新し、`bounds` と反対側の辺でクランプする。
pub fn drag(current: Rect, handle: Handle, pointer: Point, bounds: &Rect) -> Rect {
    let mut next = current;

    match handle.horizontal() {
        Some(HorizontalEdge::Left) => {
            next.x1 = move_low_edge(pointer.x, bounds.x1, current.x2);
        }
        Some(HorizontalEdge::Right) => {
            next.x2 = move_high_edge(pointer.x, current.x1, bounds.x2);
        }
        None => {}
    }

    match handle.vertical() {
        Some(VerticalEdge::Top) => {
            next.y1 = move_low_edge(pointer.y, bounds.y1, current.y2);
        }
        Some(VerticalEdge::Bottom) => {
            next.y2 = move_high_edge(pointer.y, current.y1, bounds.y2);
        }
        None => {}
    }

    next
}

/// 左辺/上辺: 反対側から最小幅を確保した上で、境界を優先
fn move_low_edge(pointer: f64, bound: f64, opposite: f64) -> f64 {
    let limit = (opposite - MIN_SELECTION_SIZE).max(bound);
    pointer.min(limit).max(bound).min(opposite)
}

/// 右辺/下辺
fn move_high_edge(pointer: f64, opposite: f64, bound: f64) -> f64 {
    let limit = (opposite + MIN_SELECTION_SIZE).min(bound);
    pointer.max(limit).min(bound).max(opposite)
}

/// ポインタ位置に最も近いハンドル（`radius` 以内）
pub fn hit_test(rect: &Rect, pointer: Point, radius: f64) -> Option<Handle> {
    Handle::ALL
        .iter()
        .map(|handle| {
            let anchor = handle.anchor(rect);
            let distance = (anchor.x - pointer.x).hypot(anchor.y - pointer.y);
            (*handle, distance)
        })
        .filter(|(_, distance)| *distance <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(handle, _)| handle)
}
