//! 単語の行グルーピング
//!
//! 単語単位でしか結果を返さないOCRソース向け。
//! 1. 各単語の多角形の最初の辺から傾きを求め、平均値で全体を回転補正
//! 2. 回転後の外接矩形を求める
//! 3. 縦方向の中心が他方の範囲に入る単語同士を同じ行とみなす
//! 4. 行は上から下、行内の単語は左から右に並べる

use crate::geometry::Point;
use crate::types::{Line, Word};

/// 回転補正後の外接矩形
#[derive(Debug, Clone, Copy, PartialEq)]
struct WordBox {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl WordBox {
    fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

struct LineBlock {
    y_min: f64,
    y_max: f64,
    words: Vec<(WordBox, Word)>,
}

impl LineBlock {
    fn center_y(&self) -> f64 {
        (self.y_min + self.y_max) / 2.0
    }

    /// どちらかの中心がもう一方の縦範囲に入れば同じ行
    fn overlaps(&self, b: &WordBox) -> bool {
        let center = b.center_y();
        let own_center = self.center_y();
        (center >= self.y_min && center <= self.y_max)
            || (own_center >= b.y && own_center <= b.y + b.height)
    }

    fn push(&mut self, b: WordBox, word: Word) {
        self.y_min = self.y_min.min(b.y);
        self.y_max = self.y_max.max(b.y + b.height);
        self.words.push((b, word));
    }
}

/// 単語の傾き（最初の2点を結ぶ辺の角度、ラジアン）の平均
pub fn skew_angle(words: &[Word]) -> f64 {
    let angles: Vec<f64> = words
        .iter()
        .filter_map(|w| match w.original_polygon.as_slice() {
            [a, b, ..] => Some((b.y - a.y).atan2(b.x - a.x)),
            _ => None,
        })
        .filter(|a| a.is_finite())
        .collect();

    if angles.is_empty() {
        0.0
    } else {
        angles.iter().sum::<f64>() / angles.len() as f64
    }
}

fn rotate(p: &Point, angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.sin_cos();
    (p.x * cos - p.y * sin, p.x * sin + p.y * cos)
}

fn word_box(word: &Word, angle: f64) -> WordBox {
    if word.original_polygon.is_empty() {
        return WordBox { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for point in &word.original_polygon {
        let (x, y) = rotate(point, -angle);
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    WordBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

/// 単語を行にまとめる
pub fn group_words(words: Vec<Word>) -> Vec<Line> {
    let angle = skew_angle(&words);

    let mut boxed: Vec<(WordBox, Word)> = words
        .into_iter()
        .map(|w| (word_box(&w, angle), w))
        .collect();
    boxed.sort_by(|a, b| a.0.center_y().total_cmp(&b.0.center_y()));

    let mut blocks: Vec<LineBlock> = Vec::new();
    for (b, word) in boxed {
        match blocks.iter_mut().find(|block| block.overlaps(&b)) {
            Some(block) => block.push(b, word),
            None => blocks.push(LineBlock {
                y_min: b.y,
                y_max: b.y + b.height,
                words: vec![(b, word)],
            }),
        }
    }

    blocks.sort_by(|a, b| a.center_y().total_cmp(&b.center_y()));

    blocks
        .into_iter()
        .map(|mut block| {
            block.words.sort_by(|a, b| a.0.x.total_cmp(&b.0.x));
            Line::new(block.words.into_iter().map(|(_, w)| w).collect())
        })
        .collect()
}
