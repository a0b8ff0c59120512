//! レシート行パーサー
//!
//! OCRの行データから購入品候補（`ConfirmationItem`）を抽出する。
//!
//! 1. 各単語をトークン化: 価格 / `@` / その他テキスト
//! 2. 行の判定（優先順位）:
//!    - 数量行: `@` の前後が数値で、既に候補が1つ以上ある → 直前の候補の数量
//!    - 品目行: 最初の価格トークンより前の単語を品名キーとして候補を追加
//!    - それ以外: 何もしない
//! 3. 全行処理後、数量の上書きを候補IDで適用
//!
//! 入力が同じなら出力も同じ（副作用なし・失敗しない）。

use crate::error::Result;
use crate::types::{ConfirmationItem, Line};
use regex::Regex;
use std::collections::HashMap;

/// 数量と単価を結ぶ区切りトークン（例: `2 @ $0.50`）
pub const QUANTITY_SEPARATOR: &str = "@";

lazy_static::lazy_static! {
    // 任意の$ + 整数部 + 小数点 + ちょうど2桁
    static ref PRICE_RE: Regex = Regex::new(r"\$?([0-9]+\.[0-9]{2})").unwrap();
}

/// 単語の分類
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Price(f64),
    Separator,
    Text(&'a str),
}

/// 単語をトークンに分類
pub fn classify(text: &str) -> Token<'_> {
    if text == QUANTITY_SEPARATOR {
        return Token::Separator;
    }
    match parse_price(text) {
        Some(price) => Token::Price(price),
        None => Token::Text(text),
    }
}

/// 行をトークン列に変換
pub fn tokenize(line: &Line) -> Vec<Token<'_>> {
    line.words.iter().map(|w| classify(&w.text)).collect()
}

/// 価格パターンに一致すれば値を返す
pub fn parse_price(text: &str) -> Option<f64> {
    PRICE_RE
        .captures(text)
        .and_then(|cap| cap[1].parse::<f64>().ok())
}

/// 数量として解釈（前後の空白を許容、有限値のみ）
pub fn parse_quantity(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `@` の後ろの単価（先頭の$を1つだけ除去）
fn parse_unit_price(text: &str) -> Option<f64> {
    parse_quantity(text.strip_prefix('$').unwrap_or(text))
}

/// 1行の判定結果
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// 直前の候補の数量
    Quantity(f64),
    /// 新しい候補
    Item { scan_name: String, price: f64 },
    /// 候補にならない行
    Skip,
}

/// 行を判定する
///
/// `has_candidates` が false の場合、`@` は通常の単語として扱う。
pub fn classify_line(line: &Line, has_candidates: bool) -> LineKind {
    let tokens = tokenize(line);

    if has_candidates {
        if let Some(qty) = find_quantity(line, &tokens) {
            return LineKind::Quantity(qty);
        }
    }

    let first_price = tokens.iter().enumerate().find_map(|(i, t)| match t {
        Token::Price(price) => Some((i, *price)),
        _ => None,
    });
    let Some((price_index, price)) = first_price else {
        return LineKind::Skip;
    };

    let scan_name: String = line.words[..price_index]
        .iter()
        .map(|w| format!("{} ", w.text))
        .collect();

    if scan_name.is_empty() {
        return LineKind::Skip;
    }

    LineKind::Item { scan_name, price }
}

/// 先頭・末尾以外の `@` で、前が数量・後が単価として読めるもの
fn find_quantity(line: &Line, tokens: &[Token<'_>]) -> Option<f64> {
    let last = tokens.len().checked_sub(1)?;
    tokens
        .iter()
        .enumerate()
        .filter(|(i, t)| **t == Token::Separator && *i > 0 && *i < last)
        .find_map(|(i, _)| {
            let qty = parse_quantity(&line.words[i - 1].text)?;
            parse_unit_price(&line.words[i + 1].text)?;
            Some(qty)
        })
}

/// 候補の識別子（作成順に採番）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId(usize);

/// 行を順に読み込むパーサー
#[derive(Debug, Default)]
pub struct ReceiptParser {
    candidates: Vec<(CandidateId, ConfirmationItem)>,
    quantities: HashMap<CandidateId, f64>,
    next_id: usize,
}

impl ReceiptParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1行を処理し、判定結果を返す
    pub fn feed(&mut self, line: &Line) -> LineKind {
        let kind = classify_line(line, !self.candidates.is_empty());

        match &kind {
            LineKind::Quantity(qty) => {
                if let Some((id, _)) = self.candidates.last() {
                    self.quantities.insert(*id, *qty);
                }
            }
            LineKind::Item { scan_name, price } => {
                let id = CandidateId(self.next_id);
                self.next_id += 1;
                self.candidates
                    .push((id, ConfirmationItem::candidate(scan_name.clone(), *price)));
            }
            LineKind::Skip => {}
        }

        kind
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// 数量を適用して候補一覧を返す
    pub fn finish(self) -> Vec<ConfirmationItem> {
        let quantities = self.quantities;
        self.candidates
            .into_iter()
            .map(|(id, mut item)| {
                if let Some(qty) = quantities.get(&id) {
                    item.qty = Some(*qty);
                }
                item
            })
            .collect()
    }
}

/// OCR行データから購入品候補を抽出
///
/// # Examples
/// ```
/// use pantry_scan_common::{parse_lines, Line};
///
/// let lines = vec![Line::from_texts(&["Milk", "Whole", "$3.99"])];
/// let items = parse_lines(&lines);
/// assert_eq!(items[0].scan_name, "Milk Whole ");
/// assert_eq!(items[0].price, Some(3.99));
/// ```
pub fn parse_lines(lines: &[Line]) -> Vec<ConfirmationItem> {
    let mut parser = ReceiptParser::new();
    for line in lines {
        parser.feed(line);
    }
    parser.finish()
}

/// 確認画面に渡す文字列に変換
pub fn serialize_items(items: &[ConfirmationItem]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

/// 確認画面に渡された文字列から復元
pub fn deserialize_items(json: &str) -> Result<Vec<ConfirmationItem>> {
    Ok(serde_json::from_str(json)?)
}
