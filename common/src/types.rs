//! レシートスキャン関連の型定義
//!
//! - Word / Line: OCRサービスの出力（1行ごとの単語列）
//! - Template: ユーザー定義の商品テンプレート
//! - ConfirmationItem: パース済み・未確認の購入品候補

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// OCRの1単語
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub text: String,

    /// 元画像上の四角形（OCRサービスの座標系）
    #[serde(default)]
    pub original_polygon: Vec<Point>,
}

impl Word {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            original_polygon: Vec::new(),
        }
    }

    pub fn with_polygon(text: impl Into<String>, polygon: Vec<Point>) -> Self {
        Self {
            text: text.into(),
            original_polygon: polygon,
        }
    }
}

/// OCRの1行（左から右の読み順を前提とする）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub words: Vec<Word>,
}

impl Line {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    /// テキストのみから行を作る（座標なし）
    pub fn from_texts(texts: &[&str]) -> Self {
        Self {
            words: texts.iter().map(|t| Word::new(*t)).collect(),
        }
    }

    /// タブ区切りの行テキスト（ログ表示用）
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// 商品テンプレートの内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateDetails {
    pub name: String,
    pub amount: f64,
    pub unit: String,
    pub shelf_life_days: i32,
    pub category: String,
}

/// 登録済みの商品テンプレート
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub template_id: String,
    #[serde(default)]
    pub template: TemplateDetails,
}

/// 確認待ちの購入品候補
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationItem {
    /// ユーザーが編集した表示名
    pub display_name: Option<String>,

    /// スキャンキー（価格より前の単語を連結したもの）
    pub scan_name: String,

    pub qty: Option<f64>,

    /// 単価
    pub price: Option<f64>,

    pub template: Option<Template>,
}

impl ConfirmationItem {
    /// パーサーが作る候補（数量1、表示名・テンプレートなし）
    pub fn candidate(scan_name: impl Into<String>, price: f64) -> Self {
        Self {
            display_name: None,
            scan_name: scan_name.into(),
            qty: Some(1.0),
            price: Some(price),
            template: None,
        }
    }

    /// 表示名（表示名 → テンプレート名 → スキャンキーの順）
    pub fn name(&self) -> &str {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name;
        }
        if let Some(template) = &self.template {
            if !template.template.name.is_empty() {
                return &template.template.name;
            }
        }
        self.scan_name.trim()
    }

    /// 数量 × 単価
    pub fn line_total(&self) -> Option<f64> {
        Some(self.qty.unwrap_or(1.0) * self.price?)
    }
}
