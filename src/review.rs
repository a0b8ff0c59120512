//! 対話式の確認画面
//!
//! パース結果の候補を1件ずつ表示し、名前・数量・単価・テンプレートを修正する。
//! 確定した品目は `add-food-items` で登録し、スキャンキーとテンプレートの紐付けも保存する。

use crate::api::{ApiClient, FoodItemFromTemplate};
use crate::error::{ScanError, Result};
use dialoguer::Input;
use pantry_scan_common::receipt::parse_quantity;
use pantry_scan_common::{ConfirmationItem, Template};

/// 確認画面での操作
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewAction {
    /// このまま次へ
    Keep,
    /// 表示名を変更
    Rename(String),
    /// 数量を変更
    Quantity(f64),
    /// 単価を変更
    Price(f64),
    /// テンプレートを名前で検索して設定
    Template(String),
    /// テンプレートを外す
    ClearTemplate,
    /// 候補を削除
    Delete,
    /// 確認を終了
    Quit,
}

/// 操作適用後の遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStep {
    Next,
    Stay,
    Removed,
    Quit,
}

/// 入力行を操作に変換
///
/// `n 名前` / `x 数量` / `p 単価` / `t 検索語` / `t-` / `d` / `q`、空行は次へ。
pub fn parse_review_command(input: &str) -> std::result::Result<ReviewAction, String> {
    let trimmed = input.trim();
    let (command, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (trimmed, ""),
    };

    match (command, arg) {
        ("", _) | ("k", "") => Ok(ReviewAction::Keep),
        ("d", "") => Ok(ReviewAction::Delete),
        ("q" | "Q", "") => Ok(ReviewAction::Quit),
        ("t-", "") => Ok(ReviewAction::ClearTemplate),
        ("n", name) if !name.is_empty() => Ok(ReviewAction::Rename(name.to_string())),
        ("x", qty) => parse_quantity(qty)
            .map(ReviewAction::Quantity)
            .ok_or_else(|| format!("数量が不正です: '{}'", qty)),
        ("p", price) => parse_price_input(price)
            .map(ReviewAction::Price)
            .ok_or_else(|| format!("単価が不正です: '{}'", price)),
        ("t", query) if !query.is_empty() => Ok(ReviewAction::Template(query.to_string())),
        _ => Err(format!("不明な操作: '{}'", trimmed)),
    }
}

/// 入力された単価（先頭の$を1つだけ許容、0以上の数値のみ）
fn parse_price_input(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    parse_quantity(trimmed.strip_prefix('$').unwrap_or(trimmed)).filter(|p| *p >= 0.0)
}

/// 名前の部分一致でテンプレートを探す（大文字小文字は無視）
pub fn find_template<'a>(templates: &'a [Template], query: &str) -> Option<&'a Template> {
    let query = query.to_lowercase();
    templates
        .iter()
        .find(|t| t.template.name.to_lowercase().contains(&query))
}

/// 1件に操作を適用（削除・終了は呼び出し側で処理）
pub fn apply_action(
    item: &mut ConfirmationItem,
    action: ReviewAction,
    templates: &[Template],
) -> std::result::Result<ReviewStep, String> {
    match action {
        ReviewAction::Keep => Ok(ReviewStep::Next),
        ReviewAction::Rename(name) => {
            item.display_name = Some(name);
            Ok(ReviewStep::Stay)
        }
        ReviewAction::Quantity(qty) => {
            item.qty = Some(qty);
            Ok(ReviewStep::Stay)
        }
        ReviewAction::Price(price) => {
            item.price = Some(price);
            Ok(ReviewStep::Stay)
        }
        ReviewAction::Template(query) => {
            let template = find_template(templates, &query)
                .ok_or_else(|| format!("テンプレートが見つかりません: '{}'", query))?;
            item.template = Some(template.clone());
            Ok(ReviewStep::Stay)
        }
        ReviewAction::ClearTemplate => {
            item.template = None;
            Ok(ReviewStep::Stay)
        }
        ReviewAction::Delete => Ok(ReviewStep::Removed),
        ReviewAction::Quit => Ok(ReviewStep::Quit),
    }
}

/// テンプレート付きの品目を登録リクエストに変換
///
/// 数量未設定は1、単価未設定は0として送る。
pub fn to_food_items(items: &[ConfirmationItem]) -> Vec<FoodItemFromTemplate> {
    items
        .iter()
        .filter_map(|item| {
            item.template.as_ref().map(|t| FoodItemFromTemplate {
                template_id: t.template_id.clone(),
                amount: item.qty.unwrap_or(1.0),
                unit_price: item.price.unwrap_or(0.0),
            })
        })
        .collect()
}

fn describe(item: &ConfirmationItem) -> String {
    let qty = item.qty.map(|q| q.to_string()).unwrap_or_else(|| "-".into());
    let price = item
        .price
        .map(|p| format!("{:.2}", p))
        .unwrap_or_else(|| "-".into());
    let template = item
        .template
        .as_ref()
        .map(|t| t.template.name.as_str())
        .unwrap_or("未設定");
    let total = item
        .line_total()
        .map(|t| format!("{:.2}", t))
        .unwrap_or_else(|| "-".into());
    format!(
        "{} (scan: {}) 数量:{} 単価:{} 小計:{} テンプレート:{}",
        item.name(),
        item.scan_name,
        qty,
        price,
        total,
        template
    )
}

/// 対話式で候補を確認
pub fn run_review(items: &mut Vec<ConfirmationItem>, templates: &[Template]) -> Result<()> {
    if items.is_empty() {
        println!("確認する品目がありません");
        return Ok(());
    }

    println!("🧾 品目の確認: {}件", items.len());
    println!("---");
    println!("操作: [Enter]次へ [n 名前] [x 数量] [p 単価] [t 検索語]テンプレート [t-]解除 [d]削除 [q]終了");
    println!("---\n");

    let mut index = 0;
    while index < items.len() {
        println!("[{}/{}] {}", index + 1, items.len(), describe(&items[index]));

        let input: String = Input::new()
            .with_prompt("操作")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| ScanError::CliExecution(e.to_string()))?;

        let action = match parse_review_command(&input) {
            Ok(action) => action,
            Err(message) => {
                println!("  {}", message);
                continue;
            }
        };

        match apply_action(&mut items[index], action, templates) {
            Ok(ReviewStep::Next) => index += 1,
            Ok(ReviewStep::Stay) => {}
            Ok(ReviewStep::Removed) => {
                let removed = items.remove(index);
                println!("  → 削除: {}\n", removed.name());
            }
            Ok(ReviewStep::Quit) => {
                println!("確認を終了します...");
                break;
            }
            Err(message) => println!("  {}", message),
        }
    }

    Ok(())
}

/// スキャンキーの紐付けを保存してから品目を登録
///
/// 戻り値は登録した件数。
pub async fn submit_items(client: &ApiClient, items: &[ConfirmationItem]) -> Result<usize> {
    for item in items {
        if let Some(template) = &item.template {
            client
                .set_scan_key(&item.scan_name, Some(&template.template_id))
                .await?;
        }
    }

    let food_items = to_food_items(items);
    if food_items.is_empty() {
        log::warn!("[SUBMIT] テンプレート付きの品目がありません");
        return Ok(0);
    }

    client.add_food_items(&food_items).await?;
    log::info!("[SUBMIT] {} items", food_items.len());
    Ok(food_items.len())
}
