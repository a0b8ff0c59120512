use clap::{Parser, Subcommand};
use pantry_scan_common::{Rect, Size};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pantry-scan")]
#[command(about = "レシート画像の切り抜き・OCR・品目登録ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// レシート画像を切り抜いてOCRし、品目候補を出力
    Scan {
        /// レシート画像
        #[arg(required = true)]
        image: PathBuf,

        /// 表示領域のサイズ (WxH、省略時は画像サイズ)
        #[arg(short, long)]
        container: Option<DisplaySize>,

        /// 表示座標での選択範囲 (x1,y1,x2,y2)
        #[arg(short, long, conflicts_with = "full")]
        selection: Option<SelectionArg>,

        /// 画像全体を使う
        #[arg(long)]
        full: bool,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// キャッシュを使用（同じ切り抜きの再OCRをスキップ）
        #[arg(long)]
        use_cache: bool,

        /// テンプレート照合をしない
        #[arg(long)]
        no_templates: bool,

        /// 続けて対話式の確認と登録を行う
        #[arg(long)]
        review: bool,
    },

    /// 切り抜きとJPEGエンコードのみ実行
    Crop {
        /// レシート画像
        #[arg(required = true)]
        image: PathBuf,

        /// 表示領域のサイズ (WxH)
        #[arg(short, long)]
        container: Option<DisplaySize>,

        /// 表示座標での選択範囲 (x1,y1,x2,y2)
        #[arg(short, long, conflicts_with = "full")]
        selection: Option<SelectionArg>,

        /// 画像全体を使う
        #[arg(long)]
        full: bool,

        /// 出力JPEGファイル
        #[arg(short, long, required = true)]
        output: PathBuf,
    },

    /// OCR結果JSON（行または単語）を品目候補にパース
    Parse {
        /// 入力JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 入力が単語の配列（座標から行を組み立てる）
        #[arg(long)]
        group_words: bool,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// フォルダ内の画像を一括スキャン（画像全体を使用）
    Batch {
        /// 画像フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 出力JSONファイル（デフォルト: 入力フォルダ/items.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// キャッシュを使用
        #[arg(long)]
        use_cache: bool,
    },

    /// 品目候補JSONを対話式に確認して登録
    Review {
        /// 品目候補JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 確認結果の保存先（省略時は上書き）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 登録せずに保存のみ
        #[arg(long)]
        no_submit: bool,
    },

    /// 設定を表示/編集
    Config {
        /// API URLを設定
        #[arg(long)]
        set_api_url: Option<String>,

        /// 認証トークンを設定
        #[arg(long)]
        set_token: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

/// 表示領域のサイズ `WxH`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplaySize(pub Size);

impl std::str::FromStr for DisplaySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Invalid size: {}. Use WxH (e.g. 800x600)", s))?;
        let width: f64 = w.trim().parse().map_err(|_| format!("Invalid width: {}", w))?;
        let height: f64 = h.trim().parse().map_err(|_| format!("Invalid height: {}", h))?;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(format!("Size must be positive: {}", s));
        }
        Ok(DisplaySize(Size::new(width, height)))
    }
}

/// 表示座標での選択範囲 `x1,y1,x2,y2`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionArg(pub Rect);

impl std::str::FromStr for SelectionArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| format!("Invalid selection: {}. Use x1,y1,x2,y2", s))?;

        match values.as_slice() {
            &[x1, y1, x2, y2] if x2 > x1 && y2 > y1 => Ok(SelectionArg(Rect::new(x1, y1, x2, y2))),
            &[_, _, _, _] => Err(format!("Selection must satisfy x1<x2 and y1<y2: {}", s)),
            _ => Err(format!("Invalid selection: {}. Use x1,y1,x2,y2", s)),
        }
    }
}
