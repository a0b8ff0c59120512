//! Pantry Scan Common Library
//!
//! レシートスキャンの中核ロジック（I/Oなし）
//! - 切り抜き範囲の座標計算とドラッグハンドル
//! - OCR行データのパース
//! - 分割アップロードの計画

pub mod error;
pub mod geometry;
pub mod handles;
pub mod crop;
pub mod types;
pub mod receipt;
pub mod layout;
pub mod upload;

pub use error::{Error, Result};
pub use geometry::{CropRegion, ImageSize, Point, Rect, RelativeCrop, Size};
pub use handles::{Handle, MIN_SELECTION_SIZE};
pub use crop::CropController;
pub use types::{ConfirmationItem, Line, Template, TemplateDetails, Word};
pub use receipt::{parse_lines, serialize_items, deserialize_items, ReceiptParser, LineKind};
pub use layout::group_words;
pub use upload::{UploadInfo, UploadPlan, DEFAULT_CHUNK_SIZE};
