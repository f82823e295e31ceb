//! 文本解析层
//!
//! 纯函数式的扫描器，不做任何 IO：
//! - `page_parser` - 页码标记 → `PageMap`
//! - `exercise_extractor` - 模型输出 → `ExerciseRecord`
//! - `tabular` - 任意文本 → 文本行 / 表格块

pub mod exercise_extractor;
pub mod page_parser;
pub mod tabular;

pub use exercise_extractor::{render, ExerciseExtractor, GrammarVariant, NO_DESCRIPTION};
pub use page_parser::{decode_document, MarkerStyle, PageParser};
pub use tabular::{Segment, Table, TabularBlockDetector};
