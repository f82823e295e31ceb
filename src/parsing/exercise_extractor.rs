//! 练习记录抽取
//!
//! 模型输出的约定格式：
//!
//! ```text
//! Ejercicio <N> (Página <P>): <descripción>
//! ```
//!
//! 描述一直延续到下一个练习标题或文本结束。

use std::sync::LazyLock;

use phf::phf_map;
use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::debug;

use crate::models::ExerciseRecord;

/// 严格语法：页码必须存在
pub const STRICT_HEADER_PATTERN: &str =
    r"(?i)\**ejercicio\s+(\d+(?:\.\d+)*)\s*\(\s*p[aá]gina\s+(\d+)\s*\)\s*:?\**";
/// 宽松语法：页码可省略，缺失时记为 0（此时标题必须位于行首）
pub const TOLERANT_HEADER_PATTERN: &str =
    r"(?i)\**ejercicio\s+(\d+(?:\.\d+)*)(?:\s*\(\s*p[aá]gina\s+(\d+)\s*\))?\s*:?\**";

/// 描述为空时使用的占位文本
pub const NO_DESCRIPTION: &str = "Sin descripción";

static STRICT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(STRICT_HEADER_PATTERN).expect("常量正则"));
static TOLERANT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOLERANT_HEADER_PATTERN).expect("常量正则"));

/// 抽取语法变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarVariant {
    Strict,
    Tolerant,
}

static GRAMMAR_NAMES: phf::Map<&'static str, GrammarVariant> = phf_map! {
    "strict" => GrammarVariant::Strict,
    "tolerant" => GrammarVariant::Tolerant,
    "lenient" => GrammarVariant::Tolerant,
};

impl GrammarVariant {
    pub fn from_name(name: &str) -> Option<Self> {
        GRAMMAR_NAMES.get(name.trim().to_lowercase().as_str()).copied()
    }

    fn regex(self) -> &'static Regex {
        match self {
            GrammarVariant::Strict => &STRICT_HEADER,
            GrammarVariant::Tolerant => &TOLERANT_HEADER,
        }
    }
}

/// 练习抽取器
///
/// 纯文本匹配，不校验页码是否真的出现在原文档中
#[derive(Debug, Clone, Copy)]
pub struct ExerciseExtractor {
    variant: GrammarVariant,
}

impl Default for ExerciseExtractor {
    fn default() -> Self {
        Self::new(GrammarVariant::Strict)
    }
}

impl ExerciseExtractor {
    pub fn new(variant: GrammarVariant) -> Self {
        Self { variant }
    }

    /// 从一块响应文本中抽取记录，按出现顺序返回
    ///
    /// 文本不符合语法时返回空列表
    pub fn extract(&self, text: &str, standard: &str) -> Vec<ExerciseRecord> {
        // 没有页码的标题只在行首才算数，句中提到的"ejercicio N"属于描述
        let headers: Vec<Captures<'_>> = self
            .variant
            .regex()
            .captures_iter(text)
            .filter(|caps| {
                caps.get(2).is_some() || caps.get(0).is_some_and(|m| starts_line(text, m.start()))
            })
            .collect();

        let records: Vec<ExerciseRecord> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, caps)| {
                let whole = caps.get(0)?;
                let body_end = headers
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map(|m| m.start())
                    .unwrap_or(text.len());

                let number = caps.get(1)?.as_str().to_string();
                let page = match caps.get(2) {
                    Some(m) => m.as_str().parse::<u32>().ok()?,
                    None => 0,
                };
                let description = text[whole.end()..body_end].trim();

                Some(ExerciseRecord {
                    number,
                    page,
                    description: if description.is_empty() {
                        NO_DESCRIPTION.to_string()
                    } else {
                        description.to_string()
                    },
                    standard: standard.to_string(),
                })
            })
            .collect();

        if records.is_empty() {
            debug!(
                "响应文本不符合练习语法 ({:?})，未抽取到记录，文本长度: {}",
                self.variant,
                text.len()
            );
        }

        records
    }
}

/// 匹配位置之前同一行只有空白或列表符号
fn starts_line(text: &str, start: usize) -> bool {
    text[..start]
        .rsplit('\n')
        .next()
        .unwrap_or_default()
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '-' | '*' | '#' | '>' | '•'))
}

/// 按约定语法渲染记录（抽取的逆操作）
pub fn render(records: &[ExerciseRecord]) -> String {
    records
        .iter()
        .map(|r| format!("Ejercicio {} (Página {}): {}\n", r.number, r.page, r.description))
        .collect()
}
