//! 页码标记解析
//!
//! 把带 `[Pagina N]` / `[Página N]` 标记行的纯文本拆成按页码索引的 `PageMap`

use std::sync::LazyLock;

use phf::phf_map;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::PageParseError;
use crate::models::PageMap;

/// 不带重音的标记：`[Pagina N]`
pub const PLAIN_MARKER_PATTERN: &str = r"(?i)^\s*\[pagina\s+(\d+)\]\s*(.*)$";
/// 带重音的标记：`[Página N]`（大小写不敏感，按 Unicode 折叠）
pub const ACCENTED_MARKER_PATTERN: &str = r"(?i)^\s*\[página\s+(\d+)\]\s*(.*)$";
/// 两种写法都接受
pub const ANY_MARKER_PATTERN: &str = r"(?i)^\s*\[p[aá]gina\s+(\d+)\]\s*(.*)$";

static PLAIN_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLAIN_MARKER_PATTERN).expect("常量正则"));
static ACCENTED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ACCENTED_MARKER_PATTERN).expect("常量正则"));
static ANY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ANY_MARKER_PATTERN).expect("常量正则"));

/// 页码标记写法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    /// `[Pagina N]`
    Plain,
    /// `[Página N]`
    Accented,
    /// 两者皆可
    Any,
}

static MARKER_STYLE_NAMES: phf::Map<&'static str, MarkerStyle> = phf_map! {
    "plain" => MarkerStyle::Plain,
    "pagina" => MarkerStyle::Plain,
    "accented" => MarkerStyle::Accented,
    "página" => MarkerStyle::Accented,
    "any" => MarkerStyle::Any,
    "auto" => MarkerStyle::Any,
};

impl MarkerStyle {
    /// 从配置名称解析（不区分大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        MARKER_STYLE_NAMES
            .get(name.trim().to_lowercase().as_str())
            .copied()
    }

    fn regex(self) -> &'static Regex {
        match self {
            MarkerStyle::Plain => &PLAIN_MARKER,
            MarkerStyle::Accented => &ACCENTED_MARKER,
            MarkerStyle::Any => &ANY_MARKER,
        }
    }
}

/// 一行匹配到的页码标记
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker<'a> {
    pub page: u32,
    /// 标记之后同一行剩余的文本
    pub rest: &'a str,
}

/// 扫描状态
///
/// 是否有打开的页由状态本身表示，页码 0 是合法页
enum ScanState<'a> {
    /// 第一个标记之前，内容全部丢弃
    Preamble,
    InPage {
        page: u32,
        header: &'a str,
        lines: Vec<&'a str>,
    },
}

/// 把原始字节解码为文本（必须是 UTF-8），错误中带第一个非法字节的偏移
pub fn decode_document(bytes: &[u8]) -> Result<&str, PageParseError> {
    std::str::from_utf8(bytes).map_err(|e| PageParseError::InvalidUtf8 {
        offset: e.valid_up_to(),
    })
}

/// 页码解析器
#[derive(Debug, Clone, Copy)]
pub struct PageParser {
    style: MarkerStyle,
    include_header: bool,
}

impl Default for PageParser {
    fn default() -> Self {
        Self::new(MarkerStyle::Any)
    }
}

impl PageParser {
    pub fn new(style: MarkerStyle) -> Self {
        Self {
            style,
            include_header: false,
        }
    }

    /// 页面内容是否以标记行开头
    pub fn with_header(mut self, include_header: bool) -> Self {
        self.include_header = include_header;
        self
    }

    /// 判断一行是否是页码标记
    ///
    /// 页码不是合法整数（或超出 u32）时不算标记，按普通内容处理
    pub fn match_marker<'a>(&self, line: &'a str) -> Option<Marker<'a>> {
        let caps = self.style.regex().captures(line)?;
        let page = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let rest = caps.get(2).map(|m| m.as_str().trim_end()).unwrap_or_default();
        Some(Marker { page, rest })
    }

    /// 解析文本
    ///
    /// - 第一个标记之前的行被丢弃
    /// - 遇到标记时关闭当前页并打开新页
    /// - 重复的页码以最后一次出现为准
    pub fn parse(&self, text: &str) -> PageMap {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut pages = PageMap::new();
        let mut state = ScanState::Preamble;

        for raw_line in text.split('\n') {
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

            match self.match_marker(line) {
                Some(marker) => {
                    self.close(state, &mut pages);
                    let mut lines = Vec::new();
                    if !marker.rest.is_empty() {
                        lines.push(marker.rest);
                    }
                    state = ScanState::InPage {
                        page: marker.page,
                        header: line,
                        lines,
                    };
                }
                None => {
                    if let ScanState::InPage { lines, .. } = &mut state {
                        lines.push(line);
                    }
                }
            }
        }
        self.close(state, &mut pages);

        debug!("页码解析完成，共 {} 页", pages.len());
        pages
    }

    fn close(&self, state: ScanState<'_>, pages: &mut PageMap) {
        let ScanState::InPage {
            page,
            header,
            mut lines,
        } = state
        else {
            return;
        };

        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        let body = lines.join("\n");
        let content = if self.include_header {
            format!("{}\n{}", header, body)
        } else {
            body
        };

        if pages.insert(page, content).is_some() {
            debug!("页码 {} 重复出现，以最后一次为准", page);
        }
    }
}
