//! 表格块检测
//!
//! 逐行扫描任意文本，把连续的分隔符行（逗号或制表符）切成表格块，其余为普通文本行。
//! 状态机只有 `Prose` / `Table` 两个状态，转移表见 [`TRANSITIONS`]。

use tracing::warn;

use crate::error::{ExportError, TabularParseError};

/// 构成表格块所需的最少连续行数，单独一行分隔符文本按普通文本处理
pub const MIN_BLOCK_LINES: usize = 2;

/// 扫描状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Prose = 0,
    Table = 1,
}

/// 行分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Text = 0,
    Delimited = 1,
}

/// 转移动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// 输出为普通文本行
    EmitProse,
    /// 开始新的候选块
    OpenBlock,
    /// 追加到当前候选块
    ExtendBlock,
    /// 结束当前块，再把本行作为普通文本输出
    CloseBlock,
}

/// 转移表：`TRANSITIONS[state][class] = (next_state, action)`
pub const TRANSITIONS: [[(ScanState, Action); 2]; 2] = [
    // Prose
    [
        (ScanState::Prose, Action::EmitProse),
        (ScanState::Table, Action::OpenBlock),
    ],
    // Table
    [
        (ScanState::Prose, Action::CloseBlock),
        (ScanState::Table, Action::ExtendBlock),
    ],
];

/// 行分类：含逗号或制表符且去空白后非空
pub fn classify(line: &str) -> LineClass {
    if (line.contains(',') || line.contains('\t')) && !line.trim().is_empty() {
        LineClass::Delimited
    } else {
        LineClass::Text
    }
}

/// 解析后的表格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// 从分隔文本行解析
    ///
    /// 第一行含制表符且不含逗号时按制表符分隔，否则按逗号；每行列数必须与表头一致
    pub fn parse(lines: &[&str]) -> Result<Self, TabularParseError> {
        let delimiter = match lines.first() {
            Some(first) if first.contains('\t') && !first.contains(',') => b'\t',
            _ => b',',
        };
        let joined = lines.join("\n");
        let malformed = |source: csv::Error| TabularParseError::Malformed {
            line_count: lines.len(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(joined.as_bytes());

        let headers = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(malformed)?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// 重新序列化为 CSV 文本
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Csv(e.into_error().into()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// 扫描输出片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Prose(String),
    Table(Table),
}

/// 表格块检测器
#[derive(Debug, Default, Clone, Copy)]
pub struct TabularBlockDetector;

impl TabularBlockDetector {
    pub fn new() -> Self {
        Self
    }

    /// 把文本切分为按原顺序排列的文本行 / 表格片段
    pub fn detect(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut block: Vec<&str> = Vec::new();
        let mut state = ScanState::Prose;

        for line in text.lines() {
            let (next, action) = TRANSITIONS[state as usize][classify(line) as usize];
            match action {
                Action::EmitProse => segments.push(Segment::Prose(line.to_string())),
                Action::OpenBlock | Action::ExtendBlock => block.push(line),
                Action::CloseBlock => {
                    self.flush(&mut block, &mut segments);
                    segments.push(Segment::Prose(line.to_string()));
                }
            }
            state = next;
        }
        self.flush(&mut block, &mut segments);

        segments
    }

    /// 只返回成功解析的表格
    pub fn tables(&self, text: &str) -> Vec<Table> {
        self.detect(text)
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Table(table) => Some(table),
                Segment::Prose(_) => None,
            })
            .collect()
    }

    fn flush(&self, block: &mut Vec<&str>, segments: &mut Vec<Segment>) {
        if block.is_empty() {
            return;
        }

        if block.len() >= MIN_BLOCK_LINES {
            match Table::parse(block.as_slice()) {
                Ok(table) => {
                    segments.push(Segment::Table(table));
                    block.clear();
                    return;
                }
                Err(e) => warn!("⚠️ 表格块解析失败，按原文输出: {}", e),
            }
        }

        segments.extend(block.drain(..).map(|line| Segment::Prose(line.to_string())));
    }
}
