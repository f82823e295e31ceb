//! 结果汇总服务 - 业务能力层
//!
//! 合并各分块的记录，按 (页码, 编号) 排序，并导出为 CSV / xlsx / JSON。不做去重。

use std::cmp::Ordering;
use std::path::Path;

use phf::phf_map;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AppResult, ExportError, FileError};
use crate::models::ExerciseRecord;
use crate::services::spreadsheet::{sheet_to_xlsx, Cell};

/// xlsx 工作表名称
const SHEET_NAME: &str = "Ejercicios";

/// 导出表头
pub const CSV_HEADERS: [&str; 4] = ["Ejercicio", "Página", "Descripción", "Estándar"];

/// 编号无法转换为数字时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NanPolicy {
    /// 排在同页数字编号之后
    Last,
    /// 丢弃
    Drop,
}

static NAN_POLICY_NAMES: phf::Map<&'static str, NanPolicy> = phf_map! {
    "last" => NanPolicy::Last,
    "drop" => NanPolicy::Drop,
};

impl NanPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        NAN_POLICY_NAMES.get(name.trim().to_lowercase().as_str()).copied()
    }
}

/// 结果汇总器
#[derive(Debug, Clone, Copy)]
pub struct ResultAggregator {
    nan_policy: NanPolicy,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new(NanPolicy::Last)
    }
}

impl ResultAggregator {
    pub fn new(nan_policy: NanPolicy) -> Self {
        Self { nan_policy }
    }

    /// 合并并排序
    ///
    /// 排序稳定：页码和编号都相同的记录保持原有先后顺序
    pub fn aggregate<I>(&self, batches: I) -> Vec<ExerciseRecord>
    where
        I: IntoIterator<Item = Vec<ExerciseRecord>>,
    {
        let mut records: Vec<ExerciseRecord> = batches.into_iter().flatten().collect();
        let before = records.len();

        if self.nan_policy == NanPolicy::Drop {
            records.retain(|r| r.numeric_number().is_some());
            if records.len() < before {
                debug!("丢弃 {} 条编号非数字的记录", before - records.len());
            }
        }

        records.sort_by(compare_records);
        records
    }

    /// 导出为 CSV 文本
    pub fn to_csv(&self, records: &[ExerciseRecord]) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADERS)?;
        for r in records {
            writer.write_record([
                r.number.as_str(),
                r.page.to_string().as_str(),
                r.description.as_str(),
                r.standard.as_str(),
            ])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Csv(e.into_error().into()))?;
        Ok(String::from_utf8(bytes)?)
    }

    /// 从导出的 CSV 文本读回记录
    pub fn from_csv(&self, text: &str) -> Result<Vec<ExerciseRecord>, ExportError> {
        let mut reader = csv::Reader::from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers != CSV_HEADERS {
            return Err(ExportError::HeaderMismatch { found: headers });
        }

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let page_field = record.get(1).unwrap_or_default();
            let page = page_field.parse::<u32>().map_err(|_| ExportError::BadPage {
                row: row + 1,
                value: page_field.to_string(),
            })?;
            records.push(ExerciseRecord {
                number: record.get(0).unwrap_or_default().to_string(),
                page,
                description: record.get(2).unwrap_or_default().to_string(),
                standard: record.get(3).unwrap_or_default().to_string(),
            });
        }
        Ok(records)
    }

    pub fn to_json(&self, records: &[ExerciseRecord]) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(records)?)
    }

    /// 导出为 xlsx，列与 CSV 相同，页码写为数字
    pub fn to_xlsx(&self, records: &[ExerciseRecord]) -> Result<Vec<u8>, ExportError> {
        sheet_to_xlsx(
            SHEET_NAME,
            &CSV_HEADERS,
            records.iter().map(|r| {
                vec![
                    Cell::Text(r.number.as_str()),
                    Cell::Number(f64::from(r.page)),
                    Cell::Text(r.description.as_str()),
                    Cell::Text(r.standard.as_str()),
                ]
            }),
        )
    }

    /// 写入 CSV 文件
    pub async fn write_csv(&self, records: &[ExerciseRecord], path: &Path) -> AppResult<()> {
        let content = self.to_csv(records)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| FileError::write_failed(path.display().to_string(), e))?;
        info!("💾 已导出 {} 条记录: {}", records.len(), path.display());
        Ok(())
    }

    /// 写入 xlsx 文件
    pub async fn write_xlsx(&self, records: &[ExerciseRecord], path: &Path) -> AppResult<()> {
        let content = self.to_xlsx(records)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| FileError::write_failed(path.display().to_string(), e))?;
        info!("💾 已导出 {} 条记录: {}", records.len(), path.display());
        Ok(())
    }
}

/// 先按页码，再按编号数值；非数字编号排在最后
fn compare_records(a: &ExerciseRecord, b: &ExerciseRecord) -> Ordering {
    a.page.cmp(&b.page).then_with(|| {
        match (a.numeric_number(), b.numeric_number()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    })
}
