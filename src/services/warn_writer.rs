//! 警告写入服务 - 业务能力层
//!
//! 只负责"把查询失败的分块写入 warn.txt"，不关心流程

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::FileError;

/// 警告写入服务
///
/// 每次追加一行：时间 | 文档 | 分块 | 页码范围 | 原因
pub struct WarnWriter {
    warn_file_path: PathBuf,
}

impl WarnWriter {
    /// 使用指定文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    /// 追加一条分块失败记录
    pub async fn write_chunk_failure(
        &self,
        document: &str,
        chunk_index: usize,
        page_range: &str,
        reason: &str,
    ) -> Result<(), FileError> {
        debug!(
            "写入警告: 文档 {} | 分块 {} | 页 {}",
            document,
            chunk_index + 1,
            page_range
        );

        let warn_msg = format!(
            "{} | 文档 {} | 分块 {} | 页 {} | 原因: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            document,
            chunk_index + 1,
            page_range,
            reason.replace('\n', " ")
        );

        let path = self.warn_file_path.display().to_string();
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .await
            .map_err(|e| FileError::write_failed(&path, e))?;

        file.write_all(warn_msg.as_bytes())
            .await
            .map_err(|e| FileError::write_failed(&path, e))?;
        // tokio 的 File 在后台线程完成写入，返回前需要 flush
        file.flush()
            .await
            .map_err(|e| FileError::write_failed(&path, e))?;

        Ok(())
    }
}
