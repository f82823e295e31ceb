//! 文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一份文档从读取到导出的全过程。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件，按配置组装解析器、分块器和查询流程
//! 2. **文档加载**：读取文件、解析页码、生成分块计划
//! 3. **查询调度**：委托 `QueryFlow` 逐块查询
//! 4. **失败记录**：分块失败时写入 warn.txt 并向上返回错误
//! 5. **结果导出**：抽取练习记录、排序、写 CSV / xlsx，检测并导出表格块
//! 6. **全局统计**：输出完成分块数和记录数

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppResult, FileError, QueryError};
use crate::models::{ExerciseRecord, ProgressState};
use crate::parsing::{decode_document, ExerciseExtractor, PageParser, Table, TabularBlockDetector};
use crate::services::{
    sheet_to_xlsx, Cell, ChunkBuilder, Generator, Pacer, ResultAggregator, WarnWriter,
};
use crate::utils::logging::{
    append_log_section, init_log_file, log_document_loaded, log_startup, print_final_stats,
};
use crate::workflow::{QueryFlow, QuerySession};

/// 表格块导出文件名前缀
const TABLE_FILE_PREFIX: &str = "datos_";
/// 表格块 xlsx 工作表名称
const TABLE_SHEET_NAME: &str = "Datos";

/// 同一份数据的 CSV 和 xlsx 文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub csv: PathBuf,
    pub xlsx: PathBuf,
}

impl ExportedFiles {
    fn beside(csv: PathBuf) -> Self {
        let xlsx = csv.with_extension("xlsx");
        Self { csv, xlsx }
    }
}

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// 排序后的练习记录
    pub records: Vec<ExerciseRecord>,
    pub progress: ProgressState,
    pub exported: ExportedFiles,
    /// 导出的表格块，按出现顺序
    pub tables: Vec<ExportedFiles>,
}

/// 应用主结构
pub struct App {
    config: Config,
    parser: PageParser,
    builder: ChunkBuilder,
    flow: QueryFlow,
    extractor: ExerciseExtractor,
    aggregator: ResultAggregator,
    detector: TabularBlockDetector,
    warn_writer: WarnWriter,
}

impl App {
    /// 初始化应用（真实 LLM）
    pub async fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;
        let flow = QueryFlow::new(&config);
        Self::assemble(config, flow)
    }

    /// 使用指定的生成器和节奏控制初始化
    pub fn with_parts(
        config: Config,
        generator: Arc<dyn Generator>,
        pacer: Arc<dyn Pacer>,
    ) -> AppResult<Self> {
        config.validate()?;
        let flow = QueryFlow::with_parts(generator, pacer, config.query_policy, config.max_chars)
            .verbose(config.verbose_logging);
        Self::assemble(config, flow)
    }

    fn assemble(config: Config, flow: QueryFlow) -> AppResult<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        let builder = ChunkBuilder::new(config.pages_per_chunk, config.max_chars)?;
        let parser = PageParser::new(config.marker_style).with_header(config.include_page_header);
        let warn_writer = WarnWriter::with_path(sibling_path(&config.output_log_file, "warn.txt"));

        Ok(Self {
            parser,
            builder,
            flow,
            extractor: ExerciseExtractor::new(config.grammar),
            aggregator: ResultAggregator::new(config.nan_policy),
            detector: TabularBlockDetector::new(),
            warn_writer,
            config,
        })
    }

    /// 读取文档并生成会话
    pub async fn load_session(&self, document_path: &Path) -> AppResult<QuerySession> {
        let path_str = document_path.display().to_string();
        let bytes = tokio::fs::read(document_path)
            .await
            .map_err(|e| FileError::read_failed(&path_str, e))?;
        let text = decode_document(&bytes)?;

        let name = document_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(path_str);
        let session = QuerySession::from_document(name, text, &self.parser, &self.builder);
        log_document_loaded(
            &session.document_name,
            session.pages.len(),
            session.plan.call_count(),
        );
        Ok(session)
    }

    /// 运行应用主逻辑：加载文档 → 查询 → 导出
    pub async fn run(&self, document_path: &Path, query: &str) -> AppResult<RunSummary> {
        let mut session = self.load_session(document_path).await?;
        self.run_session(&mut session, query).await
    }

    /// 对已加载的会话执行一次查询
    ///
    /// 同一个会话可以多次调用（滚动对话和轮换模式依赖这一点）
    pub async fn run_session(
        &self,
        session: &mut QuerySession,
        query: &str,
    ) -> AppResult<RunSummary> {
        info!("{} 🔎 查询: {}", session, query);

        let outcome = match self.flow.run(session, query).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.record_failure(session, &err).await;
                return Err(err.into());
            }
        };

        let records = self
            .aggregator
            .aggregate(outcome.extract(&self.extractor, query));
        if records.is_empty() {
            warn!("{} ⚠️ 没有抽取到任何练习记录", session);
        }

        let exported = ExportedFiles::beside(PathBuf::from(&self.config.output_csv));
        self.aggregator.write_csv(&records, &exported.csv).await?;
        self.aggregator.write_xlsx(&records, &exported.xlsx).await?;

        let tables = self.export_tables(&outcome.progress.combined_response).await?;

        append_log_section(
            &self.config.output_log_file,
            &format!("{} | {}", session.document_name, query),
            &outcome.progress.combined_response,
        )
        .await?;

        print_final_stats(
            records.len(),
            outcome.progress.chunks_done,
            outcome.progress.chunks_total,
            &self.config.output_log_file,
        );

        Ok(RunSummary {
            records,
            progress: outcome.progress,
            exported,
            tables,
        })
    }

    /// 分块失败：写 warn.txt，并把失败前的部分结果留在日志文件里
    async fn record_failure(&self, session: &QuerySession, err: &QueryError) {
        let QueryError::ChunkFailed {
            chunk_index,
            page_range,
            source,
            progress,
        } = err;

        if let Err(e) = self
            .warn_writer
            .write_chunk_failure(
                &session.document_name,
                *chunk_index,
                page_range,
                &source.to_string(),
            )
            .await
        {
            error!("写入 warn.txt 失败: {}", e);
        }

        if !progress.combined_response.is_empty() {
            let title = format!(
                "{} | 部分结果 ({}/{} 块)",
                session.document_name, progress.chunks_done, progress.chunks_total
            );
            if let Err(e) =
                append_log_section(&self.config.output_log_file, &title, &progress.combined_response)
                    .await
            {
                error!("写入日志文件失败: {}", e);
            }
        }
    }

    /// 把合并响应中的表格块导出为 datos_{n}.csv / datos_{n}.xlsx（与结果 CSV 同目录）
    async fn export_tables(&self, combined_response: &str) -> AppResult<Vec<ExportedFiles>> {
        let tables = self.detector.tables(combined_response);
        let mut exported = Vec::with_capacity(tables.len());

        for (i, table) in tables.iter().enumerate() {
            let files = ExportedFiles::beside(sibling_path(
                &self.config.output_csv,
                &format!("{}{}.csv", TABLE_FILE_PREFIX, i + 1),
            ));
            write_file(&files.csv, table.to_csv()?.into_bytes()).await?;
            write_file(&files.xlsx, table_to_xlsx(table)?).await?;
            info!("📊 表格已导出: {} ({} 行)", files.csv.display(), table.rows.len());
            exported.push(files);
        }

        Ok(exported)
    }
}

async fn write_file(path: &Path, content: Vec<u8>) -> AppResult<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| FileError::write_failed(path.display().to_string(), e))?;
    Ok(())
}

fn table_to_xlsx(table: &Table) -> AppResult<Vec<u8>> {
    let headers: Vec<&str> = table.headers.iter().map(String::as_str).collect();
    let rows = table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| Cell::Text(cell.as_str())).collect::<Vec<_>>());
    Ok(sheet_to_xlsx(TABLE_SHEET_NAME, &headers, rows)?)
}

/// 与 `anchor` 同目录的文件
fn sibling_path(anchor: &str, file_name: &str) -> PathBuf {
    match Path::new(anchor).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_path() {
        assert_eq!(sibling_path("out/ejercicios.csv", "datos_1.csv"), Path::new("out/datos_1.csv"));
        assert_eq!(sibling_path("ejercicios.csv", "datos_1.csv"), Path::new("datos_1.csv"));
    }
}
