/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::fs;

use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::config::Config;
use crate::error::FileError;

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<(), FileError> {
    let log_header = format!(
        "{}\n练习检索日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|e| FileError::write_failed(log_file_path, e))
}

/// 向日志文件追加一段带标题的内容
pub async fn append_log_section(
    log_file_path: &str,
    title: &str,
    body: &str,
) -> Result<(), FileError> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .await
        .map_err(|e| FileError::write_failed(log_file_path, e))?;

    let section = format!(
        "{}\n{} - {}\n{}\n{}\n\n",
        "─".repeat(60),
        title,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "─".repeat(60),
        body
    );
    file.write_all(section.as_bytes())
        .await
        .map_err(|e| FileError::write_failed(log_file_path, e))?;
    file.flush()
        .await
        .map_err(|e| FileError::write_failed(log_file_path, e))
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 分块练习检索模式");
    info!("🤖 模型: {}", config.llm_model_name);
    info!("📋 查询策略: {:?}", config.query_policy);
    info!("📄 每块最多 {} 页", config.pages_per_chunk);
    info!("⏳ 调用间隔: {} 秒", config.pacing_secs);
    info!("{}", "=".repeat(60));
}

/// 记录文档加载信息
///
/// # 参数
/// - `name`: 文档名称
/// - `pages`: 解析出的页数
/// - `calls`: 需要调用的次数
pub fn log_document_loaded(name: &str, pages: usize, calls: usize) {
    info!("✓ 文档已加载: {}", name);
    if pages == 0 {
        info!("📄 未检测到页码标记，将整篇文档作为一次输入");
    } else {
        info!("📄 共 {} 页，分为 {} 块", pages, calls);
    }
}

/// 记录分块开始信息
///
/// # 参数
/// - `index`: 分块序号（从 0 开始）
/// - `total`: 分块总数
/// - `page_range`: 页码范围
/// - `chars`: 内容字符数
pub fn log_chunk_start(index: usize, total: usize, page_range: &str, chars: usize) {
    info!("\n{}", "─".repeat(60));
    info!("📦 开始处理第 {}/{} 块", index + 1, total);
    if !page_range.is_empty() {
        info!("📄 页码范围: {}", page_range);
    }
    info!("✏️ 内容长度: {} 字符", chars);
}

/// 记录分块完成信息
pub fn log_chunk_complete(index: usize, total: usize, response_len: usize) {
    info!(
        "✓ 第 {}/{} 块完成，响应长度: {} 字符",
        index + 1,
        total,
        response_len
    );
}

/// 打印最终统计信息
///
/// # 参数
/// - `records`: 抽取出的记录数
/// - `chunks_done`: 完成的分块数
/// - `chunks_total`: 分块总数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(
    records: usize,
    chunks_done: usize,
    chunks_total: usize,
    log_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 完成分块: {}/{}", chunks_done, chunks_total);
    info!("📝 抽取练习: {} 条", records);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
