//! 流程层（Workflow Layer）
//!
//! 定义"一次查询"的完整处理流程：
//! - `query_ctx` - 会话上下文（文档 + 分块 + 对话历史）
//! - `prompt` - 系统指令和分块内容消息
//! - `query_flow` - 按策略逐块调用外部服务并累积结果

pub mod prompt;
pub mod query_ctx;
pub mod query_flow;

pub use prompt::{chunk_message, page_tag, whole_document_message, SYSTEM_INSTRUCTION};
pub use query_ctx::QuerySession;
pub use query_flow::{ChunkResponse, QueryFlow, QueryOutcome, QueryPolicy};
