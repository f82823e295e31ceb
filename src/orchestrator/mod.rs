//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的调度，是整个系统的"指挥中心"。
//!
//! ### `document_processor` - 文档处理器
//! - 管理应用生命周期（初始化、运行）
//! - 加载文档并生成 `QuerySession`
//! - 委托 `QueryFlow` 查询，失败时写 warn.txt
//! - 导出 CSV / xlsx 和表格块，输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! document_processor (处理一份文档 + 一次查询)
//!     ↓
//! workflow::QueryFlow (逐块查询)
//!     ↓
//! services (能力层：chunk / llm / pacer / aggregate / warn)
//!     ↓
//! parsing (纯文本扫描：页码 / 练习 / 表格)
//! ```

pub mod document_processor;

pub use document_processor::{App, ExportedFiles, RunSummary};
