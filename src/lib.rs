//! # Exercise Finder
//!
//! 在带页码标记的长文档中按主题检索练习题的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 解析层（Parsing）
//! - `parsing/` - 纯函数式扫描器，不做 IO
//! - `PageParser` - 页码标记 → 页面映射
//! - `ExerciseExtractor` - 模型输出 → 练习记录
//! - `TabularBlockDetector` - 文本中的表格块
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ChunkBuilder` - 分块
//! - `LlmService` - 外部生成服务
//! - `FixedIntervalPacer` - 调用间隔
//! - `ResultAggregator` - 排序与导出（CSV / xlsx）
//! - `WarnWriter` - 写 warn.txt 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次查询"的完整处理流程
//! - `QuerySession` - 会话上下文（文档 + 分块 + 对话历史）
//! - `QueryFlow` - 逐块查询与进度累积
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/document_processor` - 加载文档、调度查询、导出结果
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod parsing;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Chunk, ChunkPlan, ExerciseRecord, PageMap, ProgressState};
pub use orchestrator::{App, ExportedFiles, RunSummary};
pub use parsing::{ExerciseExtractor, PageParser, TabularBlockDetector};
pub use services::{ChunkBuilder, Generator, LlmService, ResultAggregator};
pub use workflow::{QueryFlow, QueryPolicy, QuerySession};
