//! 查询会话上下文
//!
//! 封装"当前是哪份文档、切成了哪些块、聊过什么"，每次查询都显式传入

use std::fmt::Display;

use crate::models::{ChunkPlan, ConversationTurn, PageMap};
use crate::parsing::PageParser;
use crate::services::ChunkBuilder;

/// 查询会话
///
/// 由调用方持有，`QueryFlow::run` 通过 `&mut` 借用并更新历史和轮换游标
#[derive(Debug, Clone)]
pub struct QuerySession {
    /// 文档名称（仅用于日志）
    pub document_name: String,
    /// 原始全文
    pub raw_text: String,
    pub pages: PageMap,
    pub plan: ChunkPlan,
    /// 累积的对话历史（滚动对话模式使用）
    pub history: Vec<ConversationTurn>,
    /// 下一次轮换查询要发送的分块序号
    pub page_group_cursor: usize,
}

impl QuerySession {
    /// 创建新的会话
    pub fn new(
        document_name: impl Into<String>,
        raw_text: impl Into<String>,
        pages: PageMap,
        plan: ChunkPlan,
    ) -> Self {
        Self {
            document_name: document_name.into(),
            raw_text: raw_text.into(),
            pages,
            plan,
            history: Vec::new(),
            page_group_cursor: 0,
        }
    }

    /// 解析文档并分块
    pub fn from_document(
        document_name: impl Into<String>,
        text: impl Into<String>,
        parser: &PageParser,
        builder: &ChunkBuilder,
    ) -> Self {
        let text = text.into();
        let pages = parser.parse(&text);
        let plan = builder.build(&pages, &text);
        Self::new(document_name, text, pages, plan)
    }

    /// 清空对话历史和轮换游标，文档保持不变
    pub fn reset(&mut self) {
        self.history.clear();
        self.page_group_cursor = 0;
    }
}

impl Display for QuerySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文档 {} 页数#{} 分块#{}]",
            self.document_name,
            self.pages.len(),
            self.plan.call_count()
        )
    }
}
