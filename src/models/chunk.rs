/// 一个分块：页码升序排列、连续的若干页
///
/// 由 `ChunkBuilder` 构建，保证非空
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 分块序号（从 0 开始）
    pub index: usize,
    /// (页码, 页面内容)，按页码升序
    pub pages: Vec<(u32, String)>,
}

impl Chunk {
    pub fn first_page(&self) -> Option<u32> {
        self.pages.first().map(|(page, _)| *page)
    }

    pub fn last_page(&self) -> Option<u32> {
        self.pages.last().map(|(page, _)| *page)
    }

    /// 页码范围，例如 "1-25"；单页时只返回一个页码
    pub fn page_range(&self) -> String {
        match (self.first_page(), self.last_page()) {
            (Some(first), Some(last)) if first == last => first.to_string(),
            (Some(first), Some(last)) => format!("{}-{}", first, last),
            _ => String::new(),
        }
    }

    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|(page, _)| *page).collect()
    }
}

/// 分块计划
///
/// 文档中检测到页码标记时按页分块；否则整篇文档（截断后）作为一次性输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPlan {
    /// 按页分块（零页时为空列表）
    Paged(Vec<Chunk>),
    /// 无页码标记：截断到字符上限的原始文本
    RawText(String),
}

impl ChunkPlan {
    /// 需要调用外部服务的次数
    pub fn call_count(&self) -> usize {
        match self {
            ChunkPlan::Paged(chunks) => chunks.len(),
            ChunkPlan::RawText(_) => 1,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        match self {
            ChunkPlan::Paged(chunks) => chunks,
            ChunkPlan::RawText(_) => &[],
        }
    }
}
