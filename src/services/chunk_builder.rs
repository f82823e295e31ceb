//! 分块服务 - 业务能力层
//!
//! 把 `PageMap` 切成页数受限的有序分块

use tracing::debug;

use crate::error::ConfigError;
use crate::models::{Chunk, ChunkPlan, PageMap};

/// 默认每块页数
pub const DEFAULT_PAGES_PER_CHUNK: usize = 25;
/// 无页码标记时的默认字符上限
pub const DEFAULT_MAX_CHARS: usize = 50_000;

/// 分块构建器
#[derive(Debug, Clone, Copy)]
pub struct ChunkBuilder {
    pages_per_chunk: usize,
    max_chars: usize,
}

impl Default for ChunkBuilder {
    fn default() -> Self {
        Self {
            pages_per_chunk: DEFAULT_PAGES_PER_CHUNK,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl ChunkBuilder {
    pub fn new(pages_per_chunk: usize, max_chars: usize) -> Result<Self, ConfigError> {
        if pages_per_chunk == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pages_per_chunk".to_string(),
                reason: "每块页数必须大于 0".to_string(),
            });
        }
        Ok(Self {
            pages_per_chunk,
            max_chars,
        })
    }

    /// 构建分块计划
    ///
    /// - 有页面：按页码升序，每 `pages_per_chunk` 页一块，最后一块可以更小
    /// - 无页面但原文非空：原文截断到 `max_chars` 个字符，作为一次性输入
    /// - 都为空：零个分块
    pub fn build(&self, pages: &PageMap, raw_text: &str) -> ChunkPlan {
        if pages.is_empty() {
            if raw_text.trim().is_empty() {
                return ChunkPlan::Paged(Vec::new());
            }
            debug!("未检测到页码标记，整篇文档截断为 {} 字符", self.max_chars);
            return ChunkPlan::RawText(truncate_chars(raw_text, self.max_chars).to_string());
        }

        ChunkPlan::Paged(self.chunk_pages(pages))
    }

    /// 只按页分块，零页返回空列表
    pub fn chunk_pages(&self, pages: &PageMap) -> Vec<Chunk> {
        let all: Vec<(u32, String)> = pages
            .iter()
            .map(|(page, content)| (page, content.to_string()))
            .collect();

        let chunks: Vec<Chunk> = all
            .chunks(self.pages_per_chunk)
            .enumerate()
            .map(|(index, group)| Chunk {
                index,
                pages: group.to_vec(),
            })
            .collect();

        debug!(
            "分块完成: {} 页 → {} 块 (每块最多 {} 页)",
            pages.len(),
            chunks.len(),
            self.pages_per_chunk
        );
        chunks
    }
}

/// 按字符（而不是字节）截断
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(range: std::ops::RangeInclusive<u32>) -> PageMap {
        range.map(|p| (p, format!("contenido {}", p))).collect()
    }

    #[test]
    fn test_thirty_pages_in_two_chunks() {
        let chunks = ChunkBuilder::new(25, 50_000).unwrap().chunk_pages(&pages(1..=30));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page_numbers(), (1..=25).collect::<Vec<_>>());
        assert_eq!(chunks[1].page_numbers(), (26..=30).collect::<Vec<_>>());
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn test_partition_covers_every_page_once() {
        let source: PageMap = [7u32, 1, 42, 3, 19, 8, 100, 55, 2]
            .iter()
            .map(|p| (*p, p.to_string()))
            .collect();

        for size in 1..=10 {
            let chunks = ChunkBuilder::new(size, 10).unwrap().chunk_pages(&source);
            let flattened: Vec<u32> = chunks.iter().flat_map(|c| c.page_numbers()).collect();

            assert_eq!(flattened, source.page_numbers());
            assert!(chunks.iter().all(|c| !c.pages.is_empty() && c.pages.len() <= size));
        }
    }

    #[test]
    fn test_zero_pages_zero_chunks() {
        let plan = ChunkBuilder::default().build(&PageMap::new(), "   \n");
        assert_eq!(plan, ChunkPlan::Paged(vec![]));
    }

    #[test]
    fn test_raw_text_fallback_is_truncated_by_chars() {
        let plan = ChunkBuilder::new(25, 5).unwrap().build(&PageMap::new(), "ñandú rápido");
        assert_eq!(plan, ChunkPlan::RawText("ñandú".to_string()));
    }

    #[test]
    fn test_pages_win_over_raw_text() {
        let plan = ChunkBuilder::default().build(&pages(1..=3), "ignored");
        assert!(matches!(plan, ChunkPlan::Paged(ref chunks) if chunks.len() == 1));
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        assert!(ChunkBuilder::new(0, 100).is_err());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("página", 2), "pá");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
