/// 一次查询的进度
///
/// 只由 `QueryFlow` 修改，调用方在整次查询期间持有
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub chunks_total: usize,
    pub chunks_done: usize,
    /// 各分块响应按页码范围标注后拼接的结果
    pub combined_response: String,
}

impl ProgressState {
    pub fn new(chunks_total: usize) -> Self {
        Self {
            chunks_total,
            ..Default::default()
        }
    }

    /// 追加一个分块的响应；空响应不追加，但仍计入进度
    pub fn record_chunk(&mut self, page_range: &str, response: &str) {
        let response = response.trim();
        if !response.is_empty() {
            if page_range.is_empty() {
                self.combined_response.push_str(response);
            } else {
                self.combined_response
                    .push_str(&format!("### Páginas {}\n{}", page_range, response));
            }
            self.combined_response.push_str("\n\n");
        }
        self.chunks_done += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.chunks_done >= self.chunks_total
    }

    /// 完成比例（0.0 ~ 1.0）
    pub fn fraction(&self) -> f32 {
        if self.chunks_total == 0 {
            1.0
        } else {
            self.chunks_done as f32 / self.chunks_total as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_chunk_tags_page_range() {
        let mut progress = ProgressState::new(2);
        progress.record_chunk("1-25", "Ejercicio 1 (Página 3): algo\n");

        assert_eq!(progress.chunks_done, 1);
        assert_eq!(
            progress.combined_response,
            "### Páginas 1-25\nEjercicio 1 (Página 3): algo\n\n"
        );
        assert!(!progress.is_complete());
        assert_eq!(progress.fraction(), 0.5);
    }

    #[test]
    fn test_empty_response_only_advances() {
        let mut progress = ProgressState::new(1);
        progress.record_chunk("1-2", "   ");

        assert!(progress.combined_response.is_empty());
        assert!(progress.is_complete());
    }
}
