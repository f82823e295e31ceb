use serde::{Deserialize, Serialize};

/// 从模型输出中抽取的一条练习记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    /// 练习编号（可转换为数字，但保留原文）
    pub number: String,
    /// 所在页码；宽松语法下缺失时为 0
    pub page: u32,
    pub description: String,
    /// 产生该记录的查询条件
    pub standard: String,
}

impl ExerciseRecord {
    /// 编号的数值形式，无法转换时返回 `None`
    pub fn numeric_number(&self) -> Option<f64> {
        self.number
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
    }
}
