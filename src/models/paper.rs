use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};

/// 卷子：一组题目的有序不可变快照
///
/// 题目顺序即出卷顺序，创建后不再修改。
#[derive(Debug, Clone, Serialize)]
pub struct Paper {
    pub id: i64,
    pub paper_name: String,
    pub creator_id: i64,
    /// 选中的题目ID，保持提交时的顺序
    pub question_ids: Vec<i64>,
    pub total_score: i64,
    pub create_time: DateTime<Utc>,
}

impl Paper {
    /// 卷子总题数
    pub fn question_count(&self) -> usize {
        self.question_ids.len()
    }
}

/// 把题目ID列表编码为逗号分隔字符串（存储格式）
pub(crate) fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// 把逗号分隔字符串解析回题目ID列表
pub(crate) fn parse_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| AppError::validation(format!("卷子题目ID格式错误: {}", part)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_parse_preserve_order() {
        let ids = vec![3, 1, 2];
        let encoded = join_ids(&ids);
        assert_eq!(encoded, "3,1,2");
        assert_eq!(parse_ids(&encoded).unwrap(), ids);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_ids("1,x,3").is_err());
    }
}
