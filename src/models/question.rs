use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 题目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// 单选题
    SingleChoice,
    /// 多选题
    MultipleChoice,
    /// 填空题
    FillBlank,
}

impl QuestionType {
    /// 获取存储标识
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::FillBlank => "fill_blank",
        }
    }

    /// 是否为选择类题型（需要选项）
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultipleChoice)
    }
}

impl std::str::FromStr for QuestionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_choice" => Ok(QuestionType::SingleChoice),
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "fill_blank" => Ok(QuestionType::FillBlank),
            _ => Err(AppError::validation(format!("未知题目类型: {}", s))),
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 题库中的一道题目
///
/// 由资料导入流程创建；内容与题型创建后不再变化，
/// 评分字段只由评分服务更新。
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: i64,
    pub question_type: QuestionType,
    /// 题干内容
    pub content: String,
    /// 选项列表（填空题为空）
    pub options: Vec<String>,
    /// 正确答案：单选为单个标签，多选为逗号分隔的标签集合，填空为文本
    pub correct_answer: String,
    /// 来源资料摘录（最长 500 字，超出部分截断）
    pub source_material: Option<String>,
    pub creator_id: i64,
    /// 社区平均评分，范围 [1.0, 5.0]
    pub score: f64,
    /// 评分人次，始终 >= 1
    pub score_count: i64,
    pub create_time: DateTime<Utc>,
}

/// 待插入的新题目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_type: QuestionType,
    pub content: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub source_material: Option<String>,
    pub creator_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_question_type_roundtrip() {
        for t in [
            QuestionType::SingleChoice,
            QuestionType::MultipleChoice,
            QuestionType::FillBlank,
        ] {
            assert_eq!(QuestionType::from_str(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn test_question_type_rejects_unknown() {
        assert!(QuestionType::from_str("true_false").is_err());
    }

    #[test]
    fn test_is_choice() {
        assert!(QuestionType::SingleChoice.is_choice());
        assert!(QuestionType::MultipleChoice.is_choice());
        assert!(!QuestionType::FillBlank.is_choice());
    }
}
