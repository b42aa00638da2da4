//! 判卷服务
//!
//! 按题型比对答案、计算得分，并把本次提交的错题
//! 一次性写入错题本。

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::models::{Question, QuestionType};
use crate::store::{rows, Store};

/// 判卷结果
#[derive(Debug)]
pub struct GradeResult {
    /// 答对题数
    pub correct_count: usize,
    /// 答错或未作答的题目ID，按出卷顺序
    pub wrong_question_ids: Vec<i64>,
    /// 得分（向下取整）
    pub score: i64,
    /// 卷子总分
    pub total_score: i64,
}

/// 判卷服务
#[derive(Clone)]
pub struct GradingService {
    store: Store,
}

impl GradingService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// 判卷并记录错题
    ///
    /// # 参数
    /// - `paper_id`: 卷子ID
    /// - `user_id`: 答题用户（由外部身份系统提供）
    /// - `answers`: 题目ID → 作答内容；缺失条目视为未作答（计错）
    ///
    /// # 返回
    /// 返回判卷结果。本次提交的全部错题更新在同一事务内落库，
    /// 事务失败时结果不返回、错题本不产生部分更新。
    pub fn grade_submission(
        &self,
        paper_id: i64,
        user_id: i64,
        answers: &HashMap<i64, String>,
    ) -> Result<GradeResult> {
        let (paper, questions) = {
            let conn = self.store.conn()?;
            let paper = rows::paper_by_id(&conn, paper_id)?;
            let questions = rows::questions_by_ids(&conn, &paper.question_ids)?;
            (paper, questions)
        };

        let mut correct_count = 0usize;
        let mut wrong_question_ids = Vec::new();

        for question in &questions {
            match answers.get(&question.id) {
                Some(submitted) if is_answer_correct(question, submitted) => {
                    correct_count += 1;
                }
                _ => wrong_question_ids.push(question.id),
            }
        }

        let score = compute_score(correct_count, questions.len(), paper.total_score);

        if !wrong_question_ids.is_empty() {
            self.store.with_immediate_tx(|tx| {
                let now = Utc::now();
                for &question_id in &wrong_question_ids {
                    rows::record_wrong(tx, user_id, question_id, now)?;
                }
                Ok(())
            })?;
        }

        info!(
            "✓ 判卷完成: 得分 {}/{} | 正确 {} 道 | 错误 {} 道",
            score,
            paper.total_score,
            correct_count,
            wrong_question_ids.len()
        );

        Ok(GradeResult {
            correct_count,
            wrong_question_ids,
            score,
            total_score: paper.total_score,
        })
    }
}

/// 按题型比对单题答案
fn is_answer_correct(question: &Question, submitted: &str) -> bool {
    match question.question_type {
        // 单选题：与标准答案逐字符对比，区分大小写
        QuestionType::SingleChoice => submitted == question.correct_answer,
        QuestionType::MultipleChoice => {
            multi_choice_matches(submitted, &question.correct_answer)
        }
        QuestionType::FillBlank => fill_blank_matches(submitted, &question.correct_answer),
    }
}

/// 多选题比较：按逗号拆分后排序对比，与作答顺序无关
///
/// 重复标签不做去重：带重复标签的作答与无重复的标准答案不相等。
fn multi_choice_matches(submitted: &str, correct: &str) -> bool {
    let mut submitted_labels: Vec<&str> = submitted.split(',').collect();
    let mut correct_labels: Vec<&str> = correct.split(',').collect();
    submitted_labels.sort_unstable();
    correct_labels.sort_unstable();
    submitted_labels == correct_labels
}

/// 填空题比较：两侧去除首尾空白并忽略大小写，不做其他归一化
fn fill_blank_matches(submitted: &str, correct: &str) -> bool {
    submitted.trim().to_lowercase() == correct.trim().to_lowercase()
}

/// 得分 = (正确数 / 总题数) × 卷子总分，向下取整；空卷得 0 分
fn compute_score(correct_count: usize, total_questions: usize, total_score: i64) -> i64 {
    if total_questions == 0 {
        return 0;
    }
    ((correct_count as f64 / total_questions as f64) * total_score as f64).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_choice_is_case_sensitive() {
        let question = sample_question(QuestionType::SingleChoice, "B");
        assert!(is_answer_correct(&question, "B"));
        assert!(!is_answer_correct(&question, "b"));
        assert!(!is_answer_correct(&question, "A"));
    }

    #[test]
    fn test_multiple_choice_ignores_order() {
        let question = sample_question(QuestionType::MultipleChoice, "A,C");
        assert!(is_answer_correct(&question, "A,C"));
        assert!(is_answer_correct(&question, "C,A"));
        assert!(!is_answer_correct(&question, "A"));
        assert!(!is_answer_correct(&question, "A,B,C"));
    }

    #[test]
    fn test_multiple_choice_keeps_duplicate_labels() {
        let question = sample_question(QuestionType::MultipleChoice, "A,C");
        assert!(!is_answer_correct(&question, "A,A,C"));
    }

    #[test]
    fn test_fill_blank_trims_and_ignores_case() {
        let question = sample_question(QuestionType::FillBlank, "Paris");
        assert!(is_answer_correct(&question, " paris "));
        assert!(is_answer_correct(&question, "PARIS"));
        assert!(!is_answer_correct(&question, "Pari"));
    }

    #[test]
    fn test_compute_score_floors() {
        assert_eq!(compute_score(7, 10, 100), 70);
        assert_eq!(compute_score(1, 3, 100), 33);
        assert_eq!(compute_score(0, 10, 100), 0);
        assert_eq!(compute_score(0, 0, 100), 0);
    }

    fn sample_question(question_type: QuestionType, correct_answer: &str) -> Question {
        Question {
            id: 1,
            question_type,
            content: "题干".to_string(),
            options: Vec::new(),
            correct_answer: correct_answer.to_string(),
            source_material: None,
            creator_id: 1,
            score: 3.0,
            score_count: 1,
            create_time: chrono::Utc::now(),
        }
    }
}
