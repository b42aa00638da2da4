//! 组卷服务
//!
//! 把选中的题目按提交顺序固化为一份不可变的卷子。

use chrono::Utc;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{Paper, Question};
use crate::store::{rows, Store};

/// 卷子默认总分
const DEFAULT_TOTAL_SCORE: i64 = 100;

/// 组卷服务
#[derive(Clone)]
pub struct PaperService {
    store: Store,
}

impl PaperService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// 创建卷子
    ///
    /// # 参数
    /// - `paper_name`: 卷子名称（非空）
    /// - `question_ids`: 选中的题目ID，顺序即出卷顺序
    /// - `total_score`: 卷子总分，缺省 100
    /// - `creator_id`: 创建者（由外部身份系统提供）
    ///
    /// # 返回
    /// 返回新建的卷子。任一题目不存在时整体失败，不产生写入。
    pub fn create_paper(
        &self,
        paper_name: &str,
        question_ids: &[i64],
        total_score: Option<i64>,
        creator_id: i64,
    ) -> Result<Paper> {
        let paper_name = paper_name.trim();
        if paper_name.is_empty() {
            return Err(AppError::validation("卷子名称不能为空"));
        }
        if question_ids.is_empty() {
            return Err(AppError::validation("请至少选择一道题目"));
        }
        let total_score = total_score.unwrap_or(DEFAULT_TOTAL_SCORE);
        if total_score < 1 {
            return Err(AppError::validation(format!(
                "卷子总分必须为正数: {}",
                total_score
            )));
        }

        let paper_id = self.store.with_immediate_tx(|tx| {
            // 入库前确认所有选中题目存在，保证引用完整性
            for &id in question_ids {
                if !rows::question_exists(tx, id)? {
                    return Err(AppError::not_found("题目", id));
                }
            }
            rows::insert_paper(
                tx,
                paper_name,
                creator_id,
                question_ids,
                total_score,
                Utc::now(),
            )
        })?;

        info!(
            "✓ 卷子创建成功: {} (共 {} 道题)",
            paper_name,
            question_ids.len()
        );

        self.store.paper(paper_id)
    }

    /// 读取卷子及其题目，题目按出卷顺序排列
    ///
    /// 供答题页与文档导出协作方使用。
    pub fn paper_with_questions(&self, paper_id: i64) -> Result<(Paper, Vec<Question>)> {
        let conn = self.store.conn()?;
        let paper = rows::paper_by_id(&conn, paper_id)?;
        let questions = rows::questions_by_ids(&conn, &paper.question_ids)?;
        Ok((paper, questions))
    }
}
