//! 错题本服务
//!
//! 只增不减的错题流水：答错累加、之后答对也不清除。

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{Question, WrongRecord};
use crate::store::{rows, Store};

/// 错题本服务
#[derive(Clone)]
pub struct WrongBookService {
    store: Store,
}

impl WrongBookService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// 记录一次答错
    ///
    /// (用户, 题目) 已有记录时累加次数并刷新最近答错时间，
    /// 否则新建记录。判卷流程批量记错走同一行级操作的事务版本。
    pub fn record_wrong(&self, user_id: i64, question_id: i64) -> Result<()> {
        self.store.with_immediate_tx(|tx| {
            if !rows::question_exists(tx, question_id)? {
                return Err(AppError::not_found("题目", question_id));
            }
            rows::record_wrong(tx, user_id, question_id, Utc::now())
        })
    }

    /// 个人错题本，最近答错的在前
    ///
    /// 每条记录附带题目内容，可直接用于展示或交给文档导出协作方。
    pub fn list_for_user(&self, user_id: i64) -> Result<Vec<(WrongRecord, Question)>> {
        let conn = self.store.conn()?;
        let records = rows::wrong_records_for_user(&conn, user_id)?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let question = rows::question_by_id(&conn, record.question_id)?;
            entries.push((record, question));
        }
        Ok(entries)
    }
}
