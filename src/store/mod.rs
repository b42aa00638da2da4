//! 存储层 - 连接池与事务管理
//!
//! 负责：
//! - r2d2 连接池管理与 Schema 初始化
//! - 写事务的锁竞争重试（有界）
//! - 题目/卷子/错题记录的行级读写（见 `rows`）

pub(crate) mod rows;

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Transaction, TransactionBehavior};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::{NewQuestion, Paper, Question, QuestionType};

pub(crate) type SqlitePool = Pool<SqliteConnectionManager>;
pub(crate) type SqlitePooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// 写事务锁竞争的最大尝试次数
const MAX_WRITE_ATTEMPTS: u32 = 3;
/// 重试前的退避时间
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// 题目列表排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSort {
    /// 按社区评分降序（默认）
    ScoreDesc,
    /// 按创建时间降序
    CreateTimeDesc,
}

/// 存储入口
///
/// 克隆开销很低（内部是连接池句柄），服务层各持有一份。
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// 打开（或创建）数据库并初始化 Schema
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|c| {
            c.pragma_update(None, "foreign_keys", &"ON")?;
            c.pragma_update(None, "journal_mode", &"WAL")?;
            c.pragma_update(None, "synchronous", &"NORMAL")?;
            // 写锁等待上限（毫秒）：超时快速失败，由上层有界重试
            c.pragma_update(None, "busy_timeout", &3000i64)?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(15)
            .connection_timeout(Duration::from_secs(10))
            .build(manager)
            .map_err(AppError::Pool)?;

        let store = Store { pool };
        store.init_schema()?;
        Ok(store)
    }

    /// 获取数据库连接
    pub(crate) fn conn(&self) -> Result<SqlitePooledConnection> {
        self.pool.get().map_err(AppError::Pool)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                question_type   TEXT    NOT NULL
                    CHECK (question_type IN ('single_choice', 'multiple_choice', 'fill_blank')),
                content         TEXT    NOT NULL,
                options         TEXT,
                correct_answer  TEXT    NOT NULL,
                source_material TEXT,
                creator_id      INTEGER NOT NULL,
                score           REAL    NOT NULL DEFAULT 3.0,
                score_count     INTEGER NOT NULL DEFAULT 1,
                create_time     TEXT    NOT NULL
            );

            CREATE TABLE IF NOT EXISTS papers (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                paper_name   TEXT    NOT NULL,
                creator_id   INTEGER NOT NULL,
                question_ids TEXT    NOT NULL,
                total_score  INTEGER NOT NULL DEFAULT 100,
                create_time  TEXT    NOT NULL
            );

            CREATE TABLE IF NOT EXISTS wrong_questions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL,
                question_id     INTEGER NOT NULL REFERENCES questions (id),
                wrong_count     INTEGER NOT NULL DEFAULT 1,
                last_wrong_time TEXT    NOT NULL,
                create_time     TEXT    NOT NULL,
                UNIQUE (user_id, question_id)
            );

            CREATE INDEX IF NOT EXISTS idx_wrong_questions_user
                ON wrong_questions (user_id, last_wrong_time);
            "#,
        )?;
        Ok(())
    }

    /// 在 BEGIN IMMEDIATE 事务中执行写操作
    ///
    /// 立即获取写锁，使同一行上的读-改-写串行化；锁竞争时有界重试，
    /// 耗尽后以并发冲突错误返回。闭包可能被执行多次，必须只依赖事务内状态。
    pub(crate) fn with_immediate_tx<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result: Result<T> = (|| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let value = op(&tx)?;
                tx.commit()?;
                Ok(value)
            })();

            match result {
                Err(ref e) if e.is_busy() && attempt < MAX_WRITE_ATTEMPTS => {
                    warn!("写事务遇到锁竞争，准备第 {} 次重试", attempt + 1);
                    std::thread::sleep(RETRY_BACKOFF);
                }
                Err(e) if e.is_busy() => {
                    return Err(AppError::Conflict { attempts: attempt });
                }
                other => return other,
            }
        }
    }

    // ========== 对外读写入口 ==========

    /// 批量插入题目（单事务，整体提交或整体失败）
    pub fn insert_questions(&self, items: &[NewQuestion]) -> Result<Vec<i64>> {
        self.with_immediate_tx(|tx| {
            let now = Utc::now();
            items
                .iter()
                .map(|item| rows::insert_question(tx, item, now))
                .collect()
        })
    }

    /// 按ID读取题目
    pub fn question(&self, question_id: i64) -> Result<Question> {
        let conn = self.conn()?;
        rows::question_by_id(&conn, question_id)
    }

    /// 列出题库中的题目，支持按类型过滤与排序
    pub fn list_questions(
        &self,
        type_filter: Option<QuestionType>,
        sort: QuestionSort,
    ) -> Result<Vec<Question>> {
        let conn = self.conn()?;
        rows::list_questions(&conn, type_filter, sort)
    }

    /// 按ID读取卷子
    pub fn paper(&self, paper_id: i64) -> Result<Paper> {
        let conn = self.conn()?;
        rows::paper_by_id(&conn, paper_id)
    }
}
