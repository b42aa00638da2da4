//! 行级 SQL 操作
//!
//! 统一持有各实体的读写语句；函数接收 `&Connection`，
//! 事务内调用时传入 `&Transaction`（自动解引用）。

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::error::{AppError, Result};
use crate::models::paper::{join_ids, parse_ids};
use crate::models::{NewQuestion, Paper, Question, QuestionType, WrongRecord};
use crate::store::QuestionSort;

const QUESTION_COLUMNS: &str = "id, question_type, content, options, correct_answer, \
     source_material, creator_id, score, score_count, create_time";

fn map_question(row: &Row<'_>) -> rusqlite::Result<Question> {
    let type_raw: String = row.get(1)?;
    let question_type = QuestionType::from_str(&type_raw).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("未知题目类型: {}", type_raw).into(),
        )
    })?;

    let options_raw: Option<String> = row.get(3)?;
    let options = match options_raw {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        None => Vec::new(),
    };

    Ok(Question {
        id: row.get(0)?,
        question_type,
        content: row.get(2)?,
        options,
        correct_answer: row.get(4)?,
        source_material: row.get(5)?,
        creator_id: row.get(6)?,
        score: row.get(7)?,
        score_count: row.get(8)?,
        create_time: row.get(9)?,
    })
}

// ========== 题目 ==========

pub(crate) fn insert_question(
    conn: &Connection,
    item: &NewQuestion,
    now: DateTime<Utc>,
) -> Result<i64> {
    // 选项仅选择类题型落库，填空题存 NULL
    let options_json = if item.options.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&item.options)?)
    };

    conn.execute(
        "INSERT INTO questions \
             (question_type, content, options, correct_answer, source_material, \
              creator_id, score, score_count, create_time) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 3.0, 1, ?7)",
        params![
            item.question_type.as_str(),
            item.content,
            options_json,
            item.correct_answer,
            item.source_material,
            item.creator_id,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn question_by_id(conn: &Connection, question_id: i64) -> Result<Question> {
    let sql = format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS);
    match conn.query_row(&sql, params![question_id], map_question) {
        Ok(question) => Ok(question),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(AppError::not_found("题目", question_id)),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn question_exists(conn: &Connection, question_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM questions WHERE id = ?1",
        params![question_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// 按给定顺序读取一组题目；任一ID不存在即报错
pub(crate) fn questions_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Question>> {
    let sql = format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut questions = Vec::with_capacity(ids.len());
    for &id in ids {
        match stmt.query_row(params![id], map_question) {
            Ok(question) => questions.push(question),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(AppError::not_found("题目", id));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(questions)
}

pub(crate) fn list_questions(
    conn: &Connection,
    type_filter: Option<QuestionType>,
    sort: QuestionSort,
) -> Result<Vec<Question>> {
    let order = match sort {
        QuestionSort::ScoreDesc => "score DESC, id",
        QuestionSort::CreateTimeDesc => "create_time DESC, id",
    };

    let mut questions = Vec::new();
    match type_filter {
        Some(kind) => {
            let sql = format!(
                "SELECT {} FROM questions WHERE question_type = ?1 ORDER BY {}",
                QUESTION_COLUMNS, order
            );
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map(params![kind.as_str()], map_question)?;
            for question in mapped {
                questions.push(question?);
            }
        }
        None => {
            let sql = format!("SELECT {} FROM questions ORDER BY {}", QUESTION_COLUMNS, order);
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map([], map_question)?;
            for question in mapped {
                questions.push(question?);
            }
        }
    }
    Ok(questions)
}

pub(crate) fn question_rating(conn: &Connection, question_id: i64) -> Result<(f64, i64)> {
    match conn.query_row(
        "SELECT score, score_count FROM questions WHERE id = ?1",
        params![question_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    ) {
        Ok(pair) => Ok(pair),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(AppError::not_found("题目", question_id)),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn update_question_rating(
    conn: &Connection,
    question_id: i64,
    score: f64,
    score_count: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE questions SET score = ?2, score_count = ?3 WHERE id = ?1",
        params![question_id, score, score_count],
    )?;
    Ok(())
}

// ========== 卷子 ==========

pub(crate) fn insert_paper(
    conn: &Connection,
    paper_name: &str,
    creator_id: i64,
    question_ids: &[i64],
    total_score: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO papers (paper_name, creator_id, question_ids, total_score, create_time) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![paper_name, creator_id, join_ids(question_ids), total_score, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn paper_by_id(conn: &Connection, paper_id: i64) -> Result<Paper> {
    let raw = conn.query_row(
        "SELECT id, paper_name, creator_id, question_ids, total_score, create_time \
         FROM papers WHERE id = ?1",
        params![paper_id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, DateTime<Utc>>(5)?,
            ))
        },
    );

    match raw {
        Ok((id, paper_name, creator_id, ids_raw, total_score, create_time)) => Ok(Paper {
            id,
            paper_name,
            creator_id,
            question_ids: parse_ids(&ids_raw)?,
            total_score,
            create_time,
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(AppError::not_found("卷子", paper_id)),
        Err(e) => Err(e.into()),
    }
}

// ========== 错题记录 ==========

/// 记录一次答错：已有记录则累加次数并刷新时间，否则新建
///
/// 依赖 (user_id, question_id) 唯一约束，单条语句内完成，
/// 同一提交内的批量更新由外层事务保证原子性。
pub(crate) fn record_wrong(
    conn: &Connection,
    user_id: i64,
    question_id: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO wrong_questions \
             (user_id, question_id, wrong_count, last_wrong_time, create_time) \
         VALUES (?1, ?2, 1, ?3, ?3) \
         ON CONFLICT (user_id, question_id) DO UPDATE SET \
             wrong_count = wrong_count + 1, \
             last_wrong_time = excluded.last_wrong_time",
        params![user_id, question_id, now],
    )?;
    Ok(())
}

fn map_wrong_record(row: &Row<'_>) -> rusqlite::Result<WrongRecord> {
    Ok(WrongRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        question_id: row.get(2)?,
        wrong_count: row.get(3)?,
        last_wrong_time: row.get(4)?,
        create_time: row.get(5)?,
    })
}

/// 某用户的全部错题记录，按最近答错时间降序
pub(crate) fn wrong_records_for_user(conn: &Connection, user_id: i64) -> Result<Vec<WrongRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, question_id, wrong_count, last_wrong_time, create_time \
         FROM wrong_questions WHERE user_id = ?1 \
         ORDER BY last_wrong_time DESC, id DESC",
    )?;
    let mapped = stmt.query_map(params![user_id], map_wrong_record)?;
    let mut records = Vec::new();
    for record in mapped {
        records.push(record?);
    }
    Ok(records)
}
