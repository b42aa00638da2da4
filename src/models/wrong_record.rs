use chrono::{DateTime, Utc};
use serde::Serialize;

/// 错题记录
///
/// 每个 (用户, 题目) 组合至多一条；答错只会累加次数，
/// 之后答对也不会清除历史。
#[derive(Debug, Clone, Serialize)]
pub struct WrongRecord {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    /// 累计答错次数，始终 >= 1
    pub wrong_count: i64,
    /// 最近一次答错时间
    pub last_wrong_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
}
