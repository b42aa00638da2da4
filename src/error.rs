use thiserror::Error;

/// 应用程序错误类型
///
/// 业务错误分为四类：校验失败、生成失败、资源不存在、并发冲突。
/// 其余变体用于包装底层库错误。
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验失败（评分越界、字段为空、资料过短等）
    #[error("校验失败: {0}")]
    Validation(String),

    /// 生成服务失败（外部调用失败、超时或返回内容无法解析）
    #[error("题目生成失败: {0}")]
    Generation(String),

    /// 引用的资源不存在
    #[error("{kind}不存在: id={id}")]
    NotFound { kind: &'static str, id: i64 },

    /// 热点行写入冲突，有界重试耗尽
    #[error("并发冲突: 重试 {attempts} 次后写入仍未成功")]
    Conflict { attempts: u32 },

    /// 数据库错误
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    /// 连接池错误
    #[error("连接池错误: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON 序列化/反序列化失败
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 文件操作错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建校验错误
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// 创建生成错误
    pub fn generation(msg: impl Into<String>) -> Self {
        AppError::Generation(msg.into())
    }

    /// 创建资源不存在错误
    pub fn not_found(kind: &'static str, id: i64) -> Self {
        AppError::NotFound { kind, id }
    }

    /// 判断是否为 SQLite 写锁竞争错误（可重试）
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            AppError::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type Result<T> = std::result::Result<T, AppError>;
