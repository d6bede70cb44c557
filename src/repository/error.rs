// ==========================================
// 学校报名管理系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    /// SQLITE_BUSY / SQLITE_LOCKED, 可整体重试
    #[error("数据库忙: {0}")]
    DatabaseBusy(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 业务规则错误 =====
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ===== 数据质量错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl RepositoryError {
    /// 是否为指定列上的唯一约束冲突
    ///
    /// SQLite 消息形如 "UNIQUE constraint failed: enrollment.enrollment_code"
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        match self {
            RepositoryError::UniqueConstraintViolation(msg) => msg.contains(column),
            _ => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, RepositoryError::DatabaseBusy(_))
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref msg) => {
                let text = msg.clone().unwrap_or_else(|| failure.to_string());
                match failure.code {
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                        RepositoryError::DatabaseBusy(text)
                    }
                    _ if text.contains("UNIQUE") => RepositoryError::UniqueConstraintViolation(text),
                    _ if text.contains("FOREIGN KEY") => RepositoryError::ForeignKeyViolation(text),
                    _ => RepositoryError::DatabaseQueryError(text),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unique_violation_is_classified_with_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (code TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err: RepositoryError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();

        assert!(err.is_unique_violation_on("t.code"));
        assert!(!err.is_unique_violation_on("t.other"));
        assert!(!err.is_busy());
    }

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: RepositoryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
