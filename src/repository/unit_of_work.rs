// ==========================================
// 学校报名管理系统 - 事务单元
// ==========================================
// 职责: 在单个 BEGIN IMMEDIATE 事务中执行多条语句
// 红线: 闭包返回 Err 时整体回滚; 返回 Ok 时提交
// ==========================================

use crate::repository::error::RepositoryError;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};

// ==========================================
// UnitOfWork
// ==========================================
// IMMEDIATE: 事务开始即取得写锁, 容量/重复校验的读与随后的写之间
// 不会被其他连接的写入插队
#[derive(Clone)]
pub struct UnitOfWork {
    conn: Arc<Mutex<Connection>>,
}

impl UnitOfWork {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 共享连接 (供只读仓储复用)
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    /// 在事务中执行闭包
    ///
    /// # 返回
    /// - Ok(T): 闭包成功且事务已提交
    /// - Err(E): 闭包失败(已回滚) 或 事务开启/提交失败
    pub fn run<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        // Err 时 tx 被 drop, 自动回滚
        let value = f(&tx)?;

        tx.commit().map_err(RepositoryError::from)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RepositoryResult;

    fn setup() -> UnitOfWork {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER NOT NULL);").unwrap();
        UnitOfWork::new(Arc::new(Mutex::new(conn)))
    }

    fn count(uow: &UnitOfWork) -> i64 {
        let conn = uow.connection();
        let conn = conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_commit_on_ok() {
        let uow = setup();
        let result: RepositoryResult<()> = uow.run(|tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(count(&uow), 1);
    }

    #[test]
    fn test_rollback_on_err() {
        let uow = setup();
        let result: RepositoryResult<()> = uow.run(|tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Err(RepositoryError::InternalError("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(count(&uow), 0);
    }
}
