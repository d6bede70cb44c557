// ==========================================
// 学校报名管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::policy_reader::{EnrollmentPolicy, EnrollmentPolicyReader};
use crate::db::open_sqlite_connection;
use crate::domain::types::SemesterId;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    /// 写入 global scope 的配置值 (存在则覆盖)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES (?1, ?2, ?3, datetime('now'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 启动时记录生效配置
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let entries = self.list_global_entries()?;
        let config_map: BTreeMap<String, String> = entries.into_iter().collect();
        serde_json::to_string(&json!(config_map))
            .map_err(|e| RepositoryError::InternalError(e.to_string()))
    }

    fn list_global_entries(&self) -> RepositoryResult<Vec<(String, String)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 读取数值配置, 缺失时取默认值
    fn get_parsed_or<T: FromStr>(&self, key: &str, default: T) -> RepositoryResult<T> {
        match self.get_global_config_value(key)? {
            Some(raw) => parse_value(key, &raw),
            None => Ok(default),
        }
    }

    /// 读取 max_active_courses/{semester} 形式的学期覆写
    fn get_semester_overrides(&self) -> RepositoryResult<HashMap<SemesterId, u32>> {
        let prefix = format!("{}/", config_keys::MAX_ACTIVE_COURSES);
        let mut overrides = HashMap::new();

        for (key, raw) in self.list_global_entries()? {
            let Some(semester_raw) = key.strip_prefix(&prefix) else {
                continue;
            };
            let semester =
                SemesterId::parse(semester_raw).ok_or_else(|| RepositoryError::FieldValueError {
                    field: key.clone(),
                    message: format!("学期格式错误: {}", semester_raw),
                })?;
            overrides.insert(semester, parse_value(&key, &raw)?);
        }

        Ok(overrides)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> RepositoryResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| RepositoryError::FieldValueError {
            field: key.to_string(),
            message: format!("无法解析配置值: {}", raw),
        })
}

#[async_trait]
impl EnrollmentPolicyReader for ConfigManager {
    async fn load_policy(&self) -> RepositoryResult<EnrollmentPolicy> {
        let defaults = EnrollmentPolicy::default();

        let policy = EnrollmentPolicy {
            max_active_courses: self
                .get_parsed_or(config_keys::MAX_ACTIVE_COURSES, defaults.max_active_courses)?,
            semester_overrides: self.get_semester_overrides()?,
            max_courses_per_submission: self.get_parsed_or(
                config_keys::MAX_COURSES_PER_SUBMISSION,
                defaults.max_courses_per_submission,
            )?,
            program_length_semesters: self.get_parsed_or(
                config_keys::PROGRAM_LENGTH_SEMESTERS,
                defaults.program_length_semesters,
            )?,
            code_retry_max_attempts: self.get_parsed_or(
                config_keys::CODE_RETRY_MAX_ATTEMPTS,
                defaults.code_retry_max_attempts,
            )?,
            code_retry_backoff_min_ms: self.get_parsed_or(
                config_keys::CODE_RETRY_BACKOFF_MIN_MS,
                defaults.code_retry_backoff_min_ms,
            )?,
            code_retry_backoff_max_ms: self.get_parsed_or(
                config_keys::CODE_RETRY_BACKOFF_MAX_MS,
                defaults.code_retry_backoff_max_ms,
            )?,
            tx_busy_retry_max_attempts: self.get_parsed_or(
                config_keys::TX_BUSY_RETRY_MAX_ATTEMPTS,
                defaults.tx_busy_retry_max_attempts,
            )?,
        };

        if policy.program_length_semesters == 0 {
            return Err(RepositoryError::FieldValueError {
                field: config_keys::PROGRAM_LENGTH_SEMESTERS.to_string(),
                message: "学制必须大于 0".to_string(),
            });
        }

        Ok(policy)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 并发报名上限 (可追加 "/{学期}" 覆写)
    pub const MAX_ACTIVE_COURSES: &str = "max_active_courses";
    pub const MAX_COURSES_PER_SUBMISSION: &str = "max_courses_per_submission";

    // 学制
    pub const PROGRAM_LENGTH_SEMESTERS: &str = "program_length_semesters";

    // 编号生成重试
    pub const CODE_RETRY_MAX_ATTEMPTS: &str = "code_retry_max_attempts";
    pub const CODE_RETRY_BACKOFF_MIN_MS: &str = "code_retry_backoff_min_ms";
    pub const CODE_RETRY_BACKOFF_MAX_MS: &str = "code_retry_backoff_max_ms";

    // 事务忙重试
    pub const TX_BUSY_RETRY_MAX_ATTEMPTS: &str = "tx_busy_retry_max_attempts";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Term;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_table_empty() {
        let manager = setup();
        let policy = manager.load_policy().await.unwrap();
        assert_eq!(policy, EnrollmentPolicy::default());
    }

    #[tokio::test]
    async fn test_overrides_are_applied() {
        let manager = setup();
        manager.set_global_config_value("max_active_courses", "3").unwrap();
        manager
            .set_global_config_value("max_active_courses/2025-2026-2", "5")
            .unwrap();
        manager.set_global_config_value("program_length_semesters", "4").unwrap();

        let policy = manager.load_policy().await.unwrap();
        assert_eq!(policy.max_active_courses, 3);
        assert_eq!(policy.program_length_semesters, 4);
        assert_eq!(
            policy.max_active_courses_for(&SemesterId::new(2025, Term::Second)),
            5
        );
        assert_eq!(
            policy.max_active_courses_for(&SemesterId::new(2025, Term::First)),
            3
        );
    }

    #[tokio::test]
    async fn test_malformed_value_is_field_error() {
        let manager = setup();
        manager.set_global_config_value("max_active_courses", "two").unwrap();

        let err = manager.load_policy().await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::FieldValueError { ref field, .. } if field == "max_active_courses"
        ));
    }

    #[test]
    fn test_upsert_and_snapshot() {
        let manager = setup();
        manager.set_global_config_value("max_active_courses", "3").unwrap();
        manager.set_global_config_value("max_active_courses", "4").unwrap();

        assert_eq!(
            manager.get_global_config_value("max_active_courses").unwrap(),
            Some("4".to_string())
        );
        assert_eq!(
            manager.get_config_snapshot().unwrap(),
            r#"{"max_active_courses":"4"}"#
        );
    }
}
