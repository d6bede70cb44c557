// ==========================================
// 学校报名管理系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键 + busy_timeout)
// - 建表与唯一约束集中在此处, 唯一性由数据库保证而非应用层约定
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 显式指定数据库路径的环境变量
pub const DB_PATH_ENV: &str = "SCHOOL_ENROLLMENT_DB";

const DB_FILE_NAME: &str = "school_enrollment.db";

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// # 约束
/// - student(id_number) 在 is_active = 1 范围内唯一
/// - student.student_code / enrollment.enrollment_code 全局唯一
/// - 同一 (student_id, course_id) 至多一条 PENDING/APPROVED 报名
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS student (
            id TEXT PRIMARY KEY,
            id_number TEXT NOT NULL,
            student_code TEXT NOT NULL,
            name TEXT NOT NULL,
            gender TEXT,
            birth_date TEXT,
            contact_phone TEXT,
            address TEXT,
            emergency_contact TEXT,
            emergency_phone TEXT,
            current_grade TEXT,
            enrollment_year INTEGER NOT NULL,
            enrollment_semester TEXT NOT NULL,
            graduation_status TEXT NOT NULL DEFAULT 'IN_PROGRESS',
            academic_status TEXT NOT NULL DEFAULT 'ACTIVE',
            graduation_date TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            remarks TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS ux_student_active_id_number
            ON student(id_number) WHERE is_active = 1;
        CREATE UNIQUE INDEX IF NOT EXISTS ux_student_code
            ON student(student_code);

        CREATE TABLE IF NOT EXISTS course (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            level TEXT NOT NULL DEFAULT '',
            requires_grades INTEGER NOT NULL DEFAULT 1,
            semester TEXT NOT NULL,
            max_students INTEGER NOT NULL,
            enrolled_count INTEGER NOT NULL DEFAULT 0,
            time_slots_json TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'DRAFT',
            is_active INTEGER NOT NULL DEFAULT 1,
            CHECK (enrolled_count >= 0),
            CHECK (enrolled_count <= max_students)
        );

        CREATE TABLE IF NOT EXISTS enrollment (
            id TEXT PRIMARY KEY,
            enrollment_code TEXT NOT NULL,
            student_id TEXT NOT NULL REFERENCES student(id),
            course_id TEXT NOT NULL REFERENCES course(id),
            status TEXT NOT NULL,
            enrollment_date TEXT NOT NULL,
            insurance_start TEXT,
            insurance_end TEXT,
            remarks TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS ux_enrollment_code
            ON enrollment(enrollment_code);
        CREATE UNIQUE INDEX IF NOT EXISTS ux_enrollment_active_pair
            ON enrollment(student_id, course_id) WHERE status IN ('PENDING', 'APPROVED');
        CREATE INDEX IF NOT EXISTS idx_enrollment_student
            ON enrollment(student_id);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            target_id TEXT,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_actor_ts
            ON action_log(actor, action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径
///
/// 优先级: 环境变量 SCHOOL_ENROLLMENT_DB → 用户数据目录 → 当前目录
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from(".").join(DB_FILE_NAME);
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("school-enrollment");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join(DB_FILE_NAME);
        }
    }
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_active_id_number_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let insert = |id: &str, code: &str, active: i32| {
            conn.execute(
                r#"INSERT INTO student (id, id_number, student_code, name, enrollment_year,
                       enrollment_semester, is_active, created_at, updated_at)
                   VALUES (?1, '11010119900101123X', ?2, '张三', 2025, '2025-2026-1', ?3,
                       '2025-09-01 00:00:00', '2025-09-01 00:00:00')"#,
                rusqlite::params![id, code, active],
            )
        };

        insert("s1", "20250001", 0).unwrap();
        insert("s2", "20250002", 1).unwrap();
        assert!(insert("s3", "20250003", 1).is_err());
    }

    #[test]
    fn test_default_db_path() {
        let path = default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }
}
