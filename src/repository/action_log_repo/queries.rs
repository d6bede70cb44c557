use super::core::ActionLogRepository;
use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;
use crate::repository::row_utils::parse_datetime;
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

const ACTION_LOG_COLUMNS: &str =
    "action_id, action_type, action_ts, actor, target_id, payload_json, detail";

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM action_log WHERE action_id = ?1", ACTION_LOG_COLUMNS);
        Ok(conn.query_row(&sql, params![action_id], map_row).optional()?)
    }

    /// 查询操作人的日志 (最新在前)
    pub fn list_by_actor(&self, actor: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE actor = ?1 ORDER BY action_ts DESC, rowid DESC",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![actor], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询关联对象 (学生/报名) 的日志 (最新在前)
    pub fn list_by_target(&self, target_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE target_id = ?1 ORDER BY action_ts DESC, rowid DESC",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![target_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 最近 N 条日志
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, rowid DESC LIMIT ?1",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }
}

fn map_row(row: &Row) -> SqliteResult<ActionLog> {
    let payload_raw: Option<String> = row.get(5)?;
    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type: row.get(1)?,
        action_ts: parse_datetime(2, &row.get::<_, String>(2)?)?,
        actor: row.get(3)?,
        target_id: row.get(4)?,
        // payload 损坏时不阻断查询
        payload_json: payload_raw.and_then(|s| serde_json::from_str(&s).ok()),
        detail: row.get(6)?,
    })
}
