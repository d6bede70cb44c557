// ==========================================
// 学校报名管理系统 - 报名数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 报名记录永不删除, 只更新状态
// ==========================================

use crate::domain::enrollment::Enrollment;
use crate::domain::types::{EnrollmentStatus, SemesterId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    format_date, format_datetime, parse_date, parse_datetime, parse_enum, parse_opt_date,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const ENROLLMENT_COLUMNS: &str = r#"
    id, enrollment_code, student_id, course_id, status, enrollment_date,
    insurance_start, insurance_end, remarks, created_by, created_at, updated_at
"#;

// ==========================================
// EnrollmentRepository - 报名仓储
// ==========================================
pub struct EnrollmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EnrollmentRepository {
    /// 创建新的EnrollmentRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按主键查询
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Enrollment>> {
        let conn = self.get_conn()?;
        find_by_id_in(&conn, id)
    }

    /// 查询学生的全部报名 (按创建时间升序)
    pub fn list_by_student(&self, student_id: &str) -> RepositoryResult<Vec<Enrollment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM enrollment
               WHERE student_id = ?1
               ORDER BY created_at ASC, enrollment_code ASC"#,
            ENROLLMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 统计课程的有效报名数 (PENDING/APPROVED)
    pub fn count_active_by_course(&self, course_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row(
            r#"SELECT COUNT(*) FROM enrollment
               WHERE course_id = ?1 AND status IN ('PENDING', 'APPROVED')"#,
            params![course_id],
            |row| row.get(0),
        )?)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_id_tx(tx: &Transaction, id: &str) -> RepositoryResult<Option<Enrollment>> {
        find_by_id_in(tx, id)
    }

    /// 查询 (学生, 课程) 的全部报名记录, 最新在前
    pub fn list_by_student_and_course_tx(
        tx: &Transaction,
        student_id: &str,
        course_id: &str,
    ) -> RepositoryResult<Vec<Enrollment>> {
        let sql = format!(
            r#"SELECT {} FROM enrollment
               WHERE student_id = ?1 AND course_id = ?2
               ORDER BY created_at DESC, enrollment_code DESC"#,
            ENROLLMENT_COLUMNS
        );
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id, course_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 查询学生的有效报名
    pub fn list_active_by_student_tx(
        tx: &Transaction,
        student_id: &str,
    ) -> RepositoryResult<Vec<Enrollment>> {
        let sql = format!(
            r#"SELECT {} FROM enrollment
               WHERE student_id = ?1 AND status IN ('PENDING', 'APPROVED')
               ORDER BY created_at ASC"#,
            ENROLLMENT_COLUMNS
        );
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 学生有效报名对应的 (课程ID, 课程名称, 学期)
    pub fn list_active_courses_of_student_tx(
        tx: &Transaction,
        student_id: &str,
    ) -> RepositoryResult<Vec<(String, String, SemesterId)>> {
        let mut stmt = tx.prepare(
            r#"SELECT c.id, c.name, c.semester
               FROM enrollment e
               JOIN course c ON c.id = e.course_id
               WHERE e.student_id = ?1 AND e.status IN ('PENDING', 'APPROVED')"#,
        )?;
        let rows = stmt
            .query_map(params![student_id], |row| {
                let semester_raw: String = row.get(2)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    parse_enum(2, &semester_raw, SemesterId::parse, "学期")?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 学生已通过报名所属课程的学期
    pub fn list_approved_semesters_tx(
        tx: &Transaction,
        student_id: &str,
    ) -> RepositoryResult<Vec<SemesterId>> {
        let mut stmt = tx.prepare(
            r#"SELECT c.semester
               FROM enrollment e
               JOIN course c ON c.id = e.course_id
               WHERE e.student_id = ?1 AND e.status = 'APPROVED'"#,
        )?;
        let rows = stmt
            .query_map(params![student_id], |row| {
                let raw: String = row.get(0)?;
                parse_enum(0, &raw, SemesterId::parse, "学期")
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 指定日期前缀下的最大流水号
    pub fn max_code_sequence_tx(tx: &Transaction, prefix: &str) -> RepositoryResult<Option<u32>> {
        let max: Option<i64> = tx.query_row(
            r#"SELECT MAX(CAST(SUBSTR(enrollment_code, ?2) AS INTEGER))
               FROM enrollment
               WHERE enrollment_code LIKE ?1 || '%'"#,
            params![prefix, prefix.len() as i64 + 1],
            |row| row.get(0),
        )?;
        Ok(max.map(|v| v.max(0) as u32))
    }

    pub fn insert_tx(tx: &Transaction, enrollment: &Enrollment) -> RepositoryResult<()> {
        let sql = format!(
            r#"INSERT INTO enrollment ({}) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12
            )"#,
            ENROLLMENT_COLUMNS
        );
        tx.execute(
            &sql,
            params![
                enrollment.id,
                enrollment.enrollment_code,
                enrollment.student_id,
                enrollment.course_id,
                enrollment.status.to_db_str(),
                format_date(enrollment.enrollment_date),
                enrollment.insurance_start.map(format_date),
                enrollment.insurance_end.map(format_date),
                enrollment.remarks,
                enrollment.created_by,
                format_datetime(enrollment.created_at),
                format_datetime(enrollment.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 条件更新状态 (乐观校验原状态)
    ///
    /// # 返回
    /// - Err(InvalidStateTransition): 原状态已被并发修改
    pub fn update_status_tx(
        tx: &Transaction,
        id: &str,
        from: EnrollmentStatus,
        to: EnrollmentStatus,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let affected = tx.execute(
            "UPDATE enrollment SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
            params![id, from.to_db_str(), to.to_db_str(), format_datetime(updated_at)],
        )?;
        if affected == 0 {
            return Err(RepositoryError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

fn find_by_id_in(conn: &Connection, id: &str) -> RepositoryResult<Option<Enrollment>> {
    let sql = format!("SELECT {} FROM enrollment WHERE id = ?1", ENROLLMENT_COLUMNS);
    Ok(conn.query_row(&sql, params![id], map_row).optional()?)
}

/// 映射数据库行到Enrollment对象
fn map_row(row: &Row) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        id: row.get(0)?,
        enrollment_code: row.get(1)?,
        student_id: row.get(2)?,
        course_id: row.get(3)?,
        status: parse_enum(4, &row.get::<_, String>(4)?, EnrollmentStatus::from_db_str, "报名状态")?,
        enrollment_date: parse_date(5, &row.get::<_, String>(5)?)?,
        insurance_start: parse_opt_date(6, row.get(6)?)?,
        insurance_end: parse_opt_date(7, row.get(7)?)?,
        remarks: row.get(8)?,
        created_by: row.get(9)?,
        created_at: parse_datetime(10, &row.get::<_, String>(10)?)?,
        updated_at: parse_datetime(11, &row.get::<_, String>(11)?)?,
    })
}
