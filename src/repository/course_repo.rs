// ==========================================
// 学校报名管理系统 - 课程数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 名额只能通过条件更新占用, 禁止"先数后写"
// ==========================================

use crate::domain::course::{Course, TimeSlot};
use crate::domain::types::{CourseStatus, Grade, SemesterId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{conversion_error, parse_enum};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const COURSE_COLUMNS: &str = r#"
    id, name, level, requires_grades, semester,
    max_students, enrolled_count, time_slots_json, status, is_active
"#;

// ==========================================
// CourseRepository - 课程仓储
// ==========================================
pub struct CourseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CourseRepository {
    /// 创建新的CourseRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新建课程
    pub fn insert(&self, course: &Course) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let time_slots_json = serde_json::to_string(&course.time_slots)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        let sql = format!(
            "INSERT INTO course ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            COURSE_COLUMNS
        );
        conn.execute(
            &sql,
            params![
                course.id,
                course.name,
                course.level.map(|g| g.as_str()).unwrap_or(""),
                course.requires_grades,
                course.semester.to_string(),
                course.max_students,
                course.enrolled_count,
                time_slots_json,
                course.status.to_db_str(),
                course.is_active,
            ],
        )?;
        Ok(())
    }

    /// 按主键查询
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Course>> {
        let conn = self.get_conn()?;
        find_by_id_in(&conn, id)
    }

    /// 查询学期内已发布的有效课程
    pub fn list_published_by_semester(&self, semester: &SemesterId) -> RepositoryResult<Vec<Course>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM course
               WHERE semester = ?1 AND status = 'PUBLISHED' AND is_active = 1
               ORDER BY name ASC, level ASC"#,
            COURSE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let courses = stmt
            .query_map(params![semester.to_string()], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(courses)
    }

    /// 更新发布状态
    pub fn update_status(&self, id: &str, status: CourseStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE course SET status = ?2 WHERE id = ?1",
            params![id, status.to_db_str()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Course".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_id_tx(tx: &Transaction, id: &str) -> RepositoryResult<Option<Course>> {
        find_by_id_in(tx, id)
    }

    /// 原子占用一个名额
    ///
    /// # 返回
    /// - Ok(true): 占用成功 (enrolled_count 已 +1)
    /// - Ok(false): 已满员, 未做任何修改
    pub fn try_reserve_seat_tx(tx: &Transaction, course_id: &str) -> RepositoryResult<bool> {
        let affected = tx.execute(
            r#"UPDATE course
               SET enrolled_count = enrolled_count + 1
               WHERE id = ?1 AND enrolled_count < max_students"#,
            params![course_id],
        )?;
        Ok(affected == 1)
    }

    /// 释放一个名额 (报名离开 PENDING/APPROVED 时调用)
    pub fn release_seat_tx(tx: &Transaction, course_id: &str) -> RepositoryResult<()> {
        tx.execute(
            r#"UPDATE course
               SET enrolled_count = enrolled_count - 1
               WHERE id = ?1 AND enrolled_count > 0"#,
            params![course_id],
        )?;
        Ok(())
    }
}

fn find_by_id_in(conn: &Connection, id: &str) -> RepositoryResult<Option<Course>> {
    let sql = format!("SELECT {} FROM course WHERE id = ?1", COURSE_COLUMNS);
    Ok(conn.query_row(&sql, params![id], map_row).optional()?)
}

/// 映射数据库行到Course对象
fn map_row(row: &Row) -> rusqlite::Result<Course> {
    let level_raw: String = row.get(2)?;
    let level = if level_raw.trim().is_empty() {
        None
    } else {
        Some(parse_enum(2, &level_raw, Grade::parse, "课程年级")?)
    };
    let slots_raw: String = row.get(7)?;
    let time_slots: Vec<TimeSlot> =
        serde_json::from_str(&slots_raw).map_err(|_| conversion_error(7, &slots_raw, "上课时段"))?;

    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        level,
        requires_grades: row.get(3)?,
        semester: parse_enum(4, &row.get::<_, String>(4)?, SemesterId::parse, "学期")?,
        max_students: row.get(5)?,
        enrolled_count: row.get(6)?,
        time_slots,
        status: parse_enum(8, &row.get::<_, String>(8)?, CourseStatus::from_db_str, "课程状态")?,
        is_active: row.get(9)?,
    })
}
