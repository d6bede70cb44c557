// ==========================================
// 学校报名管理系统 - 学生数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: *_tx 关联函数在调用方的事务中执行
// ==========================================

use crate::domain::student::Student;
use crate::domain::types::{AcademicStatus, GradeStanding, GraduationStatus, SemesterId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    format_date, format_datetime, parse_datetime, parse_enum, parse_opt_date,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const STUDENT_COLUMNS: &str = r#"
    id, id_number, student_code, name, gender, birth_date, contact_phone,
    address, emergency_contact, emergency_phone,
    current_grade, enrollment_year, enrollment_semester,
    graduation_status, academic_status, graduation_date,
    is_active, remarks, created_at, updated_at
"#;

// ==========================================
// StudentRepository - 学生仓储
// ==========================================
pub struct StudentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StudentRepository {
    /// 创建新的StudentRepository实例
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
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        find_by_id_in(&conn, id)
    }

    /// 查询身份证号对应的有效学生
    pub fn find_active_by_id_number(&self, id_number: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM student WHERE id_number = ?1 AND is_active = 1",
            STUDENT_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![id_number], map_row)
            .optional()?)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_id_tx(tx: &Transaction, id: &str) -> RepositoryResult<Option<Student>> {
        find_by_id_in(tx, id)
    }

    /// 按身份证号解析学生: 优先有效记录, 否则取最近更新的软删除记录
    pub fn find_by_id_number_tx(
        tx: &Transaction,
        id_number: &str,
    ) -> RepositoryResult<Option<Student>> {
        let sql = format!(
            r#"SELECT {} FROM student
               WHERE id_number = ?1
               ORDER BY is_active DESC, updated_at DESC
               LIMIT 1"#,
            STUDENT_COLUMNS
        );
        Ok(tx.query_row(&sql, params![id_number], map_row).optional()?)
    }

    /// 指定学号前缀下的最大流水号
    pub fn max_code_sequence_tx(tx: &Transaction, prefix: &str) -> RepositoryResult<Option<u32>> {
        let max: Option<i64> = tx.query_row(
            r#"SELECT MAX(CAST(SUBSTR(student_code, ?2) AS INTEGER))
               FROM student
               WHERE student_code LIKE ?1 || '%'"#,
            params![prefix, prefix.len() as i64 + 1],
            |row| row.get(0),
        )?;
        Ok(max.map(|v| v.max(0) as u32))
    }

    pub fn insert_tx(tx: &Transaction, student: &Student) -> RepositoryResult<()> {
        let sql = format!(
            r#"INSERT INTO student ({}) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20
            )"#,
            STUDENT_COLUMNS
        );
        tx.execute(
            &sql,
            params![
                student.id,
                student.id_number,
                student.student_code,
                student.name,
                student.gender,
                student.birth_date.map(format_date),
                student.contact_phone,
                student.address,
                student.emergency_contact,
                student.emergency_phone,
                student.current_grade.map(|g| g.to_db_str()),
                student.enrollment_year,
                student.enrollment_semester.to_string(),
                student.graduation_status.to_db_str(),
                student.academic_status.to_db_str(),
                student.graduation_date.map(format_date),
                student.is_active,
                student.remarks,
                format_datetime(student.created_at),
                format_datetime(student.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 全量更新 (按主键)
    pub fn update_tx(tx: &Transaction, student: &Student) -> RepositoryResult<()> {
        let affected = tx.execute(
            r#"UPDATE student SET
                id_number = ?2, student_code = ?3, name = ?4, gender = ?5,
                birth_date = ?6, contact_phone = ?7, address = ?8,
                emergency_contact = ?9, emergency_phone = ?10,
                current_grade = ?11, enrollment_year = ?12, enrollment_semester = ?13,
                graduation_status = ?14, academic_status = ?15, graduation_date = ?16,
                is_active = ?17, remarks = ?18, updated_at = ?19
               WHERE id = ?1"#,
            params![
                student.id,
                student.id_number,
                student.student_code,
                student.name,
                student.gender,
                student.birth_date.map(format_date),
                student.contact_phone,
                student.address,
                student.emergency_contact,
                student.emergency_phone,
                student.current_grade.map(|g| g.to_db_str()),
                student.enrollment_year,
                student.enrollment_semester.to_string(),
                student.graduation_status.to_db_str(),
                student.academic_status.to_db_str(),
                student.graduation_date.map(format_date),
                student.is_active,
                student.remarks,
                format_datetime(student.updated_at),
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Student".to_string(),
                id: student.id.clone(),
            });
        }
        Ok(())
    }
}

fn find_by_id_in(conn: &Connection, id: &str) -> RepositoryResult<Option<Student>> {
    let sql = format!("SELECT {} FROM student WHERE id = ?1", STUDENT_COLUMNS);
    Ok(conn.query_row(&sql, params![id], map_row).optional()?)
}

/// 映射数据库行到Student对象
fn map_row(row: &Row) -> rusqlite::Result<Student> {
    let current_grade = row
        .get::<_, Option<String>>(10)?
        .filter(|s| !s.is_empty())
        .map(|s| parse_enum(10, &s, GradeStanding::from_db_str, "年级"))
        .transpose()?;
    let semester_raw: String = row.get(12)?;

    Ok(Student {
        id: row.get(0)?,
        id_number: row.get(1)?,
        student_code: row.get(2)?,
        name: row.get(3)?,
        gender: row.get(4)?,
        birth_date: parse_opt_date(5, row.get(5)?)?,
        contact_phone: row.get(6)?,
        address: row.get(7)?,
        emergency_contact: row.get(8)?,
        emergency_phone: row.get(9)?,
        current_grade,
        enrollment_year: row.get(11)?,
        enrollment_semester: parse_enum(12, &semester_raw, SemesterId::parse, "学期")?,
        graduation_status: parse_enum(
            13,
            &row.get::<_, String>(13)?,
            GraduationStatus::from_db_str,
            "毕业状态",
        )?,
        academic_status: parse_enum(
            14,
            &row.get::<_, String>(14)?,
            AcademicStatus::from_db_str,
            "学籍状态",
        )?,
        graduation_date: parse_opt_date(15, row.get(15)?)?,
        is_active: row.get(16)?,
        remarks: row.get(17)?,
        created_at: parse_datetime(18, &row.get::<_, String>(18)?)?,
        updated_at: parse_datetime(19, &row.get::<_, String>(19)?)?,
    })
}
