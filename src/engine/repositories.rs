// ==========================================
// 学校报名管理系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合报名引擎所需的事务单元与仓储
// 目标: 由调用方注入, 引擎不持有全局连接
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    ActionLogRepository, CourseRepository, EnrollmentRepository, StudentRepository, UnitOfWork,
};

/// 报名引擎仓储集合
///
/// # 包含的仓储
/// - `unit_of_work`: 提交/状态流转的事务入口
/// - `student_repo` / `course_repo` / `enrollment_repo`: 事务外查询
/// - `action_log_repo`: 审计日志
#[derive(Clone)]
pub struct EnrollmentRepositories {
    pub unit_of_work: UnitOfWork,
    pub student_repo: Arc<StudentRepository>,
    pub course_repo: Arc<CourseRepository>,
    pub enrollment_repo: Arc<EnrollmentRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl EnrollmentRepositories {
    /// 基于同一连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            unit_of_work: UnitOfWork::new(conn.clone()),
            student_repo: Arc::new(StudentRepository::new(conn.clone())),
            course_repo: Arc::new(CourseRepository::new(conn.clone())),
            enrollment_repo: Arc::new(EnrollmentRepository::new(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn)),
        }
    }
}
