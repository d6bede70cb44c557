// ==========================================
// 学校报名管理系统 - 引擎层错误类型
// ==========================================
// 分类: 参数校验 / 业务规则 / 持久化
// 红线: 每个业务错误都有独立的机器可读编码
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 报名引擎错误
#[derive(Error, Debug)]
pub enum EnrollmentError {
    // ===== 参数校验 =====
    #[error("参数校验失败 ({field}): {message}")]
    Validation { field: String, message: String },

    // ===== 业务规则 =====
    #[error("课程不存在: {course_id}")]
    CourseNotFound { course_id: String },

    #[error("课程未开放报名: {course_name}")]
    CourseNotPublished { course_id: String, course_name: String },

    #[error("课程已满员: {course_name}")]
    CourseFull { course_id: String, course_name: String },

    #[error("上课时间冲突: {first} 与 {second}")]
    TimeConflict { first: String, second: String },

    #[error("已报名该课程: {course_name}")]
    DuplicateActiveEnrollment { course_id: String, course_name: String },

    #[error("不能重新报名已被拒绝的课程: {course_name}, 请选择其他课程")]
    RejectedCourseReenroll { course_id: String, course_name: String },

    #[error("超过学期 {semester} 同时报名上限 {limit} 门 (提交后将有 {requested} 门)")]
    ConcurrentCourseCapExceeded {
        semester: String,
        limit: u32,
        requested: u32,
    },

    #[error("已报名同一科目的其他年级班: {course_name}")]
    SameSubjectDifferentSection { course_id: String, course_name: String },

    #[error("学生不存在: {student_id}")]
    StudentNotFound { student_id: String },

    #[error("报名记录不存在: {enrollment_id}")]
    EnrollmentNotFound { enrollment_id: String },

    #[error("报名状态不允许流转: {from} → {to}")]
    InvalidStatusTransition { from: String, to: String },

    // ===== 编号生成 =====
    #[error("{kind} 编号生成失败, 已重试 {attempts} 次")]
    CodeGenerationExhausted { kind: String, attempts: u32 },

    // ===== 持久化 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl EnrollmentError {
    /// 机器可读错误编码
    pub fn code(&self) -> &'static str {
        match self {
            EnrollmentError::Validation { .. } => "VALIDATION_ERROR",
            EnrollmentError::CourseNotFound { .. } => "COURSE_NOT_FOUND",
            EnrollmentError::CourseNotPublished { .. } => "COURSE_NOT_PUBLISHED",
            EnrollmentError::CourseFull { .. } => "COURSE_FULL",
            EnrollmentError::TimeConflict { .. } => "TIME_CONFLICT",
            EnrollmentError::DuplicateActiveEnrollment { .. } => "DUPLICATE_ACTIVE_ENROLLMENT",
            EnrollmentError::RejectedCourseReenroll { .. } => "REJECTED_COURSE_REENROLL",
            EnrollmentError::ConcurrentCourseCapExceeded { .. } => "CONCURRENT_COURSE_CAP_EXCEEDED",
            EnrollmentError::SameSubjectDifferentSection { .. } => "SAME_SUBJECT_DIFFERENT_SECTION",
            EnrollmentError::StudentNotFound { .. } => "STUDENT_NOT_FOUND",
            EnrollmentError::EnrollmentNotFound { .. } => "ENROLLMENT_NOT_FOUND",
            EnrollmentError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            EnrollmentError::CodeGenerationExhausted { .. } => "CODE_GENERATION_EXHAUSTED",
            EnrollmentError::Repository(_) => "REPOSITORY_ERROR",
            EnrollmentError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        EnrollmentError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// 数据库忙, 可整单重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnrollmentError::Repository(e) if e.is_busy())
    }
}

pub type EnrollmentResult<T> = Result<T, EnrollmentError>;
