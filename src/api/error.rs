// ==========================================
// 学校报名管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 把引擎/仓储错误转换为用户可读的错误
// 红线: 业务错误保留机器可读编码
// ==========================================

use crate::engine::error::EnrollmentError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("数据验证失败 ({field}): {message}")]
    ValidationError { field: String, message: String },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反 [{code}]: {reason}")]
    BusinessRuleViolation { code: String, reason: String },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库繁忙, 请稍后重试: {0}")]
    DatabaseBusy(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 机器可读错误编码
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation { code, .. } => code.as_str(),
            ApiError::InvalidStateTransition { .. } => "INVALID_STATUS_TRANSITION",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseBusy(_) => "DATABASE_BUSY",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseBusy(msg) => ApiError::DatabaseBusy(msg),
            RepositoryError::DatabaseTransactionError(msg) | RepositoryError::DatabaseQueryError(msg) => {
                ApiError::DatabaseError(msg)
            }
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::BusinessRuleViolation {
                code: "UNIQUE_CONSTRAINT".to_string(),
                reason: format!("唯一约束违反: {}", msg),
            },
            RepositoryError::ForeignKeyViolation(msg) => ApiError::BusinessRuleViolation {
                code: "FOREIGN_KEY".to_string(),
                reason: format!("外键约束违反: {}", msg),
            },
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
        }
    }
}

// ==========================================
// 从 EnrollmentError 转换
// ==========================================
impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::Validation { field, message } => {
                ApiError::ValidationError { field, message }
            }
            e @ (EnrollmentError::StudentNotFound { .. }
            | EnrollmentError::EnrollmentNotFound { .. }
            | EnrollmentError::CourseNotFound { .. }) => ApiError::NotFound(e.to_string()),
            EnrollmentError::InvalidStatusTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            EnrollmentError::Repository(e) => e.into(),
            EnrollmentError::Internal(msg) => ApiError::InternalError(msg),
            other => ApiError::BusinessRuleViolation {
                code: other.code().to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
