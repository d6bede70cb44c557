// ==========================================
// 学校报名管理系统 - 引擎层
// ==========================================
// 职责: 报名与学业进阶规则, 不拼 SQL (SQL 只在 repository)
// 红线: 所有跳过/拒绝必须输出 reason
// ==========================================

pub mod audit;
pub mod code_generator;
pub mod conflict;
pub mod coordinator;
pub mod eligibility;
pub mod error;
pub mod grade;
pub mod repositories;
pub mod validation;

// 重导出核心引擎
pub use audit::{ActionLogAuditSink, AuditEvent, AuditSink, NoOpAuditSink};
pub use code_generator::{CodeGenerator, CodeRetryPolicy};
pub use conflict::ConflictDetector;
pub use coordinator::EnrollmentCoordinator;
pub use eligibility::{EligibilityChecker, EligibilityRule, EligibilityVerdict};
pub use error::{EnrollmentError, EnrollmentResult};
pub use grade::GradeCalculator;
pub use repositories::EnrollmentRepositories;
pub use validation::{RequestValidator, ValidatedRequest};
