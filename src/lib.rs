// ==========================================
// 学校报名管理系统 - 核心库
// ==========================================
// 职责: 报名提交、学籍进阶、名额控制、报名审核
// 技术栈: Rust + SQLite
// 红线: 认证与匿名报名共用同一报名协调器
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 报名策略
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AcademicStatus, Actor, CourseStatus, EnrollmentStatus, Grade, GradeStanding,
    GraduationStatus, SemesterId, Term,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Course, Enrollment, SkippedCourse, Student, SubmitRequest,
    SubmitResult, TimeSlot,
};

// 引擎
pub use engine::{
    ConflictDetector, EligibilityChecker, EnrollmentCoordinator, EnrollmentError,
    EnrollmentRepositories, GradeCalculator,
};

// 配置
pub use config::{ConfigManager, EnrollmentPolicy, EnrollmentPolicyReader};

// API
pub use api::{ApiError, CourseAvailability, EnrollmentApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "学校报名管理系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
