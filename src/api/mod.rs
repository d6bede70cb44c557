// ==========================================
// 学校报名管理系统 - API 层
// ==========================================
// 职责: 对外业务接口 (路由/鉴权由调用方负责)
// ==========================================

pub mod enrollment_api;
pub mod error;

// 重导出核心类型
pub use enrollment_api::{CourseAvailability, EnrollmentApi};
pub use error::{ApiError, ApiResult};
