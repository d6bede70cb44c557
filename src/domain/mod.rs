// ==========================================
// 学校报名管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod course;
pub mod enrollment;
pub mod student;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use course::{Course, TimeSlot};
pub use enrollment::{Enrollment, SkippedCourse, SubmitRequest, SubmitResult};
pub use student::{Student, StudentProfile};
pub use types::{
    AcademicStatus, Actor, CourseStatus, EnrollmentStatus, Grade, GradeStanding,
    GraduationStatus, SemesterId, Term,
};
