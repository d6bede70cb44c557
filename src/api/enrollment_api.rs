// ==========================================
// 学校报名管理系统 - 报名 API
// ==========================================
// 职责: 认证/匿名报名入口、报名审核、退学、查询
// 红线: 两条报名入口必须委托同一个 EnrollmentCoordinator
// ==========================================

use std::sync::Arc;

use serde::Serialize;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::course::Course;
use crate::domain::enrollment::{Enrollment, SubmitRequest, SubmitResult};
use crate::domain::student::Student;
use crate::domain::types::{Actor, EnrollmentStatus};
use crate::engine::validation::normalize_id_number;
use crate::engine::EnrollmentCoordinator;

// ==========================================
// CourseAvailability - 课程余量视图
// ==========================================

/// 课程名额余量
///
/// enrolled_count 为原子计数器, active_enrollments 为按报名记录实时统计,
/// 两者一致时计数器未漂移
#[derive(Debug, Clone, Serialize)]
pub struct CourseAvailability {
    pub course: Course,
    pub active_enrollments: i64,
    pub remaining_seats: i32,
}

impl CourseAvailability {
    pub fn is_consistent(&self) -> bool {
        i64::from(self.course.enrolled_count) == self.active_enrollments
    }
}

// ==========================================
// EnrollmentApi - 报名 API
// ==========================================

/// 报名API
///
/// 职责：
/// 1. 报名提交 (认证用户 / 匿名)
/// 2. 报名审核 (通过 / 拒绝 / 取消)
/// 3. 学生退学
/// 4. 学生、报名、操作日志查询
pub struct EnrollmentApi {
    coordinator: Arc<EnrollmentCoordinator>,
}

impl EnrollmentApi {
    /// 创建新的EnrollmentApi实例
    pub fn new(coordinator: Arc<EnrollmentCoordinator>) -> Self {
        Self { coordinator }
    }

    // ==========================================
    // 报名提交
    // ==========================================

    /// 认证用户提交报名
    ///
    /// # 参数
    /// - user_id: 认证用户ID, 写入 created_by 与审计日志
    /// - request: 报名请求
    pub async fn submit_authenticated(
        &self,
        user_id: &str,
        request: SubmitRequest,
    ) -> ApiResult<SubmitResult> {
        let actor = authenticated(user_id)?;
        Ok(self.coordinator.submit(request, actor).await?)
    }

    /// 匿名提交报名
    pub async fn submit_anonymous(&self, request: SubmitRequest) -> ApiResult<SubmitResult> {
        Ok(self.coordinator.submit(request, Actor::Anonymous).await?)
    }

    // ==========================================
    // 报名审核
    // ==========================================

    /// 通过报名
    pub async fn approve(&self, enrollment_id: &str, user_id: &str) -> ApiResult<Enrollment> {
        self.transition(enrollment_id, EnrollmentStatus::Approved, user_id).await
    }

    /// 拒绝报名 (释放名额; 该学生不可再报同一课程)
    pub async fn reject(&self, enrollment_id: &str, user_id: &str) -> ApiResult<Enrollment> {
        self.transition(enrollment_id, EnrollmentStatus::Rejected, user_id).await
    }

    /// 取消报名 (释放名额)
    pub async fn cancel(&self, enrollment_id: &str, user_id: &str) -> ApiResult<Enrollment> {
        self.transition(enrollment_id, EnrollmentStatus::Cancelled, user_id).await
    }

    async fn transition(
        &self,
        enrollment_id: &str,
        target: EnrollmentStatus,
        user_id: &str,
    ) -> ApiResult<Enrollment> {
        if enrollment_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("报名ID不能为空".to_string()));
        }
        let actor = authenticated(user_id)?;
        Ok(self
            .coordinator
            .transition_enrollment(enrollment_id.trim(), target, actor)
            .await?)
    }

    /// 学生退学 (软删除)
    pub async fn withdraw(&self, student_id: &str, user_id: &str) -> ApiResult<Student> {
        if student_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("学生ID不能为空".to_string()));
        }
        let actor = authenticated(user_id)?;
        Ok(self.coordinator.withdraw_student(student_id.trim(), actor).await?)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按身份证号查询有效学生
    pub fn get_student_by_id_number(&self, id_number: &str) -> ApiResult<Option<Student>> {
        let id_number = normalize_id_number(id_number)?;
        Ok(self
            .coordinator
            .repositories()
            .student_repo
            .find_active_by_id_number(&id_number)?)
    }

    /// 查询学生的全部报名记录
    pub fn list_student_enrollments(&self, student_id: &str) -> ApiResult<Vec<Enrollment>> {
        Ok(self
            .coordinator
            .repositories()
            .enrollment_repo
            .list_by_student(student_id)?)
    }

    /// 查询课程详情
    pub fn get_course(&self, course_id: &str) -> ApiResult<Course> {
        self.coordinator
            .repositories()
            .course_repo
            .find_by_id(course_id)?
            .ok_or_else(|| ApiError::NotFound(format!("课程(id={})不存在", course_id)))
    }

    /// 查询课程名额余量
    pub fn get_course_availability(&self, course_id: &str) -> ApiResult<CourseAvailability> {
        let course = self.get_course(course_id)?;
        let active_enrollments = self
            .coordinator
            .repositories()
            .enrollment_repo
            .count_active_by_course(&course.id)?;

        if i64::from(course.enrolled_count) != active_enrollments {
            tracing::warn!(
                course_id = %course.id,
                enrolled_count = course.enrolled_count,
                active_enrollments = active_enrollments,
                "课程名额计数与有效报名数不一致"
            );
        }

        Ok(CourseAvailability {
            remaining_seats: course.remaining_seats(),
            active_enrollments,
            course,
        })
    }

    /// 查询操作人的审计日志
    pub fn list_actions_by_actor(&self, actor_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self
            .coordinator
            .repositories()
            .action_log_repo
            .list_by_actor(actor_id)?)
    }
}

fn authenticated(user_id: &str) -> ApiResult<Actor> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::InvalidInput("操作人ID不能为空".to_string()));
    }
    if user_id == Actor::ANONYMOUS_ID {
        return Err(ApiError::InvalidInput("认证入口不接受匿名操作人".to_string()));
    }
    Ok(Actor::Authenticated(user_id.to_string()))
}
