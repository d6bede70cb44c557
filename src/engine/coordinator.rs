// ==========================================
// 学校报名管理系统 - 报名协调器
// ==========================================
// 职责: 在单个事务单元内完成
//       学生身份解析 → 学业周期更新 → 逐门课程校验 → 写入报名
// 红线: 认证/匿名提交共用同一入口, Actor 只用于留痕
// 红线: 名额通过条件更新原子占用, 有效报名数永不超过 max_students
// 红线: 除"无课程被接受"的软失败外, 任何错误都整体回滚
// ==========================================
// 输入: SubmitRequest + Actor
// 输出: SubmitResult (success=false 仍表示已提交学生档案)
// ==========================================

mod lifecycle;
mod student_resolution;
mod submit;

use crate::config::{EnrollmentPolicy, EnrollmentPolicyReader};
use crate::domain::enrollment::{Enrollment, SubmitRequest, SubmitResult};
use crate::domain::student::Student;
use crate::domain::types::{Actor, EnrollmentStatus};
use crate::engine::audit::{emit_all, AuditEvent, AuditSink};
use crate::engine::code_generator::CodeRetryPolicy;
use crate::engine::error::{EnrollmentError, EnrollmentResult};
use crate::engine::grade::GradeCalculator;
use crate::engine::repositories::EnrollmentRepositories;
use crate::engine::validation::{mask_id_number, RequestValidator, ValidatedRequest};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::Transaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// 数据库忙时整单重试的基础退避
const BUSY_RETRY_BASE_MS: u64 = 50;

// ==========================================
// SubmitContext - 单次提交的不可变上下文
// ==========================================
pub(crate) struct SubmitContext {
    pub request: ValidatedRequest,
    pub actor: Actor,
    pub today: NaiveDate,
    pub now: NaiveDateTime,
    pub policy: EnrollmentPolicy,
    pub calculator: GradeCalculator,
    pub code_retry: CodeRetryPolicy,
}

// ==========================================
// EnrollmentCoordinator - 报名协调器
// ==========================================
#[derive(Clone)]
pub struct EnrollmentCoordinator {
    repos: EnrollmentRepositories,
    policy_reader: Arc<dyn EnrollmentPolicyReader>,
    audit_sink: Arc<dyn AuditSink>,
}

impl EnrollmentCoordinator {
    /// 创建新的EnrollmentCoordinator实例
    pub fn new(
        repos: EnrollmentRepositories,
        policy_reader: Arc<dyn EnrollmentPolicyReader>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            repos,
            policy_reader,
            audit_sink,
        }
    }

    pub fn repositories(&self) -> &EnrollmentRepositories {
        &self.repos
    }

    // ==========================================
    // 报名提交
    // ==========================================

    /// 提交报名 (以当天日期为准)
    pub async fn submit(&self, request: SubmitRequest, actor: Actor) -> EnrollmentResult<SubmitResult> {
        self.submit_on(request, actor, Local::now().date_naive()).await
    }

    /// 提交报名 (指定业务日期)
    ///
    /// # 流程
    /// 1. 读取策略快照 + 请求校验 (无写入)
    /// 2. 事务内: 解析学生 → 校验课程 → 占用名额 → 写入报名
    /// 3. 提交后在阻塞线程池中发出审计事件
    ///
    /// # 返回
    /// - Ok(SubmitResult{success: true}): 至少一门课程被接受
    /// - Ok(SubmitResult{success: false}): 软失败, 学生档案已保存
    /// - Err: 校验/业务/持久化错误, 事务已回滚
    #[instrument(skip(self, request, actor, today), fields(actor = %actor, today = %today))]
    pub async fn submit_on(
        &self,
        request: SubmitRequest,
        actor: Actor,
        today: NaiveDate,
    ) -> EnrollmentResult<SubmitResult> {
        let policy = self.policy_reader.load_policy().await?;
        let validated = RequestValidator::new(policy.max_courses_per_submission).validate(&request)?;

        tracing::info!(
            actor = %actor,
            id_number = %mask_id_number(&validated.id_number),
            courses = ?validated.course_ids,
            "报名提交开始"
        );

        let ctx = SubmitContext {
            request: validated,
            actor: actor.clone(),
            today,
            now: Local::now().naive_local(),
            calculator: GradeCalculator::from_policy(&policy),
            code_retry: CodeRetryPolicy::from_policy(&policy),
            policy,
        };

        let max_attempts = ctx.policy.tx_busy_retry_max_attempts;
        let outcome = self
            .run_unit(max_attempts, "submit", &actor, move |tx| submit::submit_in_tx(tx, &ctx))
            .await;

        match outcome {
            Ok(result) => {
                tracing::info!(
                    actor = %actor,
                    success = result.success,
                    student_code = %result.student.student_code,
                    enrolled = ?result.enrolled_course_names,
                    skipped = result.skipped_courses.len(),
                    "报名提交完成"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::info!(actor = %actor, code = e.code(), "报名提交被拒绝: {}", e);
                Err(e)
            }
        }
    }

    // ==========================================
    // 报名状态流转 / 退学
    // ==========================================

    /// 报名状态流转
    ///
    /// # 规则
    /// - PENDING → APPROVED | REJECTED | CANCELLED
    /// - APPROVED → CANCELLED
    /// - 离开 PENDING/APPROVED 时释放名额
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn transition_enrollment(
        &self,
        enrollment_id: &str,
        target: EnrollmentStatus,
        actor: Actor,
    ) -> EnrollmentResult<Enrollment> {
        let policy = self.policy_reader.load_policy().await?;
        let enrollment_id = enrollment_id.to_string();
        let now = Local::now().naive_local();

        let enrollment = self
            .run_unit(policy.tx_busy_retry_max_attempts, "transition", &actor, move |tx| {
                lifecycle::transition_in_tx(tx, &enrollment_id, target, now)
            })
            .await?;

        tracing::info!(
            enrollment_code = %enrollment.enrollment_code,
            status = %enrollment.status,
            "报名状态已更新"
        );
        Ok(enrollment)
    }

    /// 退学 (软删除)
    ///
    /// 有效报名全部取消并释放名额; 已退学的学生原样返回
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn withdraw_student(&self, student_id: &str, actor: Actor) -> EnrollmentResult<Student> {
        let policy = self.policy_reader.load_policy().await?;
        let student_id = student_id.to_string();
        let now = Local::now().naive_local();

        let student = self
            .run_unit(policy.tx_busy_retry_max_attempts, "withdraw", &actor, move |tx| {
                lifecycle::withdraw_in_tx(tx, &student_id, now)
            })
            .await?;

        tracing::info!(student_code = %student.student_code, "学生已退学");
        Ok(student)
    }

    // ==========================================
    // 事务执行
    // ==========================================

    /// 在阻塞线程池中执行事务单元, 数据库忙时整单重试
    ///
    /// 提交成功后在同一阻塞线程内发出审计事件, 审计写入不占用异步运行时线程
    async fn run_unit<T, F>(
        &self,
        max_attempts: u32,
        operation: &'static str,
        actor: &Actor,
        work: F,
    ) -> EnrollmentResult<T>
    where
        T: Send + 'static,
        F: Fn(&Transaction<'_>) -> EnrollmentResult<(T, Vec<AuditEvent>)> + Send + 'static,
    {
        let unit_of_work = self.repos.unit_of_work.clone();
        let audit_sink = self.audit_sink.clone();
        let actor = actor.clone();
        let max_attempts = max_attempts.max(1);
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            let mut attempt = 1;
            loop {
                match unit_of_work.run(|tx| work(tx)) {
                    Ok((value, events)) => {
                        emit_all(audit_sink.as_ref(), &actor, &events);
                        return Ok(value);
                    }
                    Err(e) if e.is_retryable() && attempt < max_attempts => {
                        tracing::warn!(
                            operation = operation,
                            attempt = attempt,
                            "数据库忙, 整单重试: {}",
                            e
                        );
                        std::thread::sleep(Duration::from_millis(BUSY_RETRY_BASE_MS * attempt as u64));
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        })
        .await
        .map_err(|e| EnrollmentError::Internal(format!("事务任务异常终止: {}", e)))?
    }
}
