// ==========================================
// 报名协调器 - 报名状态流转与退学
// ==========================================
// 红线: 报名只做状态流转, 不删除
// 红线: 离开 PENDING/APPROVED 必须在同一事务内释放名额
// ==========================================

use crate::domain::action_log::ActionType;
use crate::domain::enrollment::Enrollment;
use crate::domain::student::Student;
use crate::domain::types::EnrollmentStatus;
use crate::engine::audit::AuditEvent;
use crate::engine::error::{EnrollmentError, EnrollmentResult};
use crate::repository::error::RepositoryError;
use crate::repository::{CourseRepository, EnrollmentRepository, StudentRepository};
use chrono::NaiveDateTime;
use rusqlite::Transaction;
use serde_json::json;

pub(super) fn transition_in_tx(
    tx: &Transaction,
    enrollment_id: &str,
    target: EnrollmentStatus,
    now: NaiveDateTime,
) -> EnrollmentResult<(Enrollment, Vec<AuditEvent>)> {
    let mut enrollment = EnrollmentRepository::find_by_id_tx(tx, enrollment_id)?.ok_or_else(|| {
        EnrollmentError::EnrollmentNotFound {
            enrollment_id: enrollment_id.to_string(),
        }
    })?;

    let event = apply_transition(tx, &mut enrollment, target, now)?;
    Ok((enrollment, vec![event]))
}

pub(super) fn withdraw_in_tx(
    tx: &Transaction,
    student_id: &str,
    now: NaiveDateTime,
) -> EnrollmentResult<(Student, Vec<AuditEvent>)> {
    let mut student = StudentRepository::find_by_id_tx(tx, student_id)?.ok_or_else(|| {
        EnrollmentError::StudentNotFound {
            student_id: student_id.to_string(),
        }
    })?;

    if !student.is_active {
        return Ok((student, Vec::new()));
    }

    let mut events = Vec::new();
    let active = EnrollmentRepository::list_active_by_student_tx(tx, &student.id)?;
    let cancelled: Vec<String> = active.iter().map(|e| e.enrollment_code.clone()).collect();
    for mut enrollment in active {
        events.push(apply_transition(tx, &mut enrollment, EnrollmentStatus::Cancelled, now)?);
    }

    student.is_active = false;
    student.updated_at = now;
    student.append_note(&format!("[{}] 退学, 取消报名 {} 条", now.date(), cancelled.len()));
    StudentRepository::update_tx(tx, &student)?;

    events.push(AuditEvent::new(
        ActionType::StudentWithdrawn,
        student.id.clone(),
        json!({ "studentCode": student.student_code, "cancelledEnrollments": cancelled }),
        format!("学生 {} 退学", student.name),
    ));
    Ok((student, events))
}

/// 校验并执行单条报名的状态流转
fn apply_transition(
    tx: &Transaction,
    enrollment: &mut Enrollment,
    target: EnrollmentStatus,
    now: NaiveDateTime,
) -> EnrollmentResult<AuditEvent> {
    let from = enrollment.status;
    if !from.can_transition_to(target) {
        return Err(EnrollmentError::InvalidStatusTransition {
            from: from.to_string(),
            to: target.to_string(),
        });
    }

    EnrollmentRepository::update_status_tx(tx, &enrollment.id, from, target, now).map_err(|e| match e {
        RepositoryError::InvalidStateTransition { from, to } => {
            EnrollmentError::InvalidStatusTransition { from, to }
        }
        other => other.into(),
    })?;

    if from.is_active() && !target.is_active() {
        CourseRepository::release_seat_tx(tx, &enrollment.course_id)?;
    }

    enrollment.status = target;
    enrollment.updated_at = now;

    Ok(AuditEvent::new(
        ActionType::EnrollmentStatusChanged,
        enrollment.id.clone(),
        json!({
            "enrollmentCode": enrollment.enrollment_code,
            "courseId": enrollment.course_id,
            "from": from.to_string(),
            "to": target.to_string(),
        }),
        format!("报名 {} 状态 {} → {}", enrollment.enrollment_code, from, target),
    ))
}
