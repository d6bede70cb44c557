// ==========================================
// 报名协调器 - 提交事务体
// ==========================================
// 顺序: 课程解析 → 整单校验(学期/同科目/时间冲突) → 学生解析
//       → 逐门课程 (重复 → 资格 → 名额 → 写入)
// ==========================================

use super::student_resolution::{resolve_student, ResolvedStudent};
use super::SubmitContext;
use crate::domain::action_log::ActionType;
use crate::domain::course::Course;
use crate::domain::enrollment::{Enrollment, SkippedCourse, SubmitResult};
use crate::domain::types::{CourseStatus, EnrollmentStatus, SemesterId};
use crate::engine::audit::AuditEvent;
use crate::engine::code_generator::{CodeGenerator, ENROLLMENT_CODE_COLUMN};
use crate::engine::conflict::ConflictDetector;
use crate::engine::eligibility::EligibilityChecker;
use crate::engine::error::{EnrollmentError, EnrollmentResult};
use crate::repository::{CourseRepository, EnrollmentRepository};
use rusqlite::Transaction;
use serde_json::json;
use uuid::Uuid;

pub(super) fn submit_in_tx(
    tx: &Transaction,
    ctx: &SubmitContext,
) -> EnrollmentResult<(SubmitResult, Vec<AuditEvent>)> {
    let courses = load_requested_courses(tx, &ctx.request.course_ids)?;
    let target_semester = resolve_target_semester(ctx.request.semester, &courses)?;
    check_requested_combination(&courses)?;

    let ResolvedStudent {
        student,
        mut events,
    } = resolve_student(tx, ctx, &courses, &target_semester)?;

    // 本学业周期内是否已有通过的报名 (决定是否按年级严格匹配)
    let has_approved_course = EnrollmentRepository::list_approved_semesters_tx(tx, &student.id)?
        .iter()
        .any(|semester| *semester >= student.enrollment_semester);

    let mut enrollments = Vec::new();
    let mut skipped_courses = Vec::new();

    for course in &courses {
        if let Some(skip) = check_existing_enrollment(tx, &student.id, course)? {
            skipped_courses.push(skip);
            continue;
        }

        let verdict = EligibilityChecker::can_enroll(&student, course, has_approved_course);
        if !verdict.ok {
            skipped_courses.push(SkippedCourse {
                course_id: course.id.clone(),
                course_name: course.name.clone(),
                code: verdict.rule.code().to_string(),
                reason: verdict.reason,
            });
            continue;
        }

        if !CourseRepository::try_reserve_seat_tx(tx, &course.id)? {
            skipped_courses.push(skipped_by(
                course,
                EnrollmentError::CourseFull {
                    course_id: course.id.clone(),
                    course_name: course.name.clone(),
                },
            ));
            continue;
        }

        enrollments.push(insert_enrollment(tx, ctx, &student.id, course)?);
    }

    for skip in &skipped_courses {
        tracing::info!(
            course_id = %skip.course_id,
            code = %skip.code,
            "课程已跳过: {}",
            skip.reason
        );
    }

    let enrolled_course_names: Vec<String> = enrollments
        .iter()
        .filter_map(|e| courses.iter().find(|c| c.id == e.course_id))
        .map(|c| c.name.clone())
        .collect();
    let success = !enrollments.is_empty();

    let message = if success {
        format!("报名成功: {}", enrolled_course_names.join("、"))
    } else {
        let reasons: Vec<&str> = skipped_courses.iter().map(|s| s.reason.as_str()).collect();
        format!("未能报名任何课程, 学生信息已保存: {}", reasons.join("; "))
    };

    let payload = json!({
        "studentCode": student.student_code,
        "semester": target_semester.to_string(),
        "enrollmentCodes": enrollments.iter().map(|e| e.enrollment_code.as_str()).collect::<Vec<_>>(),
        "skipped": skipped_courses.iter().map(|s| json!({ "courseId": s.course_id, "code": s.code })).collect::<Vec<_>>(),
    });
    let action_type = if success {
        ActionType::EnrollmentSubmitted
    } else {
        ActionType::EnrollmentSoftFailed
    };
    events.push(AuditEvent::new(action_type, student.id.clone(), payload, message.clone()));

    Ok((
        SubmitResult {
            success,
            student,
            enrollments,
            enrolled_course_names,
            skipped_courses,
            message,
        },
        events,
    ))
}

/// 解析请求中的课程: 必须存在、有效且已发布
fn load_requested_courses(tx: &Transaction, course_ids: &[String]) -> EnrollmentResult<Vec<Course>> {
    let mut courses = Vec::with_capacity(course_ids.len());
    for course_id in course_ids {
        let course = CourseRepository::find_by_id_tx(tx, course_id)?
            .filter(|c| c.is_active)
            .ok_or_else(|| EnrollmentError::CourseNotFound {
                course_id: course_id.clone(),
            })?;

        if course.status != CourseStatus::Published {
            return Err(EnrollmentError::CourseNotPublished {
                course_id: course.id.clone(),
                course_name: course.name.clone(),
            });
        }
        courses.push(course);
    }
    Ok(courses)
}

/// 目标学期: 请求指定的学期, 否则取第一门课程的学期; 所有课程必须同属该学期
fn resolve_target_semester(
    requested: Option<SemesterId>,
    courses: &[Course],
) -> EnrollmentResult<SemesterId> {
    let target = match (requested, courses.first()) {
        (Some(semester), _) => semester,
        (None, Some(first)) => first.semester,
        (None, None) => {
            return Err(EnrollmentError::validation("selectedCourses", "请至少选择一门课程"))
        }
    };

    if let Some(other) = courses.iter().find(|c| c.semester != target) {
        return Err(EnrollmentError::validation(
            "selectedCourses",
            format!("课程 {} 不属于学期 {}", other.name, target),
        ));
    }
    Ok(target)
}

/// 同一次提交内的课程组合校验 (任何写入之前)
fn check_requested_combination(courses: &[Course]) -> EnrollmentResult<()> {
    for (i, first) in courses.iter().enumerate() {
        for second in &courses[i + 1..] {
            if first.name == second.name {
                return Err(EnrollmentError::SameSubjectDifferentSection {
                    course_id: second.id.clone(),
                    course_name: second.name.clone(),
                });
            }
            if ConflictDetector::has_time_slot_conflict(&first.time_slots, &second.time_slots) {
                return Err(EnrollmentError::TimeConflict {
                    first: first.name.clone(),
                    second: second.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// 已有 (学生, 课程) 报名时返回跳过原因
///
/// - PENDING/APPROVED: 已报名, 幂等跳过
/// - REJECTED: 不可复活被拒绝的报名
fn check_existing_enrollment(
    tx: &Transaction,
    student_id: &str,
    course: &Course,
) -> EnrollmentResult<Option<SkippedCourse>> {
    let latest = EnrollmentRepository::list_by_student_and_course_tx(tx, student_id, &course.id)?
        .into_iter()
        .next();

    let skip = match latest.map(|e| e.status) {
        Some(status) if status.is_active() => Some(EnrollmentError::DuplicateActiveEnrollment {
            course_id: course.id.clone(),
            course_name: course.name.clone(),
        }),
        Some(EnrollmentStatus::Rejected) => Some(EnrollmentError::RejectedCourseReenroll {
            course_id: course.id.clone(),
            course_name: course.name.clone(),
        }),
        _ => None,
    };
    Ok(skip.map(|err| skipped_by(course, err)))
}

fn skipped_by(course: &Course, err: EnrollmentError) -> SkippedCourse {
    SkippedCourse {
        course_id: course.id.clone(),
        course_name: course.name.clone(),
        code: err.code().to_string(),
        reason: err.to_string(),
    }
}

/// 写入 PENDING 报名, 报名编号冲突时重试
fn insert_enrollment(
    tx: &Transaction,
    ctx: &SubmitContext,
    student_id: &str,
    course: &Course,
) -> EnrollmentResult<Enrollment> {
    let mut enrollment = Enrollment {
        id: Uuid::new_v4().to_string(),
        enrollment_code: String::new(),
        student_id: student_id.to_string(),
        course_id: course.id.clone(),
        status: EnrollmentStatus::Pending,
        enrollment_date: ctx.today,
        insurance_start: ctx.request.study_period_start,
        insurance_end: ctx.request.study_period_end,
        remarks: ctx.request.remarks.clone(),
        created_by: ctx.actor.id().to_string(),
        created_at: ctx.now,
        updated_at: ctx.now,
    };

    CodeGenerator::issue_with_retry(
        &ctx.code_retry,
        "报名编号",
        ENROLLMENT_CODE_COLUMN,
        |attempt| CodeGenerator::next_enrollment_code(tx, ctx.today, attempt),
        |code| {
            enrollment.enrollment_code = code.to_string();
            EnrollmentRepository::insert_tx(tx, &enrollment)
        },
        None::<fn() -> String>,
    )?;

    Ok(enrollment)
}
