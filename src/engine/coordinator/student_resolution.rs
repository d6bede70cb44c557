// ==========================================
// 报名协调器 - 学生身份解析
// ==========================================
// 按身份证号查找学生, 互斥的四种状态:
// 1. 无记录           → 校验上限后新建 (一年级, 在读, 新学号)
// 2. 有效且在读       → 校验上限/拒绝/同科目, 再按学期推进年级或毕业
// 3. 有效但已毕业/归档 → 重新入学 (重置为一年级, 新学号)
// 4. 已软删除         → 重新激活 + 刷新档案 + 同 3 的重置
// ==========================================

use super::SubmitContext;
use crate::domain::action_log::ActionType;
use crate::domain::course::Course;
use crate::domain::student::Student;
use crate::domain::types::{
    AcademicStatus, EnrollmentStatus, GradeStanding, GraduationStatus, SemesterId,
};
use crate::engine::audit::AuditEvent;
use crate::engine::code_generator::{CodeGenerator, STUDENT_CODE_COLUMN};
use crate::engine::error::{EnrollmentError, EnrollmentResult};
use crate::engine::grade::GradeCalculator;
use crate::repository::error::RepositoryResult;
use crate::repository::{EnrollmentRepository, StudentRepository};
use chrono::Utc;
use rusqlite::Transaction;
use serde_json::json;
use uuid::Uuid;

const ID_NUMBER_COLUMN: &str = "student.id_number";

pub(super) struct ResolvedStudent {
    pub student: Student,
    pub events: Vec<AuditEvent>,
}

pub(super) fn resolve_student(
    tx: &Transaction,
    ctx: &SubmitContext,
    courses: &[Course],
    target_semester: &SemesterId,
) -> EnrollmentResult<ResolvedStudent> {
    let mut events = Vec::new();

    let existing = StudentRepository::find_by_id_number_tx(tx, &ctx.request.id_number)?;
    let student = match existing {
        None => {
            check_concurrent_cap(ctx, &[], courses, target_semester)?;
            create_student(tx, ctx, target_semester, &mut events)?
        }
        Some(student) => {
            validate_against_existing(tx, ctx, &student, courses, target_semester)?;

            if !student.is_active {
                reactivate_student(tx, ctx, student, target_semester, &mut events)?
            } else if student.graduation_status.is_finished() {
                reenter_student(tx, ctx, student, target_semester, &mut events)?
            } else {
                progress_student(tx, ctx, student, &mut events)?
            }
        }
    };

    Ok(ResolvedStudent { student, events })
}

// ==========================================
// 状态 1: 新建
// ==========================================

fn create_student(
    tx: &Transaction,
    ctx: &SubmitContext,
    target_semester: &SemesterId,
    events: &mut Vec<AuditEvent>,
) -> EnrollmentResult<Student> {
    let mut student = Student {
        id: Uuid::new_v4().to_string(),
        id_number: ctx.request.id_number.clone(),
        student_code: String::new(),
        name: ctx.request.profile.name.clone(),
        gender: None,
        birth_date: None,
        contact_phone: None,
        address: None,
        emergency_contact: None,
        emergency_phone: None,
        current_grade: Some(GradeStanding::FIRST),
        enrollment_year: target_semester.start_year,
        enrollment_semester: *target_semester,
        graduation_status: GraduationStatus::InProgress,
        academic_status: AcademicStatus::Active,
        graduation_date: None,
        is_active: true,
        remarks: None,
        created_at: ctx.now,
        updated_at: ctx.now,
    };
    ctx.request.profile.apply_to(&mut student);

    issue_student_code(tx, ctx, &mut student, target_semester, StudentRepository::insert_tx)
        .map_err(map_id_number_conflict)?;

    events.push(AuditEvent::new(
        ActionType::StudentCreated,
        student.id.clone(),
        json!({ "studentCode": student.student_code, "semester": target_semester.to_string() }),
        format!("新建学生 {}", student.name),
    ));
    Ok(student)
}

// ==========================================
// 状态 2-4 共用校验
// ==========================================

/// 已有学生的整单校验
///
/// - 被拒绝过的同一课程不可再报
/// - 同学期内不可同时报同名科目的不同年级班
/// - 同时报名上限 (见 check_concurrent_cap)
fn validate_against_existing(
    tx: &Transaction,
    ctx: &SubmitContext,
    student: &Student,
    courses: &[Course],
    target_semester: &SemesterId,
) -> EnrollmentResult<()> {
    for course in courses {
        let latest = EnrollmentRepository::list_by_student_and_course_tx(tx, &student.id, &course.id)?
            .into_iter()
            .next();
        if latest.map(|e| e.status) == Some(EnrollmentStatus::Rejected) {
            return Err(EnrollmentError::RejectedCourseReenroll {
                course_id: course.id.clone(),
                course_name: course.name.clone(),
            });
        }
    }

    let active = EnrollmentRepository::list_active_courses_of_student_tx(tx, &student.id)?;

    for course in courses {
        let same_subject = active.iter().any(|(id, name, semester)| {
            id != &course.id && name == &course.name && semester == &course.semester
        });
        if same_subject {
            return Err(EnrollmentError::SameSubjectDifferentSection {
                course_id: course.id.clone(),
                course_name: course.name.clone(),
            });
        }
    }

    check_concurrent_cap(ctx, &active, courses, target_semester)
}

/// 同时报名上限: 目标学期有效报名数 + 新增课程数 <= K
///
/// 新学生的 active 为空, 即请求课程数不得超过 K
fn check_concurrent_cap(
    ctx: &SubmitContext,
    active: &[(String, String, SemesterId)],
    courses: &[Course],
    target_semester: &SemesterId,
) -> EnrollmentResult<()> {
    let active_in_semester = active
        .iter()
        .filter(|(_, _, semester)| semester == target_semester)
        .count() as u32;
    let new_courses = courses
        .iter()
        .filter(|c| !active.iter().any(|(id, _, _)| id == &c.id))
        .count() as u32;
    let limit = ctx.policy.max_active_courses_for(target_semester);

    if new_courses > 0 && active_in_semester + new_courses > limit {
        return Err(EnrollmentError::ConcurrentCourseCapExceeded {
            semester: target_semester.to_string(),
            limit,
            requested: active_in_semester + new_courses,
        });
    }
    Ok(())
}

// ==========================================
// 状态 2: 在读学生年级推进
// ==========================================

fn progress_student(
    tx: &Transaction,
    ctx: &SubmitContext,
    mut student: Student,
    events: &mut Vec<AuditEvent>,
) -> EnrollmentResult<Student> {
    let now_semester = GradeCalculator::current_semester(ctx.today);
    let calculator = &ctx.calculator;
    let previous = student.current_grade;

    if calculator.should_graduate(&student.enrollment_semester, &now_semester) {
        student.current_grade = Some(GradeStanding::Graduated);
        student.graduation_status = GraduationStatus::Graduated;
        student.academic_status = AcademicStatus::Graduated;
        student.graduation_date = Some(ctx.today);
        student.updated_at = ctx.now;
        StudentRepository::update_tx(tx, &student)?;

        events.push(AuditEvent::new(
            ActionType::StudentGraduated,
            student.id.clone(),
            json!({ "from": previous.map(|g| g.to_string()), "graduationDate": ctx.today }),
            format!("学生 {} 已毕业", student.student_code),
        ));
        return Ok(student);
    }

    let computed = calculator.calculate_current_grade(&student.enrollment_semester, &now_semester);
    // 年级只前进不后退
    let advanced = match previous {
        Some(current) if current >= computed => None,
        _ => Some(computed),
    };

    if let Some(grade) = advanced {
        student.current_grade = Some(grade);
        student.updated_at = ctx.now;
        StudentRepository::update_tx(tx, &student)?;

        events.push(AuditEvent::new(
            ActionType::StudentProgressed,
            student.id.clone(),
            json!({ "from": previous.map(|g| g.to_string()), "to": grade.to_string() }),
            format!("学生 {} 年级更新为 {}", student.student_code, grade),
        ));
    }
    Ok(student)
}

// ==========================================
// 状态 3 / 4: 重新入学
// ==========================================

fn reenter_student(
    tx: &Transaction,
    ctx: &SubmitContext,
    mut student: Student,
    target_semester: &SemesterId,
    events: &mut Vec<AuditEvent>,
) -> EnrollmentResult<Student> {
    let previous_status = student.graduation_status;
    let previous_code = student.student_code.clone();

    reset_for_new_cycle(ctx, &mut student, &format!("重新入学 (原状态 {}, 原学号 {})", previous_status, previous_code));
    issue_student_code(tx, ctx, &mut student, target_semester, StudentRepository::update_tx)?;

    events.push(AuditEvent::new(
        ActionType::StudentReentered,
        student.id.clone(),
        json!({
            "previousStatus": previous_status.to_string(),
            "previousStudentCode": previous_code,
            "studentCode": student.student_code,
        }),
        format!("学生 {} 重新入学", student.name),
    ));
    Ok(student)
}

fn reactivate_student(
    tx: &Transaction,
    ctx: &SubmitContext,
    mut student: Student,
    target_semester: &SemesterId,
    events: &mut Vec<AuditEvent>,
) -> EnrollmentResult<Student> {
    let previous_code = student.student_code.clone();

    student.is_active = true;
    ctx.request.profile.apply_to(&mut student);
    reset_for_new_cycle(ctx, &mut student, &format!("重新激活 (原学号 {})", previous_code));
    issue_student_code(tx, ctx, &mut student, target_semester, StudentRepository::update_tx)
        .map_err(map_id_number_conflict)?;

    events.push(AuditEvent::new(
        ActionType::StudentReactivated,
        student.id.clone(),
        json!({ "previousStudentCode": previous_code, "studentCode": student.student_code }),
        format!("学生 {} 重新激活", student.name),
    ));
    Ok(student)
}

/// 新学业周期的重置: 一年级、在读、入学学期为当前学期
fn reset_for_new_cycle(ctx: &SubmitContext, student: &mut Student, note: &str) {
    let now_semester = GradeCalculator::current_semester(ctx.today);

    student.current_grade = Some(GradeStanding::FIRST);
    student.enrollment_year = now_semester.start_year;
    student.enrollment_semester = now_semester;
    student.graduation_status = GraduationStatus::InProgress;
    student.academic_status = AcademicStatus::Active;
    student.graduation_date = None;
    student.updated_at = ctx.now;
    student.append_note(&format!("[{}] {}", ctx.today, note));
}

// ==========================================
// 学号发放
// ==========================================

/// 为学生发放新学号并通过 persist 写入 (insert 或 update)
fn issue_student_code(
    tx: &Transaction,
    ctx: &SubmitContext,
    student: &mut Student,
    target_semester: &SemesterId,
    persist: fn(&Transaction, &Student) -> RepositoryResult<()>,
) -> EnrollmentResult<()> {
    let code = CodeGenerator::issue_with_retry(
        &ctx.code_retry,
        "学号",
        STUDENT_CODE_COLUMN,
        |attempt| CodeGenerator::next_student_code(tx, target_semester, attempt),
        |code| {
            student.student_code = code.to_string();
            persist(tx, student)
        },
        Some(|| CodeGenerator::fallback_student_code(target_semester, Utc::now().timestamp_millis())),
    )?;
    student.student_code = code;
    Ok(())
}

/// 身份证号唯一索引冲突 → 字段校验错误
fn map_id_number_conflict(err: EnrollmentError) -> EnrollmentError {
    match err {
        EnrollmentError::Repository(ref e) if e.is_unique_violation_on(ID_NUMBER_COLUMN) => {
            EnrollmentError::validation("idNumber", "该身份证号已存在有效学生记录")
        }
        other => other,
    }
}
