// ==========================================
// 学校报名管理系统 - 报名资格判定
// ==========================================
// 职责: 判定学生能否报名某门课程
// 红线: 无状态、无 I/O, 所有判定必须输出 reason
// ==========================================

use crate::domain::course::Course;
use crate::domain::student::Student;
use crate::domain::types::GradeStanding;
use serde::{Deserialize, Serialize};

// ==========================================
// EligibilityRule - 命中的判定规则
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EligibilityRule {
    GradeAgnostic,  // 课程不限年级
    CycleFinished,  // 学生已毕业/归档, 需先重新入学
    FirstPlacement, // 尚无已通过报名, 首次定级
    GradeMatched,   // 年级一致
    GradeMismatch,  // 年级不一致
}

impl EligibilityRule {
    /// 跳过课程时使用的原因码
    pub fn code(self) -> &'static str {
        match self {
            EligibilityRule::GradeAgnostic => "GRADE_AGNOSTIC",
            EligibilityRule::CycleFinished => "STUDENT_GRADUATED",
            EligibilityRule::FirstPlacement => "FIRST_PLACEMENT",
            EligibilityRule::GradeMatched => "GRADE_MATCHED",
            EligibilityRule::GradeMismatch => "GRADE_MISMATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub ok: bool,
    pub rule: EligibilityRule,
    pub reason: String,
}

impl EligibilityVerdict {
    fn allow(rule: EligibilityRule, reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            rule,
            reason: reason.into(),
        }
    }

    fn deny(rule: EligibilityRule, reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            rule,
            reason: reason.into(),
        }
    }
}

// ==========================================
// EligibilityChecker - 资格判定器
// ==========================================
pub struct EligibilityChecker;

impl EligibilityChecker {
    /// 判定报名资格
    ///
    /// # 规则 (按顺序)
    /// 1. 课程不限年级 → 通过
    /// 2. 学生已毕业/归档 → 拒绝
    /// 3. 本学业周期尚无已通过报名 → 首次定级, 通过
    /// 4. 学生年级 == 课程年级 → 通过, 否则拒绝
    ///
    /// # 参数
    /// - has_approved_course: 本学业周期内是否已有 APPROVED 报名
    pub fn can_enroll(student: &Student, course: &Course, has_approved_course: bool) -> EligibilityVerdict {
        let course_level = match course.level {
            Some(level) if course.requires_grades => level,
            _ => {
                return EligibilityVerdict::allow(
                    EligibilityRule::GradeAgnostic,
                    format!("课程 {} 不限年级", course.name),
                )
            }
        };

        if student.graduation_status.is_finished()
            || student.current_grade == Some(GradeStanding::Graduated)
        {
            return EligibilityVerdict::deny(
                EligibilityRule::CycleFinished,
                format!("学生 {} 已结束学业周期, 需重新入学后报名", student.name),
            );
        }

        if !has_approved_course {
            return EligibilityVerdict::allow(
                EligibilityRule::FirstPlacement,
                format!("首次定级, 可报名 {} 课程", course_level),
            );
        }

        match student.current_grade.and_then(GradeStanding::grade) {
            Some(grade) if grade == course_level => EligibilityVerdict::allow(
                EligibilityRule::GradeMatched,
                format!("年级一致: {}", grade),
            ),
            other => EligibilityVerdict::deny(
                EligibilityRule::GradeMismatch,
                format!(
                    "年级不符: 课程 {} 要求 {}, 学生当前为 {}",
                    course.name,
                    course_level,
                    other.map(|g| g.to_string()).unwrap_or_else(|| "未定级".to_string())
                ),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{
        AcademicStatus, CourseStatus, Grade, GraduationStatus, SemesterId, Term,
    };
    use chrono::NaiveDate;

    fn make_student(grade: Grade, status: GraduationStatus) -> Student {
        let ts = NaiveDate::from_ymd_opt(2025, 9, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Student {
            id: "s1".to_string(),
            id_number: "11010119900101123X".to_string(),
            student_code: "20250001".to_string(),
            name: "张三".to_string(),
            gender: None,
            birth_date: None,
            contact_phone: None,
            address: None,
            emergency_contact: None,
            emergency_phone: None,
            current_grade: Some(GradeStanding::InGrade(grade)),
            enrollment_year: 2025,
            enrollment_semester: SemesterId::new(2025, Term::First),
            graduation_status: status,
            academic_status: AcademicStatus::Active,
            graduation_date: None,
            is_active: true,
            remarks: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn make_course(level: Option<Grade>, requires_grades: bool) -> Course {
        Course {
            id: "c1".to_string(),
            name: "钢琴".to_string(),
            level,
            requires_grades,
            semester: SemesterId::new(2025, Term::First),
            max_students: 30,
            enrolled_count: 0,
            time_slots: vec![],
            status: CourseStatus::Published,
            is_active: true,
        }
    }

    #[test]
    fn test_grade_agnostic_course_accepts_anyone() {
        let graduated = make_student(Grade::Grade3, GraduationStatus::Graduated);
        let verdict =
            EligibilityChecker::can_enroll(&graduated, &make_course(Some(Grade::Grade2), false), true);
        assert!(verdict.ok);
        assert_eq!(verdict.rule, EligibilityRule::GradeAgnostic);

        let verdict = EligibilityChecker::can_enroll(&graduated, &make_course(None, true), true);
        assert!(verdict.ok);
    }

    #[test]
    fn test_first_placement_ignores_grade() {
        let student = make_student(Grade::Grade1, GraduationStatus::InProgress);
        let verdict =
            EligibilityChecker::can_enroll(&student, &make_course(Some(Grade::Grade3), true), false);
        assert!(verdict.ok);
        assert_eq!(verdict.rule, EligibilityRule::FirstPlacement);
    }

    #[test]
    fn test_anchored_student_needs_exact_grade() {
        let student = make_student(Grade::Grade2, GraduationStatus::InProgress);

        let ok = EligibilityChecker::can_enroll(&student, &make_course(Some(Grade::Grade2), true), true);
        assert!(ok.ok);
        assert_eq!(ok.rule, EligibilityRule::GradeMatched);

        let mismatch =
            EligibilityChecker::can_enroll(&student, &make_course(Some(Grade::Grade1), true), true);
        assert!(!mismatch.ok);
        assert_eq!(mismatch.rule.code(), "GRADE_MISMATCH");
        assert!(mismatch.reason.contains("Grade1"));
        assert!(mismatch.reason.contains("Grade2"));
    }

    #[test]
    fn test_finished_cycle_is_never_directly_eligible() {
        for status in [GraduationStatus::Graduated, GraduationStatus::Archived] {
            let student = make_student(Grade::Grade3, status);
            let verdict =
                EligibilityChecker::can_enroll(&student, &make_course(Some(Grade::Grade3), true), false);
            assert!(!verdict.ok);
            assert_eq!(verdict.rule, EligibilityRule::CycleFinished);
        }
    }
}
