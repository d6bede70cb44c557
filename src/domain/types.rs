// ==========================================
// 学校报名管理系统 - 领域类型定义
// ==========================================
// 职责: 年级/学籍/报名状态等封闭枚举, 学期值对象
// 红线: 状态值一律使用枚举, 禁止在业务判断中散落字符串
// ==========================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 年级 (Grade)
// ==========================================
// 顺序: Grade1 < Grade2 < Grade3
// 用途: 课程年级段 / 学生所在年级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    Grade1, // 一年级
    Grade2, // 二年级
    Grade3, // 三年级
}

impl Grade {
    /// 学制内的年级数
    pub const TIER_COUNT: u32 = 3;

    /// 按年级序号(0 起)取年级, 超出范围返回 None
    pub fn from_tier(tier: u32) -> Option<Self> {
        match tier {
            0 => Some(Grade::Grade1),
            1 => Some(Grade::Grade2),
            2 => Some(Grade::Grade3),
            _ => None,
        }
    }

    pub fn tier(self) -> u32 {
        match self {
            Grade::Grade1 => 0,
            Grade::Grade2 => 1,
            Grade::Grade3 => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Grade1 => "Grade1",
            Grade::Grade2 => "Grade2",
            Grade::Grade3 => "Grade3",
        }
    }

    /// 解析课程年级标签; 空串表示不限年级, 由调用方处理
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Grade1" => Some(Grade::Grade1),
            "Grade2" => Some(Grade::Grade2),
            "Grade3" => Some(Grade::Grade3),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 年级进度 (Grade Standing)
// ==========================================
// 顺序: Grade1 < Grade2 < Grade3 < GRADUATED
// 红线: 学生年级只能沿此顺序前进, 重新入学是唯一的重置路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GradeStanding {
    InGrade(Grade),
    Graduated,
}

impl GradeStanding {
    pub const FIRST: GradeStanding = GradeStanding::InGrade(Grade::Grade1);

    pub fn grade(self) -> Option<Grade> {
        match self {
            GradeStanding::InGrade(grade) => Some(grade),
            GradeStanding::Graduated => None,
        }
    }

    pub fn is_graduated(self) -> bool {
        matches!(self, GradeStanding::Graduated)
    }

    pub fn to_db_str(self) -> &'static str {
        match self {
            GradeStanding::InGrade(grade) => grade.as_str(),
            GradeStanding::Graduated => "GRADUATED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "GRADUATED" => Some(GradeStanding::Graduated),
            other => Grade::parse(other).map(GradeStanding::InGrade),
        }
    }
}

impl From<GradeStanding> for String {
    fn from(standing: GradeStanding) -> Self {
        standing.to_db_str().to_string()
    }
}

impl TryFrom<String> for GradeStanding {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        GradeStanding::from_db_str(&value).ok_or_else(|| format!("未知年级: {}", value))
    }
}

impl fmt::Display for GradeStanding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 毕业状态 (Graduation Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraduationStatus {
    InProgress, // 在读
    Graduated,  // 已毕业
    Archived,   // 已归档
}

impl GraduationStatus {
    pub fn to_db_str(self) -> &'static str {
        match self {
            GraduationStatus::InProgress => "IN_PROGRESS",
            GraduationStatus::Graduated => "GRADUATED",
            GraduationStatus::Archived => "ARCHIVED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "IN_PROGRESS" => Some(GraduationStatus::InProgress),
            "GRADUATED" => Some(GraduationStatus::Graduated),
            "ARCHIVED" => Some(GraduationStatus::Archived),
            _ => None,
        }
    }

    /// 已结束学业周期 (毕业或归档)
    pub fn is_finished(self) -> bool {
        !matches!(self, GraduationStatus::InProgress)
    }
}

impl fmt::Display for GraduationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 学籍状态 (Academic Status)
// ==========================================
// 展示用, 与毕业状态保持一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcademicStatus {
    Active,
    Graduated,
}

impl AcademicStatus {
    pub fn to_db_str(self) -> &'static str {
        match self {
            AcademicStatus::Active => "ACTIVE",
            AcademicStatus::Graduated => "GRADUATED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(AcademicStatus::Active),
            "GRADUATED" => Some(AcademicStatus::Graduated),
            _ => None,
        }
    }
}

impl fmt::Display for AcademicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 报名状态 (Enrollment Status)
// ==========================================
// 状态机:
//   PENDING  → APPROVED | REJECTED | CANCELLED
//   APPROVED → CANCELLED
//   REJECTED / CANCELLED 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Pending,   // 待审核
    Approved,  // 已通过
    Rejected,  // 已拒绝
    Cancelled, // 已取消
}

impl EnrollmentStatus {
    pub fn to_db_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "PENDING",
            EnrollmentStatus::Approved => "APPROVED",
            EnrollmentStatus::Rejected => "REJECTED",
            EnrollmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(EnrollmentStatus::Pending),
            "APPROVED" => Some(EnrollmentStatus::Approved),
            "REJECTED" => Some(EnrollmentStatus::Rejected),
            "CANCELLED" => Some(EnrollmentStatus::Cancelled),
            _ => None,
        }
    }

    /// 占用名额的状态
    pub fn is_active(self) -> bool {
        matches!(self, EnrollmentStatus::Pending | EnrollmentStatus::Approved)
    }

    pub fn can_transition_to(self, target: EnrollmentStatus) -> bool {
        use EnrollmentStatus::*;
        matches!(
            (self, target),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Cancelled) | (Approved, Cancelled)
        )
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 课程发布状态 (Course Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    Draft,     // 草稿
    Published, // 已发布 (唯一可报名状态)
    Closed,    // 已关闭
}

impl CourseStatus {
    pub fn to_db_str(self) -> &'static str {
        match self {
            CourseStatus::Draft => "DRAFT",
            CourseStatus::Published => "PUBLISHED",
            CourseStatus::Closed => "CLOSED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(CourseStatus::Draft),
            "PUBLISHED" => Some(CourseStatus::Published),
            "CLOSED" => Some(CourseStatus::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 操作人 (Actor)
// ==========================================
// 只写入 created_by 与审计日志, 不参与任何业务判断
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Authenticated(String),
    Anonymous,
}

impl Actor {
    pub const ANONYMOUS_ID: &'static str = "anonymous";

    pub fn id(&self) -> &str {
        match self {
            Actor::Authenticated(id) => id.as_str(),
            Actor::Anonymous => Self::ANONYMOUS_ID,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

// ==========================================
// 学期 (Semester)
// ==========================================
// 格式: "{起始学年}-{结束学年}-{1|2}", 例如 "2025-2026-1"
// 第一学期: 9月-次年1月; 第二学期: 2月-8月
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    First,
    Second,
}

impl Term {
    pub fn index(self) -> i32 {
        match self {
            Term::First => 1,
            Term::Second => 2,
        }
    }

    fn from_index(index: i32) -> Option<Self> {
        match index {
            1 => Some(Term::First),
            2 => Some(Term::Second),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemesterId {
    pub start_year: i32,
    pub term: Term,
}

impl SemesterId {
    pub fn new(start_year: i32, term: Term) -> Self {
        Self { start_year, term }
    }

    /// 由日期推导所在学期
    pub fn from_date(date: NaiveDate) -> Self {
        match date.month() {
            9..=12 => SemesterId::new(date.year(), Term::First),
            1 => SemesterId::new(date.year() - 1, Term::First),
            _ => SemesterId::new(date.year() - 1, Term::Second),
        }
    }

    /// 解析学期字符串
    ///
    /// 支持 "2025-2026-1" 与简写 "2025-1"
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        let (start, end, term) = match parts.as_slice() {
            [start, end, term] => (*start, Some(*end), *term),
            [start, term] => (*start, None, *term),
            _ => return None,
        };

        if start.len() != 4 {
            return None;
        }
        let start_year: i32 = start.parse().ok()?;
        if let Some(end) = end {
            let end_year: i32 = end.parse().ok()?;
            if end_year != start_year + 1 {
                return None;
            }
        }
        let term = Term::from_index(term.parse().ok()?)?;
        Some(SemesterId::new(start_year, term))
    }

    /// 学年编码年份 (学号前缀)
    pub fn code_year(&self) -> i32 {
        self.start_year
    }

    /// 从 self 到 later 经过的学期数, 不足 0 按 0 计
    pub fn semesters_until(&self, later: &SemesterId) -> u32 {
        let elapsed = (later.start_year - self.start_year) * 2
            + (later.term.index() - self.term.index());
        elapsed.max(0) as u32
    }
}

impl From<SemesterId> for String {
    fn from(semester: SemesterId) -> Self {
        semester.to_string()
    }
}

impl TryFrom<String> for SemesterId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SemesterId::parse(&value).ok_or_else(|| format!("学期格式错误: {}", value))
    }
}

impl fmt::Display for SemesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.start_year,
            self.start_year + 1,
            self.term.index()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_standing_order() {
        assert!(GradeStanding::InGrade(Grade::Grade1) < GradeStanding::InGrade(Grade::Grade2));
        assert!(GradeStanding::InGrade(Grade::Grade3) < GradeStanding::Graduated);
        assert_eq!(GradeStanding::FIRST.grade(), Some(Grade::Grade1));
    }

    #[test]
    fn test_grade_standing_db_str() {
        assert_eq!(GradeStanding::Graduated.to_db_str(), "GRADUATED");
        assert_eq!(
            GradeStanding::from_db_str("Grade2"),
            Some(GradeStanding::InGrade(Grade::Grade2))
        );
        assert_eq!(GradeStanding::from_db_str("grade9"), None);
    }

    #[test]
    fn test_enrollment_status_transitions() {
        use EnrollmentStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Approved));
        assert!(Pending.is_active() && Approved.is_active());
        assert!(!Rejected.is_active() && !Cancelled.is_active());
    }

    #[test]
    fn test_semester_from_date() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(SemesterId::from_date(d(2025, 9, 1)).to_string(), "2025-2026-1");
        assert_eq!(SemesterId::from_date(d(2026, 1, 15)).to_string(), "2025-2026-1");
        assert_eq!(SemesterId::from_date(d(2026, 3, 1)).to_string(), "2025-2026-2");
        assert_eq!(SemesterId::from_date(d(2026, 8, 31)).to_string(), "2025-2026-2");
    }

    #[test]
    fn test_semester_parse() {
        assert_eq!(
            SemesterId::parse("2025-2026-2"),
            Some(SemesterId::new(2025, Term::Second))
        );
        assert_eq!(SemesterId::parse("2024-1"), Some(SemesterId::new(2024, Term::First)));
        assert_eq!(SemesterId::parse("2025-2027-1"), None);
        assert_eq!(SemesterId::parse("2025-2026-3"), None);
        assert_eq!(SemesterId::parse("25-1"), None);
        assert_eq!(SemesterId::parse(""), None);
    }

    #[test]
    fn test_semesters_until() {
        let a = SemesterId::new(2024, Term::First);
        assert_eq!(a.semesters_until(&SemesterId::new(2024, Term::Second)), 1);
        assert_eq!(a.semesters_until(&SemesterId::new(2027, Term::First)), 6);
        assert_eq!(SemesterId::new(2026, Term::Second).semesters_until(&a), 0);
    }

    #[test]
    fn test_actor_id() {
        assert_eq!(Actor::Anonymous.id(), "anonymous");
        assert_eq!(Actor::Authenticated("u-1".to_string()).id(), "u-1");
    }
}
