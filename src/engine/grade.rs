// ==========================================
// 学校报名管理系统 - 年级计算器
// ==========================================
// 职责: 由入学学期与当前学期推导年级/毕业
// 红线: 无状态、无副作用、无 I/O 操作
// 红线: calculate_current_grade 返回 GRADUATED 当且仅当 should_graduate 为真
// ==========================================

use crate::config::EnrollmentPolicy;
use crate::domain::types::{Grade, GradeStanding, SemesterId};
use chrono::NaiveDate;

// ==========================================
// GradeCalculator - 年级计算器
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeCalculator {
    program_length_semesters: u32,
}

impl GradeCalculator {
    /// 默认学制: 3 个年级 x 2 个学期
    pub const DEFAULT_PROGRAM_LENGTH: u32 = 6;

    /// # 参数
    /// - program_length_semesters: 学制学期数, 0 按 1 处理
    pub fn new(program_length_semesters: u32) -> Self {
        Self {
            program_length_semesters: program_length_semesters.max(1),
        }
    }

    pub fn from_policy(policy: &EnrollmentPolicy) -> Self {
        Self::new(policy.program_length_semesters)
    }

    pub fn program_length_semesters(&self) -> u32 {
        self.program_length_semesters
    }

    /// 当前学期 (由日期推导)
    pub fn current_semester(today: NaiveDate) -> SemesterId {
        SemesterId::from_date(today)
    }

    /// 每个年级跨越的学期数 (向上取整, 至少 1)
    fn semesters_per_tier(&self) -> u32 {
        let tiers = Grade::TIER_COUNT;
        ((self.program_length_semesters + tiers - 1) / tiers).max(1)
    }

    /// 计算当前年级
    ///
    /// # 规则
    /// - elapsed >= 学制 → GRADUATED
    /// - 否则 tier = min(elapsed / per_tier, 2)
    pub fn calculate_current_grade(
        &self,
        enrollment_semester: &SemesterId,
        now_semester: &SemesterId,
    ) -> GradeStanding {
        if self.should_graduate(enrollment_semester, now_semester) {
            return GradeStanding::Graduated;
        }

        let elapsed = enrollment_semester.semesters_until(now_semester);
        let tier = (elapsed / self.semesters_per_tier()).min(Grade::TIER_COUNT - 1);
        Grade::from_tier(tier)
            .map(GradeStanding::InGrade)
            .unwrap_or(GradeStanding::InGrade(Grade::Grade3))
    }

    /// 是否应毕业: 经过的学期数达到学制
    pub fn should_graduate(&self, enrollment_semester: &SemesterId, now_semester: &SemesterId) -> bool {
        enrollment_semester.semesters_until(now_semester) >= self.program_length_semesters
    }
}

impl Default for GradeCalculator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM_LENGTH)
    }
}
