// ==========================================
// 学校报名管理系统 - 上课时段冲突检测
// ==========================================
// 职责: 两门课程的时段两两比较
// 区间: [start, end) 半开区间, 首尾相接不算冲突
// ==========================================

use crate::domain::course::TimeSlot;

pub struct ConflictDetector;

impl ConflictDetector {
    /// 两组时段是否存在重叠
    pub fn has_time_slot_conflict(slots_a: &[TimeSlot], slots_b: &[TimeSlot]) -> bool {
        Self::find_conflict(slots_a, slots_b).is_some()
    }

    /// 返回第一对冲突时段 (用于生成原因说明)
    pub fn find_conflict<'a>(
        slots_a: &'a [TimeSlot],
        slots_b: &'a [TimeSlot],
    ) -> Option<(&'a TimeSlot, &'a TimeSlot)> {
        slots_a.iter().find_map(|a| {
            slots_b
                .iter()
                .find(|b| Self::slots_overlap(a, b))
                .map(|b| (a, b))
        })
    }

    fn slots_overlap(a: &TimeSlot, b: &TimeSlot) -> bool {
        a.day_of_week == b.day_of_week && a.start_time < b.end_time && b.start_time < a.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn slot(day: u8, start: (u32, u32), end: (u32, u32)) -> TimeSlot {
        TimeSlot::new(
            day,
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        )
    }

    #[test]
    fn test_overlap_same_day() {
        let a = vec![slot(1, (9, 0), (10, 30))];
        let b = vec![slot(1, (10, 0), (11, 0))];
        assert!(ConflictDetector::has_time_slot_conflict(&a, &b));
        assert!(ConflictDetector::has_time_slot_conflict(&b, &a));
    }

    #[test]
    fn test_adjacent_slots_do_not_conflict() {
        let a = vec![slot(3, (9, 0), (10, 0))];
        let b = vec![slot(3, (10, 0), (11, 0))];
        assert!(!ConflictDetector::has_time_slot_conflict(&a, &b));
    }

    #[test]
    fn test_different_day_does_not_conflict() {
        let a = vec![slot(2, (9, 0), (12, 0))];
        let b = vec![slot(4, (9, 0), (12, 0))];
        assert!(!ConflictDetector::has_time_slot_conflict(&a, &b));
    }

    #[test]
    fn test_empty_slots_never_conflict() {
        let a = vec![slot(1, (9, 0), (10, 0))];
        assert!(!ConflictDetector::has_time_slot_conflict(&a, &[]));
        assert!(!ConflictDetector::has_time_slot_conflict(&[], &[]));
    }

    #[test]
    fn test_find_conflict_reports_pair() {
        let a = vec![slot(1, (8, 0), (9, 0)), slot(5, (14, 0), (16, 0))];
        let b = vec![slot(5, (15, 0), (17, 0))];
        let (x, y) = ConflictDetector::find_conflict(&a, &b).unwrap();
        assert_eq!(x.day_of_week, 5);
        assert_eq!(y.day_of_week, 5);
    }
}
