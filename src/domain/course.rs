// ==========================================
// 学校报名管理系统 - 课程领域模型
// ==========================================
// 职责: 课程容量、年级门槛、上课时段
// 红线: 有效报名数永远不超过 max_students
// ==========================================

use crate::domain::types::{CourseStatus, Grade, SemesterId};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// ==========================================
// TimeSlot - 上课时段
// ==========================================
// 区间语义: [start_time, end_time)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub day_of_week: u8, // 1=周一 ... 7=周日
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TimeSlot {
    pub fn new(day_of_week: u8, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            day_of_week,
            start_time,
            end_time,
        }
    }
}

// ==========================================
// Course - 课程
// ==========================================
// 对齐: course 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub level: Option<Grade>, // 年级段, None 表示不设门槛
    pub requires_grades: bool, // false: 任何年级均可报名
    pub semester: SemesterId,
    pub max_students: i32,
    pub enrolled_count: i32, // 有效报名(PENDING/APPROVED)计数
    pub time_slots: Vec<TimeSlot>,
    pub status: CourseStatus,
    pub is_active: bool,
}

impl Course {
    /// 是否开放报名
    pub fn is_open_for_enrollment(&self) -> bool {
        self.is_active && self.status == CourseStatus::Published
    }

    /// 是否不限年级
    pub fn is_grade_agnostic(&self) -> bool {
        !self.requires_grades || self.level.is_none()
    }

    pub fn remaining_seats(&self) -> i32 {
        (self.max_students - self.enrolled_count).max(0)
    }
}
