// ==========================================
// 学校报名管理系统 - 报名领域模型
// ==========================================
// 职责: 报名记录 + 报名提交的请求/结果
// 红线: 报名记录只做状态流转, 永不删除
// 红线: 同一 (学生, 课程) 至多一条 PENDING/APPROVED 记录
// ==========================================

use crate::domain::student::{Student, StudentProfile};
use crate::domain::types::EnrollmentStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Enrollment - 报名记录
// ==========================================
// 对齐: enrollment 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub enrollment_code: String, // 报名编号 {YYYYMMDD}{seq:3}
    pub student_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub enrollment_date: NaiveDate,
    pub insurance_start: Option<NaiveDate>, // 保险期间
    pub insurance_end: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub created_by: String, // 操作人ID 或 "anonymous"
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// SubmitRequest - 报名提交请求
// ==========================================
// 认证/匿名两条入口共用的请求结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub name: String,
    pub id_number: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    pub selected_courses: Vec<String>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub study_period_start: Option<NaiveDate>,
    #[serde(default)]
    pub study_period_end: Option<NaiveDate>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
}

impl SubmitRequest {
    pub fn profile(&self) -> StudentProfile {
        StudentProfile {
            name: self.name.trim().to_string(),
            gender: self.gender.clone(),
            birth_date: self.birth_date,
            contact_phone: self.contact_phone.clone(),
            address: self.address.clone(),
            emergency_contact: self.emergency_contact.clone(),
            emergency_phone: self.emergency_phone.clone(),
        }
    }
}

// ==========================================
// SkippedCourse - 写入阶段被过滤的课程
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCourse {
    pub course_id: String,
    pub course_name: String,
    pub code: String,   // 机器可读原因码
    pub reason: String, // 人类可读原因
}

// ==========================================
// SubmitResult - 报名提交结果
// ==========================================
// success=false 仍表示事务已提交 (学生档案已保存, 没有课程被接受)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub success: bool,
    pub student: Student,
    pub enrollments: Vec<Enrollment>,
    pub enrolled_course_names: Vec<String>,
    pub skipped_courses: Vec<SkippedCourse>,
    pub message: String,
}
