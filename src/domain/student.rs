// ==========================================
// 学校报名管理系统 - 学生领域模型
// ==========================================
// 职责: 学生身份 + 学业周期状态
// 红线: 同一身份证号只允许一条 is_active = true 的记录
// 红线: 学生只做软删除, 永不物理删除
// ==========================================

use crate::domain::types::{AcademicStatus, GradeStanding, GraduationStatus, SemesterId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Student - 学生
// ==========================================
// 对齐: student 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    // ===== 主键与身份 =====
    pub id: String,          // 主键 (UUID)
    pub id_number: String,   // 身份证号 (自然去重键)
    pub student_code: String, // 学号, 每个学业周期开始时生成

    // ===== 档案 =====
    pub name: String,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,

    // ===== 学业周期 =====
    pub current_grade: Option<GradeStanding>, // 不限年级课程的学生可为空
    pub enrollment_year: i32,
    pub enrollment_semester: SemesterId,
    pub graduation_status: GraduationStatus,
    pub academic_status: AcademicStatus,
    pub graduation_date: Option<NaiveDate>,

    // ===== 软删除 =====
    pub is_active: bool,

    // ===== 审计 =====
    pub remarks: Option<String>, // 含重新入学等审计备注
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Student {
    /// 追加一行审计备注
    pub fn append_note(&mut self, note: &str) {
        match self.remarks.as_mut() {
            Some(existing) if !existing.is_empty() => {
                existing.push('\n');
                existing.push_str(note);
            }
            _ => self.remarks = Some(note.to_string()),
        }
    }

    /// 是否处于学业周期中 (有效且在读)
    pub fn is_in_progress(&self) -> bool {
        self.is_active && self.graduation_status == GraduationStatus::InProgress
    }
}

// ==========================================
// StudentProfile - 报名提交的档案字段
// ==========================================
// 用途: 新建学生与软删除学生重新激活时刷新档案
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub name: String,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
}

impl StudentProfile {
    /// 将档案字段覆盖到学生记录 (空字段不覆盖已有值)
    pub fn apply_to(&self, student: &mut Student) {
        student.name = self.name.clone();
        if self.gender.is_some() {
            student.gender = self.gender.clone();
        }
        if self.birth_date.is_some() {
            student.birth_date = self.birth_date;
        }
        if self.contact_phone.is_some() {
            student.contact_phone = self.contact_phone.clone();
        }
        if self.address.is_some() {
            student.address = self.address.clone();
        }
        if self.emergency_contact.is_some() {
            student.emergency_contact = self.emergency_contact.clone();
        }
        if self.emergency_phone.is_some() {
            student.emergency_phone = self.emergency_phone.clone();
        }
    }
}
