// ==========================================
// 学校报名管理系统 - 操作日志领域模型
// ==========================================
// 职责: 审计事件的持久化结构
// 红线: 审计写入失败不得影响业务事务
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,              // 日志ID
    pub action_type: String,            // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,       // 操作时间戳
    pub actor: String,                  // 操作人 (用户ID 或 "anonymous")
    pub target_id: Option<String>,      // 关联学生/报名ID
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,         // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    EnrollmentSubmitted,     // 报名提交成功
    EnrollmentSoftFailed,    // 报名提交无课程被接受
    StudentCreated,          // 新建学生
    StudentProgressed,       // 年级前进
    StudentGraduated,        // 毕业
    StudentReentered,        // 毕业/归档后重新入学
    StudentReactivated,      // 软删除后重新激活
    StudentWithdrawn,        // 退学(软删除)
    EnrollmentStatusChanged, // 报名状态流转
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::EnrollmentSubmitted => "EnrollmentSubmitted",
            ActionType::EnrollmentSoftFailed => "EnrollmentSoftFailed",
            ActionType::StudentCreated => "StudentCreated",
            ActionType::StudentProgressed => "StudentProgressed",
            ActionType::StudentGraduated => "StudentGraduated",
            ActionType::StudentReentered => "StudentReentered",
            ActionType::StudentReactivated => "StudentReactivated",
            ActionType::StudentWithdrawn => "StudentWithdrawn",
            ActionType::EnrollmentStatusChanged => "EnrollmentStatusChanged",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
