// ==========================================
// 学校报名管理系统 - 引擎层审计输出
// ==========================================
// 职责: 定义审计记录 trait, 实现依赖倒置
// 红线: 审计在事务提交之后发出, 失败只记日志, 不影响业务结果
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::Actor;
use crate::repository::ActionLogRepository;
use chrono::Local;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

// ==========================================
// AuditEvent - 审计事件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub action_type: ActionType,
    pub target_id: Option<String>, // 学生ID 或 报名ID
    pub payload: JsonValue,
    pub detail: String,
}

impl AuditEvent {
    pub fn new(
        action_type: ActionType,
        target_id: impl Into<String>,
        payload: JsonValue,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target_id: Some(target_id.into()),
            payload,
            detail: detail.into(),
        }
    }
}

// ==========================================
// AuditSink Trait
// ==========================================
/// 审计记录接收者
///
/// fire-and-forget: 不返回错误, 实现方自行处理失败
pub trait AuditSink: Send + Sync {
    fn record(&self, actor: &Actor, event: &AuditEvent);
}

/// 写入 action_log 表的审计接收者
pub struct ActionLogAuditSink {
    action_log_repo: Arc<ActionLogRepository>,
}

impl ActionLogAuditSink {
    pub fn new(action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self { action_log_repo }
    }
}

impl AuditSink for ActionLogAuditSink {
    fn record(&self, actor: &Actor, event: &AuditEvent) {
        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: event.action_type.to_string(),
            action_ts: Local::now().naive_local(),
            actor: actor.id().to_string(),
            target_id: event.target_id.clone(),
            payload_json: Some(event.payload.clone()),
            detail: Some(event.detail.clone()),
        };

        if let Err(e) = self.action_log_repo.insert(&log) {
            tracing::warn!(
                action_type = %event.action_type,
                actor = %actor,
                "审计日志写入失败(已忽略): {}",
                e
            );
        }
    }
}

/// 空操作审计接收者
///
/// 用于不需要审计的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpAuditSink;

impl AuditSink for NoOpAuditSink {
    fn record(&self, actor: &Actor, event: &AuditEvent) {
        tracing::debug!(
            "NoOpAuditSink: 跳过审计 - actor={}, action_type={}",
            actor,
            event.action_type
        );
    }
}

/// 依次发出事务内收集的审计事件
pub fn emit_all(sink: &dyn AuditSink, actor: &Actor, events: &[AuditEvent]) {
    for event in events {
        sink.record(actor, event);
    }
}
