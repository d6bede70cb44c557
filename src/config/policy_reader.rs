// ==========================================
// 学校报名管理系统 - 报名策略读取 Trait
// ==========================================
// 职责: 定义引擎所需的策略读取接口 + 策略快照结构
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::SemesterId;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// EnrollmentPolicy - 报名策略快照
// ==========================================
// 一次提交只读取一次, 事务内不再访问配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentPolicy {
    /// 每学期同时有效报名上限 K
    pub max_active_courses: u32,
    /// 按学期覆写的 K
    pub semester_overrides: HashMap<SemesterId, u32>,
    /// 单次提交可选课程数上限
    pub max_courses_per_submission: usize,
    /// 学制 (学期数), 达到即毕业
    pub program_length_semesters: u32,
    /// 编号生成重试次数
    pub code_retry_max_attempts: u32,
    pub code_retry_backoff_min_ms: u64,
    pub code_retry_backoff_max_ms: u64,
    /// SQLITE_BUSY 时整单重试次数
    pub tx_busy_retry_max_attempts: u32,
}

impl Default for EnrollmentPolicy {
    fn default() -> Self {
        Self {
            max_active_courses: 2,
            semester_overrides: HashMap::new(),
            max_courses_per_submission: 2,
            program_length_semesters: 6,
            code_retry_max_attempts: 5,
            code_retry_backoff_min_ms: 100,
            code_retry_backoff_max_ms: 300,
            tx_busy_retry_max_attempts: 3,
        }
    }
}

impl EnrollmentPolicy {
    /// 指定学期的并发报名上限 (覆写优先)
    pub fn max_active_courses_for(&self, semester: &SemesterId) -> u32 {
        self.semester_overrides
            .get(semester)
            .copied()
            .unwrap_or(self.max_active_courses)
    }
}

// ==========================================
// EnrollmentPolicyReader Trait
// ==========================================
// 实现者: ConfigManager (config_kv 表), StaticPolicyReader (固定快照)
#[async_trait]
pub trait EnrollmentPolicyReader: Send + Sync {
    /// 读取当前策略快照
    ///
    /// # 返回
    /// - 缺失的配置项取默认值
    /// - 配置值无法解析时返回 FieldValueError
    async fn load_policy(&self) -> RepositoryResult<EnrollmentPolicy>;
}

// ==========================================
// StaticPolicyReader - 固定策略
// ==========================================
// 用途: 测试与无配置表的嵌入场景
#[derive(Debug, Clone, Default)]
pub struct StaticPolicyReader {
    policy: EnrollmentPolicy,
}

impl StaticPolicyReader {
    pub fn new(policy: EnrollmentPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl EnrollmentPolicyReader for StaticPolicyReader {
    async fn load_policy(&self) -> RepositoryResult<EnrollmentPolicy> {
        Ok(self.policy.clone())
    }
}
