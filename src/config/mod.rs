// ==========================================
// 学校报名管理系统 - 配置层
// ==========================================
// 职责: 报名策略配置, 支持按学期覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod policy_reader;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use policy_reader::{EnrollmentPolicy, EnrollmentPolicyReader, StaticPolicyReader};
