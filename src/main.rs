// ==========================================
// 学校报名管理系统 - 主入口
// ==========================================
// 职责: 初始化日志与数据库, 输出当前报名策略
// 说明: HTTP 路由/鉴权由宿主服务负责, 此处只做启动自检
// ==========================================

use std::sync::{Arc, Mutex};

use anyhow::Context;
use school_enrollment::config::{ConfigManager, EnrollmentPolicyReader};
use school_enrollment::db::{default_db_path, init_schema, open_sqlite_connection, read_schema_version};
use school_enrollment::{logging, APP_NAME, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", APP_NAME);
    tracing::info!("系统版本: {}", VERSION);
    tracing::info!("==================================================");

    let db_path = default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("数据库建表失败")?;
    let schema_version = read_schema_version(&conn).context("读取 schema_version 失败")?;
    tracing::info!(schema_version = ?schema_version, "数据库已就绪");

    let config = ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
        .context("初始化配置管理器失败")?;
    let policy = config.load_policy().await.context("读取报名策略失败")?;
    tracing::info!(
        max_active_courses = policy.max_active_courses,
        max_courses_per_submission = policy.max_courses_per_submission,
        program_length_semesters = policy.program_length_semesters,
        semester_overrides = policy.semester_overrides.len(),
        "报名策略已加载"
    );
    tracing::debug!("配置快照: {}", config.get_config_snapshot()?);

    Ok(())
}
