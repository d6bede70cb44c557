// ==========================================
// 配置测试
// ==========================================
// 职责: 验证 config_kv 中的报名策略与学期覆写
// ==========================================


use school_enrollment::config::{config_keys, ConfigManager, EnrollmentPolicyReader};
use school_enrollment::domain::types::{Actor, Grade};
use std::sync::Arc;
use test_helpers::*;

#[tokio::test]
async fn test_load_policy_defaults() {
    let (_temp, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    let policy = config.load_policy().await.unwrap();
    assert_eq!(policy.max_active_courses, 2);
    assert_eq!(policy.max_courses_per_submission, 2);
    assert_eq!(policy.program_length_semesters, 6);
    assert!(policy.semester_overrides.is_empty());
}

#[tokio::test]
async fn test_invalid_value_is_reported() {
    let (_temp, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();
    config
        .set_global_config_value(config_keys::MAX_ACTIVE_COURSES, "abc")
        .unwrap();

    assert!(config.load_policy().await.is_err());
}

#[tokio::test]
async fn test_semester_override_raises_concurrent_cap() {
    let (_temp, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();
    config
        .set_global_config_value(&format!("{}/{}", config_keys::MAX_ACTIVE_COURSES, SEMESTER), "3")
        .unwrap();
    config
        .set_global_config_value(config_keys::CODE_RETRY_BACKOFF_MIN_MS, "0")
        .unwrap();
    config
        .set_global_config_value(config_keys::CODE_RETRY_BACKOFF_MAX_MS, "0")
        .unwrap();

    let coordinator = build_coordinator_with_reader(&db_path, Arc::new(config));
    seed_courses(
        &coordinator,
        &[
            course("C-PIANO-1", "钢琴", Some(Grade::Grade1), 30, vec![slot(1, 9, 11)]),
            course("C-ART-1", "美术", Some(Grade::Grade1), 30, vec![slot(2, 9, 11)]),
            course("C-DANCE", "舞蹈", None, 30, vec![slot(3, 9, 11)]),
        ],
    );

    coordinator
        .submit_on(request("张三", ID_NUMBER, &["C-PIANO-1", "C-ART-1"]), Actor::Anonymous, day(2025, 9, 1))
        .await
        .unwrap();
    let third = coordinator
        .submit_on(request("张三", ID_NUMBER, &["C-DANCE"]), Actor::Anonymous, day(2025, 9, 1))
        .await
        .unwrap();

    assert!(third.success);
    assert_eq!(count_rows(&db_path, "SELECT COUNT(*) FROM enrollment"), 3);
}

#[test]
fn test_config_snapshot_lists_entries() {
    let (_temp, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();
    config
        .set_global_config_value(config_keys::PROGRAM_LENGTH_SEMESTERS, "8")
        .unwrap();

    let snapshot: serde_json::Value =
        serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
    assert_eq!(snapshot[config_keys::PROGRAM_LENGTH_SEMESTERS], "8");
}
