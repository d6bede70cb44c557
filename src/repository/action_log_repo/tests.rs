use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn ts(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 9, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn make_test_log(action_id: &str, actor: &str, target: &str, at: NaiveDateTime) -> ActionLog {
    ActionLog {
        action_id: action_id.to_string(),
        action_type: ActionType::EnrollmentSubmitted.to_string(),
        action_ts: at,
        actor: actor.to_string(),
        target_id: Some(target.to_string()),
        payload_json: Some(json!({ "courses": ["c1"] })),
        detail: Some("测试日志".to_string()),
    }
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = make_test_log("log1", "anonymous", "s1", ts(9, 0));
    assert_eq!(repo.insert(&log).unwrap(), "log1");

    let found = repo.find_by_id("log1").unwrap().unwrap();
    assert_eq!(found.actor, "anonymous");
    assert_eq!(found.action_type, "EnrollmentSubmitted");
    assert_eq!(found.payload_json, Some(json!({ "courses": ["c1"] })));
    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_list_by_actor_and_target_newest_first() {
    let repo = ActionLogRepository::new(setup_test_db());

    let logs = vec![
        make_test_log("a", "u1", "s1", ts(9, 0)),
        make_test_log("b", "u1", "s2", ts(10, 0)),
        make_test_log("c", "u2", "s1", ts(11, 0)),
    ];
    assert_eq!(repo.batch_insert(&logs).unwrap(), 3);

    let by_actor: Vec<String> = repo
        .list_by_actor("u1")
        .unwrap()
        .into_iter()
        .map(|l| l.action_id)
        .collect();
    assert_eq!(by_actor, vec!["b", "a"]);

    let by_target: Vec<String> = repo
        .list_by_target("s1")
        .unwrap()
        .into_iter()
        .map(|l| l.action_id)
        .collect();
    assert_eq!(by_target, vec!["c", "a"]);

    assert_eq!(repo.list_recent(1).unwrap()[0].action_id, "c");
}
