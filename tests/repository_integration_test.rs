// ==========================================
// 仓储层集成测试
// ==========================================
// 职责: 验证名额原子占用、有效报名唯一约束、条件状态更新
// ==========================================


use chrono::Local;
use school_enrollment::domain::types::{Actor, CourseStatus, EnrollmentStatus};
use school_enrollment::domain::Enrollment;
use school_enrollment::repository::{
    CourseRepository, EnrollmentRepository, RepositoryError, RepositoryResult,
};
use test_helpers::*;

#[test]
fn test_seat_reservation_stops_at_capacity() {
    let (_temp, db_path) = create_test_db().unwrap();
    let coordinator = build_coordinator(&db_path, test_policy());
    seed_courses(&coordinator, &[course("C-DUO", "二重奏", None, 2, vec![])]);
    let uow = &coordinator.repositories().unit_of_work;

    let reserved: RepositoryResult<Vec<bool>> = uow.run(|tx| {
        (0..3)
            .map(|_| CourseRepository::try_reserve_seat_tx(tx, "C-DUO"))
            .collect()
    });
    assert_eq!(reserved.unwrap(), vec![true, true, false]);

    let released: RepositoryResult<()> = uow.run(|tx| {
        for _ in 0..3 {
            CourseRepository::release_seat_tx(tx, "C-DUO")?;
        }
        Ok(())
    });
    released.unwrap();

    let course = coordinator.repositories().course_repo.find_by_id("C-DUO").unwrap().unwrap();
    assert_eq!(course.enrolled_count, 0);
}

#[tokio::test]
async fn test_active_enrollment_is_unique_per_student_and_course() {
    let (_temp, db_path) = create_test_db().unwrap();
    let coordinator = build_coordinator(&db_path, test_policy());
    seed_courses(&coordinator, &[course("C-DANCE", "舞蹈", None, 30, vec![])]);

    let result = coordinator
        .submit_on(request("张三", ID_NUMBER, &["C-DANCE"]), Actor::Anonymous, day(2025, 9, 1))
        .await
        .unwrap();
    let existing = result.enrollments[0].clone();

    let duplicate = Enrollment {
        id: "dup".to_string(),
        enrollment_code: "20250901999".to_string(),
        ..existing.clone()
    };
    let inserted: RepositoryResult<()> = coordinator
        .repositories()
        .unit_of_work
        .run(|tx| EnrollmentRepository::insert_tx(tx, &duplicate));
    let err = inserted.unwrap_err();
    assert!(err.is_unique_violation_on("enrollment.student_id"));

    assert_eq!(
        coordinator
            .repositories()
            .enrollment_repo
            .count_active_by_course("C-DANCE")
            .unwrap(),
        1
    );
    assert_eq!(
        count_rows(&db_path, "SELECT COUNT(*) FROM enrollment WHERE enrollment_code LIKE '20250901%'"),
        1
    );
}

#[tokio::test]
async fn test_status_update_checks_current_status() {
    let (_temp, db_path) = create_test_db().unwrap();
    let coordinator = build_coordinator(&db_path, test_policy());
    seed_courses(&coordinator, &[course("C-DANCE", "舞蹈", None, 30, vec![])]);

    let result = coordinator
        .submit_on(request("张三", ID_NUMBER, &["C-DANCE"]), Actor::Anonymous, day(2025, 9, 1))
        .await
        .unwrap();
    let id = result.enrollments[0].id.clone();
    let now = Local::now().naive_local();

    let stale: RepositoryResult<()> = coordinator.repositories().unit_of_work.run(|tx| {
        EnrollmentRepository::update_status_tx(tx, &id, EnrollmentStatus::Approved, EnrollmentStatus::Cancelled, now)
    });
    assert!(matches!(stale, Err(RepositoryError::InvalidStateTransition { .. })));

    let fresh: RepositoryResult<()> = coordinator.repositories().unit_of_work.run(|tx| {
        EnrollmentRepository::update_status_tx(tx, &id, EnrollmentStatus::Pending, EnrollmentStatus::Approved, now)
    });
    fresh.unwrap();

    let stored = coordinator.repositories().enrollment_repo.find_by_id(&id).unwrap().unwrap();
    assert_eq!(stored.status, EnrollmentStatus::Approved);
}

#[test]
fn test_published_course_listing() {
    let (_temp, db_path) = create_test_db().unwrap();
    let coordinator = build_coordinator(&db_path, test_policy());
    seed_courses(
        &coordinator,
        &[
            course("C-DANCE", "舞蹈", None, 30, vec![slot(3, 9, 11)]),
            course("C-ART", "美术", None, 30, vec![]),
        ],
    );
    let repo = &coordinator.repositories().course_repo;

    repo.update_status("C-ART", CourseStatus::Closed).unwrap();
    let published = repo.list_published_by_semester(&semester()).unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, "C-DANCE");
    assert_eq!(published[0].time_slots, vec![slot(3, 9, 11)]);

    assert!(matches!(
        repo.update_status("C-MISSING", CourseStatus::Closed),
        Err(RepositoryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_withdrawn_student_keeps_single_row() {
    let (_temp, db_path) = create_test_db().unwrap();
    let coordinator = build_coordinator(&db_path, test_policy());
    seed_courses(&coordinator, &[course("C-DANCE", "舞蹈", None, 30, vec![])]);

    let result = coordinator
        .submit_on(request("张三", ID_NUMBER, &["C-DANCE"]), Actor::Anonymous, day(2025, 9, 1))
        .await
        .unwrap();
    coordinator
        .withdraw_student(&result.student.id, Actor::Anonymous)
        .await
        .unwrap();

    let repo = &coordinator.repositories().student_repo;
    assert!(repo.find_active_by_id_number(ID_NUMBER).unwrap().is_none());
    assert_eq!(
        count_rows(&db_path, &format!("SELECT COUNT(*) FROM student WHERE id_number = '{}'", ID_NUMBER)),
        1
    );
    assert!(!repo.find_by_id(&result.student.id).unwrap().unwrap().is_active);
}
