// ==========================================
// 报名状态流转与退学测试
// ==========================================
// 职责: 验证审核流转、名额释放、退学与重新激活、API 层入口
// ==========================================


#[cfg(test)]
mod lifecycle_test {
    use school_enrollment::api::{ApiError, EnrollmentApi};
    use school_enrollment::domain::types::{Actor, EnrollmentStatus, Grade, GradeStanding};
    use school_enrollment::engine::EnrollmentCoordinator;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    use crate::test_helpers::*;

    fn setup_test_env() -> (NamedTempFile, String, EnrollmentCoordinator) {
        let (temp_file, db_path) = create_test_db().unwrap();
        let coordinator = build_coordinator(&db_path, test_policy());
        seed_courses(
            &coordinator,
            &[
                course("C-PIANO-1", "钢琴", Some(Grade::Grade1), 30, vec![slot(1, 9, 11)]),
                course("C-ART-1", "美术", Some(Grade::Grade1), 30, vec![slot(2, 9, 11)]),
            ],
        );
        (temp_file, db_path, coordinator)
    }

    fn teacher() -> Actor {
        Actor::Authenticated("teacher-01".to_string())
    }

    fn seats(db_path: &str, course_id: &str) -> i64 {
        count_rows(
            db_path,
            &format!("SELECT enrolled_count FROM course WHERE id = '{}'", course_id),
        )
    }

    // ==========================================
    // 状态流转
    // ==========================================

    #[tokio::test]
    async fn test_approve_then_cancel_releases_seat() {
        let (_temp, db_path, coordinator) = setup_test_env();
        let result = coordinator
            .submit_on(request("张三", ID_NUMBER, &["C-PIANO-1"]), Actor::Anonymous, day(2025, 9, 1))
            .await
            .unwrap();
        let enrollment_id = result.enrollments[0].id.clone();

        let approved = coordinator
            .transition_enrollment(&enrollment_id, EnrollmentStatus::Approved, teacher())
            .await
            .unwrap();
        assert_eq!(approved.status, EnrollmentStatus::Approved);
        assert_eq!(seats(&db_path, "C-PIANO-1"), 1);

        let cancelled = coordinator
            .transition_enrollment(&enrollment_id, EnrollmentStatus::Cancelled, teacher())
            .await
            .unwrap();
        assert_eq!(cancelled.status, EnrollmentStatus::Cancelled);
        assert_eq!(seats(&db_path, "C-PIANO-1"), 0);

        let logs = coordinator
            .repositories()
            .action_log_repo
            .list_by_target(&enrollment_id)
            .unwrap();
        assert_eq!(
            logs.iter().filter(|l| l.action_type == "EnrollmentStatusChanged").count(),
            2
        );
        assert!(logs.iter().all(|l| l.actor == "teacher-01"));
    }

    #[tokio::test]
    async fn test_invalid_transition_is_rejected() {
        let (_temp, db_path, coordinator) = setup_test_env();
        let result = coordinator
            .submit_on(request("张三", ID_NUMBER, &["C-PIANO-1"]), Actor::Anonymous, day(2025, 9, 1))
            .await
            .unwrap();
        let enrollment_id = result.enrollments[0].id.clone();

        coordinator
            .transition_enrollment(&enrollment_id, EnrollmentStatus::Approved, teacher())
            .await
            .unwrap();
        let err = coordinator
            .transition_enrollment(&enrollment_id, EnrollmentStatus::Rejected, teacher())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATUS_TRANSITION");
        assert_eq!(seats(&db_path, "C-PIANO-1"), 1);

        let err = coordinator
            .transition_enrollment("missing", EnrollmentStatus::Approved, teacher())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ENROLLMENT_NOT_FOUND");
    }

    // ==========================================
    // 退学与重新激活
    // ==========================================

    #[tokio::test]
    async fn test_withdraw_cancels_enrollments_and_reactivation_resets_cycle() {
        let (_temp, db_path, coordinator) = setup_test_env();
        let first = coordinator
            .submit_on(
                request("张三", ID_NUMBER, &["C-PIANO-1", "C-ART-1"]),
                Actor::Anonymous,
                day(2025, 9, 1),
            )
            .await
            .unwrap();
        assert_eq!(first.enrollments.len(), 2);

        let withdrawn = coordinator
            .withdraw_student(&first.student.id, teacher())
            .await
            .unwrap();
        assert!(!withdrawn.is_active);
        assert_eq!(seats(&db_path, "C-PIANO-1"), 0);
        assert_eq!(seats(&db_path, "C-ART-1"), 0);
        assert_eq!(
            count_rows(&db_path, "SELECT COUNT(*) FROM enrollment WHERE status = 'CANCELLED'"),
            2
        );

        // 重复退学原样返回
        let again = coordinator
            .withdraw_student(&first.student.id, teacher())
            .await
            .unwrap();
        assert!(!again.is_active);

        let mut req = request("张三丰", ID_NUMBER, &["C-PIANO-1"]);
        req.address = Some("北京市东城区".to_string());
        let back = coordinator
            .submit_on(req, Actor::Anonymous, day(2025, 9, 1))
            .await
            .unwrap();

        assert!(back.success);
        assert_eq!(back.student.id, first.student.id);
        assert!(back.student.is_active);
        assert_eq!(back.student.name, "张三丰");
        assert_eq!(back.student.address.as_deref(), Some("北京市东城区"));
        assert_eq!(back.student.current_grade, Some(GradeStanding::FIRST));
        assert_ne!(back.student.student_code, first.student.student_code);
        assert_eq!(count_rows(&db_path, "SELECT COUNT(*) FROM student"), 1);
    }

    #[tokio::test]
    async fn test_withdraw_unknown_student() {
        let (_temp, _db_path, coordinator) = setup_test_env();
        let err = coordinator.withdraw_student("missing", teacher()).await.unwrap_err();
        assert_eq!(err.code(), "STUDENT_NOT_FOUND");
    }

    // ==========================================
    // API 层
    // ==========================================

    #[tokio::test]
    async fn test_api_authenticated_and_anonymous_share_flow() {
        let (_temp, _db_path, coordinator) = setup_test_env();
        let api = EnrollmentApi::new(Arc::new(coordinator));

        let err = api
            .submit_authenticated("  ", request("张三", ID_NUMBER, &["C-PIANO-1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let result = api
            .submit_authenticated("teacher-01", request("张三", ID_NUMBER, &["C-PIANO-1"]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.enrollments[0].created_by, "teacher-01");

        let anonymous = api
            .submit_anonymous(request("李四", &id_number(7), &["C-ART-1"]))
            .await
            .unwrap();
        assert!(anonymous.success);
        assert_eq!(anonymous.enrollments[0].created_by, "anonymous");

        let student = api
            .get_student_by_id_number(&ID_NUMBER.to_lowercase())
            .unwrap()
            .unwrap();
        assert_eq!(student.id, result.student.id);
        assert_eq!(api.list_student_enrollments(&student.id).unwrap().len(), 1);
        assert!(!api.list_actions_by_actor("teacher-01").unwrap().is_empty());

        let approved = api.approve(&result.enrollments[0].id, "teacher-01").await.unwrap();
        assert_eq!(approved.status, EnrollmentStatus::Approved);

        let err = api.reject(&result.enrollments[0].id, "teacher-01").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

        let err = api
            .submit_anonymous(request("王五", &id_number(8), &["C-MISSING"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_api_course_availability_tracks_seats() {
        let (_temp, _db_path, coordinator) = setup_test_env();
        let api = EnrollmentApi::new(Arc::new(coordinator));

        let before = api.get_course_availability("C-PIANO-1").unwrap();
        assert_eq!(before.active_enrollments, 0);
        assert_eq!(before.remaining_seats, 30);
        assert!(before.is_consistent());

        let result = api
            .submit_anonymous(request("张三", ID_NUMBER, &["C-PIANO-1"]))
            .await
            .unwrap();
        let during = api.get_course_availability("C-PIANO-1").unwrap();
        assert_eq!(during.active_enrollments, 1);
        assert_eq!(during.remaining_seats, 29);
        assert!(during.is_consistent());

        api.cancel(&result.enrollments[0].id, "teacher-01").await.unwrap();
        let after = api.get_course_availability("C-PIANO-1").unwrap();
        assert_eq!(after.active_enrollments, 0);
        assert_eq!(after.remaining_seats, 30);

        let err = api.get_course_availability("C-MISSING").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
