use util::geo::Coordinate;

use crate::error::AttendanceError;
use crate::models::attendance_session::{self, Period, Status};
use crate::test_utils::{seed_course, seed_lecturer, seed_student, setup_test_db};

const CAMPUS: Coordinate = Coordinate {
    latitude: 40.7128,
    longitude: -74.0060,
};

#[tokio::test]
async fn create_rejects_radius_outside_bounds() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;

    for radius in [5.0, 9.99, 10_000.01, 20_000.0] {
        let err = attendance_session::Model::create(&db, lecturer.id, course.id, CAMPUS, radius)
            .await
            .expect_err("radius should have been rejected");
        assert!(
            matches!(err, AttendanceError::Validation(ref msg) if msg == "Radius must be between 10m and 10km"),
            "unexpected error for radius {radius}: {err:?}"
        );
    }
}

#[tokio::test]
async fn create_accepts_boundary_radii() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;

    for radius in [10.0, 10_000.0] {
        let session =
            attendance_session::Model::create(&db, lecturer.id, course.id, CAMPUS, radius)
                .await
                .expect("boundary radius should be accepted");
        assert_eq!(session.status, Status::Active);
        assert_eq!(session.radius_meters, radius);
        assert!(session.ended_at.is_none());
    }
}

#[tokio::test]
async fn create_rejects_bad_coordinates() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;

    let bad_lat = Coordinate {
        latitude: 95.0,
        longitude: 0.0,
    };
    let err = attendance_session::Model::create(&db, lecturer.id, course.id, bad_lat, 50.0)
        .await
        .expect_err("latitude 95 should be rejected");
    assert!(matches!(err, AttendanceError::Validation(ref msg) if msg == "Invalid latitude"));

    let bad_lon = Coordinate {
        latitude: 0.0,
        longitude: -181.0,
    };
    let err = attendance_session::Model::create(&db, lecturer.id, course.id, bad_lon, 50.0)
        .await
        .expect_err("longitude -181 should be rejected");
    assert!(matches!(err, AttendanceError::Validation(ref msg) if msg == "Invalid longitude"));
}

#[tokio::test]
async fn create_requires_course_ownership() {
    let db = setup_test_db().await;
    let (_, owner) = seed_lecturer(&db, "EMP001").await;
    let (_, other) = seed_lecturer(&db, "EMP002").await;
    let course = seed_course(&db, owner.id, "COS101").await;

    let err = attendance_session::Model::create(&db, other.id, course.id, CAMPUS, 50.0)
        .await
        .expect_err("non-owner should not open a session");
    assert!(matches!(err, AttendanceError::Forbidden(_)));

    let err = attendance_session::Model::create(&db, owner.id, 999, CAMPUS, 50.0)
        .await
        .expect_err("unknown course should be rejected");
    assert!(matches!(err, AttendanceError::NotFound(ref msg) if msg == "Course not found"));
}

#[tokio::test]
async fn get_by_id_unknown_session_is_not_found() {
    let db = setup_test_db().await;
    let err = attendance_session::Model::get_by_id(&db, 42)
        .await
        .expect_err("unknown id should be NotFound");
    assert!(matches!(err, AttendanceError::NotFound(ref msg) if msg == "Session not found"));
}

#[tokio::test]
async fn list_active_excludes_closed_sessions() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;

    let open = attendance_session::Model::create(&db, lecturer.id, course.id, CAMPUS, 50.0)
        .await
        .unwrap();
    let closed = attendance_session::Model::create(&db, lecturer.id, course.id, CAMPUS, 50.0)
        .await
        .unwrap();
    attendance_session::Model::close(&db, lecturer.id, closed.id)
        .await
        .unwrap();

    let active = attendance_session::Model::list_active(&db).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, open.id);
    assert_eq!(active[0].course_code, "COS101");
    assert_eq!(active[0].lecturer_employee_id, "EMP001");
}

#[tokio::test]
async fn close_is_idempotent_and_keeps_original_end_time() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CAMPUS, 50.0)
        .await
        .unwrap();

    let first = attendance_session::Model::close(&db, lecturer.id, session.id)
        .await
        .unwrap();
    assert_eq!(first.status, Status::Closed);
    let ended_at = first.ended_at.expect("closed session must have ended_at");

    let second = attendance_session::Model::close(&db, lecturer.id, session.id)
        .await
        .unwrap();
    assert_eq!(second.status, Status::Closed);
    assert_eq!(second.ended_at, Some(ended_at));
}

#[tokio::test]
async fn close_requires_ownership_and_existing_session() {
    let db = setup_test_db().await;
    let (_, owner) = seed_lecturer(&db, "EMP001").await;
    let (_, other) = seed_lecturer(&db, "EMP002").await;
    let course = seed_course(&db, owner.id, "COS101").await;
    let session = attendance_session::Model::create(&db, owner.id, course.id, CAMPUS, 50.0)
        .await
        .unwrap();

    let err = attendance_session::Model::close(&db, other.id, session.id)
        .await
        .expect_err("non-owner should not close");
    assert!(matches!(err, AttendanceError::Forbidden(_)));

    let err = attendance_session::Model::close(&db, owner.id, 999)
        .await
        .expect_err("unknown session should be NotFound");
    assert!(matches!(err, AttendanceError::NotFound(_)));
}

#[tokio::test]
async fn lecturer_sessions_counts_marks_without_inflation() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CAMPUS, 100.0)
        .await
        .unwrap();

    let (_, alice) = seed_student(&db, "S100").await;
    let (_, bob) = seed_student(&db, "S200").await;
    let (_, _carol) = seed_student(&db, "S300").await;

    crate::models::attendance_record::Model::mark(&db, alice.id, "dev-a", session.id, CAMPUS)
        .await
        .unwrap();
    crate::models::attendance_record::Model::mark(&db, bob.id, "dev-b", session.id, CAMPUS)
        .await
        .unwrap();

    let rows = attendance_session::Model::lecturer_sessions(&db, lecturer.id, Period::All)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].attendance_count, 2);
    assert_eq!(rows[0].total_students, 3);
}

#[tokio::test]
async fn session_report_lists_every_student_by_name() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CAMPUS, 100.0)
        .await
        .unwrap();

    let (_, s1) = seed_student(&db, "S100").await;
    let (_, _s2) = seed_student(&db, "S200").await;

    crate::models::attendance_record::Model::mark(&db, s1.id, "dev-a", session.id, CAMPUS)
        .await
        .unwrap();

    let report = attendance_session::Model::session_report(&db, lecturer.id, session.id)
        .await
        .unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].index_number, "S100");
    assert!(report[0].marked_at.is_some());
    assert_eq!(report[1].index_number, "S200");
    assert!(report[1].marked_at.is_none());
}
