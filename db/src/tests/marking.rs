use util::geo::{self, Coordinate};

use crate::error::AttendanceError;
use crate::models::attendance_record::{self, AttendanceStatus};
use crate::models::attendance_session;
use crate::test_utils::{seed_course, seed_lecturer, seed_student, setup_test_db};

const CENTER: Coordinate = Coordinate {
    latitude: 40.7128,
    longitude: -74.0060,
};

// Roughly 11 meters due north of CENTER.
const NEARBY: Coordinate = Coordinate {
    latitude: 40.7129,
    longitude: -74.0060,
};

// Roughly 1.4 km away.
const FAR: Coordinate = Coordinate {
    latitude: 40.7228,
    longitude: -74.0160,
};

#[tokio::test]
async fn mark_inside_zone_records_distance() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, student) = seed_student(&db, "S100").await;

    let record = attendance_record::Model::mark(&db, student.id, "dev-a", session.id, NEARBY)
        .await
        .expect("mark inside the zone should succeed");

    assert_eq!(record.session_id, session.id);
    assert_eq!(record.student_id, student.id);
    let expected = geo::haversine_distance_m(CENTER, NEARBY);
    assert!((record.distance_from_center - expected).abs() < 1e-9);
}

#[tokio::test]
async fn mark_at_exact_boundary_is_admitted() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;

    // Radius set to the exact distance of the reported point: on the edge,
    // still inside.
    let radius = geo::haversine_distance_m(CENTER, NEARBY);
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, radius)
        .await
        .unwrap();
    let (_, student) = seed_student(&db, "S100").await;

    attendance_record::Model::mark(&db, student.id, "dev-a", session.id, NEARBY)
        .await
        .expect("a point exactly on the boundary should be admitted");
}

#[tokio::test]
async fn mark_outside_zone_reports_overage() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, student) = seed_student(&db, "S100").await;

    let err = attendance_record::Model::mark(&db, student.id, "dev-a", session.id, FAR)
        .await
        .expect_err("a point 1.4km out should be rejected");

    match err {
        AttendanceError::OutOfZone {
            distance_m,
            overage_m,
        } => {
            assert!((distance_m - overage_m - 50.0).abs() < 1e-9);
            assert!(overage_m > 1000.0);
        }
        other => panic!("expected OutOfZone, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_mark_is_a_conflict() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, student) = seed_student(&db, "S100").await;

    attendance_record::Model::mark(&db, student.id, "dev-a", session.id, NEARBY)
        .await
        .unwrap();

    let err = attendance_record::Model::mark(&db, student.id, "dev-a", session.id, NEARBY)
        .await
        .expect_err("second mark should be rejected");
    assert!(
        matches!(err, AttendanceError::Conflict(ref msg) if msg == "You have already marked attendance for this session")
    );
}

#[tokio::test]
async fn concurrent_duplicate_marks_admit_exactly_one() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, student) = seed_student(&db, "S100").await;

    let (a, b) = tokio::join!(
        attendance_record::Model::mark(&db, student.id, "dev-a", session.id, NEARBY),
        attendance_record::Model::mark(&db, student.id, "dev-a", session.id, NEARBY),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the racing marks should win");
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(err, AttendanceError::Conflict(_)), "{err:?}");
        }
    }
}

#[tokio::test]
async fn mark_on_closed_session_is_rejected() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    attendance_session::Model::close(&db, lecturer.id, session.id)
        .await
        .unwrap();
    let (_, student) = seed_student(&db, "S100").await;

    let err = attendance_record::Model::mark(&db, student.id, "dev-a", session.id, NEARBY)
        .await
        .expect_err("marking a closed session should fail");
    assert!(matches!(err, AttendanceError::Conflict(ref msg) if msg == "Session is not active"));
}

#[tokio::test]
async fn mark_on_unknown_session_is_not_found() {
    let db = setup_test_db().await;
    let (_, student) = seed_student(&db, "S100").await;

    let err = attendance_record::Model::mark(&db, student.id, "dev-a", 999, NEARBY)
        .await
        .expect_err("unknown session should be NotFound");
    assert!(matches!(err, AttendanceError::NotFound(_)));
}

#[tokio::test]
async fn student_history_flags_attended_and_absent() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let attended = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let missed = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, student) = seed_student(&db, "S100").await;

    attendance_record::Model::mark(&db, student.id, "dev-a", attended.id, NEARBY)
        .await
        .unwrap();

    let history =
        attendance_record::Model::student_history(&db, student.id, attendance_session::Period::All)
            .await
            .unwrap();
    assert_eq!(history.len(), 2);

    let attended_row = history
        .iter()
        .find(|r| r.session_id == attended.id)
        .unwrap();
    assert_eq!(attended_row.status, AttendanceStatus::Attended);
    assert!(attended_row.marked_at.is_some());

    let missed_row = history.iter().find(|r| r.session_id == missed.id).unwrap();
    assert_eq!(missed_row.status, AttendanceStatus::Absent);
    assert!(missed_row.marked_at.is_none());
}
