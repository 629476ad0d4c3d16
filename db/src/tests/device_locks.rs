use util::geo::Coordinate;

use crate::error::AttendanceError;
use crate::models::{attendance_record, attendance_session, device_lock};
use crate::test_utils::{seed_course, seed_lecturer, seed_student, setup_test_db};

const CENTER: Coordinate = Coordinate {
    latitude: 40.7128,
    longitude: -74.0060,
};

#[tokio::test]
async fn marking_locks_the_device_to_the_student() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, alice) = seed_student(&db, "S100").await;
    let (_, bob) = seed_student(&db, "S200").await;

    attendance_record::Model::mark(&db, alice.id, "shared-device", session.id, CENTER)
        .await
        .unwrap();

    // Same device, different student: denied while the session is active.
    let err = attendance_record::Model::mark(&db, bob.id, "shared-device", session.id, CENTER)
        .await
        .expect_err("second student on the same device should be denied");
    assert!(matches!(err, AttendanceError::Forbidden(_)));

    // The lock holder is unaffected by their own lock.
    let admission = device_lock::Model::check_admission(&db, "shared-device", alice.id)
        .await
        .unwrap();
    assert_eq!(admission, device_lock::Admission::Allowed);
}

#[tokio::test]
async fn closing_the_session_releases_its_locks() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, alice) = seed_student(&db, "S100").await;
    let (_, bob) = seed_student(&db, "S200").await;

    attendance_record::Model::mark(&db, alice.id, "shared-device", session.id, CENTER)
        .await
        .unwrap();

    let denied = device_lock::Model::check_admission(&db, "shared-device", bob.id)
        .await
        .unwrap();
    assert!(matches!(denied, device_lock::Admission::Denied { .. }));

    attendance_session::Model::close(&db, lecturer.id, session.id)
        .await
        .unwrap();

    let allowed = device_lock::Model::check_admission(&db, "shared-device", bob.id)
        .await
        .unwrap();
    assert_eq!(allowed, device_lock::Admission::Allowed);
}

#[tokio::test]
async fn a_different_device_is_never_affected() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, alice) = seed_student(&db, "S100").await;
    let (_, bob) = seed_student(&db, "S200").await;

    attendance_record::Model::mark(&db, alice.id, "device-a", session.id, CENTER)
        .await
        .unwrap();

    attendance_record::Model::mark(&db, bob.id, "device-b", session.id, CENTER)
        .await
        .expect("a different device should be admitted");
}

#[tokio::test]
async fn ensure_is_idempotent_for_the_same_student() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, alice) = seed_student(&db, "S100").await;
    let (_, bob) = seed_student(&db, "S200").await;

    device_lock::Model::ensure(&db, session.id, alice.id, "dev")
        .await
        .unwrap();
    device_lock::Model::ensure(&db, session.id, alice.id, "dev")
        .await
        .expect("re-ensuring the same lock should be a no-op");

    let err = device_lock::Model::ensure(&db, session.id, bob.id, "dev")
        .await
        .expect_err("a second student must not take over the lock");
    assert!(matches!(err, AttendanceError::Forbidden(_)));
}

#[tokio::test]
async fn release_all_reports_released_count() {
    let db = setup_test_db().await;
    let (_, lecturer) = seed_lecturer(&db, "EMP001").await;
    let course = seed_course(&db, lecturer.id, "COS101").await;
    let session = attendance_session::Model::create(&db, lecturer.id, course.id, CENTER, 50.0)
        .await
        .unwrap();
    let (_, alice) = seed_student(&db, "S100").await;
    let (_, bob) = seed_student(&db, "S200").await;

    device_lock::Model::ensure(&db, session.id, alice.id, "dev-a")
        .await
        .unwrap();
    device_lock::Model::ensure(&db, session.id, bob.id, "dev-b")
        .await
        .unwrap();

    let released = device_lock::Model::release_all(&db, session.id).await.unwrap();
    assert_eq!(released, 2);

    // Second pass finds nothing active.
    let released = device_lock::Model::release_all(&db, session.id).await.unwrap();
    assert_eq!(released, 0);
}
