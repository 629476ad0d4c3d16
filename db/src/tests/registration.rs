use sea_orm::{EntityTrait, PaginatorTrait};

use crate::error::AttendanceError;
use crate::models::user::{self, CreateLecturer, RegisterStudent, Role};
use crate::models::{lecturer, student};
use crate::test_utils::setup_test_db;

fn student_payload() -> RegisterStudent {
    RegisterStudent {
        email: "alice@student.test".to_string(),
        password: "password123".to_string(),
        index_number: "S100".to_string(),
        full_name: "Alice Example".to_string(),
    }
}

#[tokio::test]
async fn register_student_creates_credential_and_profile() {
    let db = setup_test_db().await;

    let (account, profile) = user::Model::register_student(&db, student_payload())
        .await
        .unwrap();

    assert_eq!(account.role, Role::Student);
    assert_eq!(profile.user_id, account.id);
    assert_eq!(profile.index_number, "S100");
    assert!(account.verify_password("password123"));
    assert!(!account.verify_password("wrong-password"));
    assert_ne!(account.password_hash, "password123");
}

#[tokio::test]
async fn register_student_rejects_bad_input() {
    let db = setup_test_db().await;

    let mut payload = student_payload();
    payload.password = "short".to_string();
    let err = user::Model::register_student(&db, payload)
        .await
        .expect_err("short password should be rejected");
    assert!(
        matches!(err, AttendanceError::Validation(ref msg) if msg == "Password must be at least 8 characters")
    );

    let mut payload = student_payload();
    payload.email = "not-an-email".to_string();
    let err = user::Model::register_student(&db, payload)
        .await
        .expect_err("malformed email should be rejected");
    assert!(matches!(err, AttendanceError::Validation(ref msg) if msg == "Invalid email format"));
}

#[tokio::test]
async fn duplicate_email_or_index_leaves_no_partial_rows() {
    let db = setup_test_db().await;
    user::Model::register_student(&db, student_payload())
        .await
        .unwrap();

    let mut same_email = student_payload();
    same_email.index_number = "S999".to_string();
    let err = user::Model::register_student(&db, same_email)
        .await
        .expect_err("duplicate email should conflict");
    assert!(matches!(err, AttendanceError::Conflict(ref msg) if msg == "Email already registered"));

    let mut same_index = student_payload();
    same_index.email = "bob@student.test".to_string();
    let err = user::Model::register_student(&db, same_index)
        .await
        .expect_err("duplicate index number should conflict");
    assert!(
        matches!(err, AttendanceError::Conflict(ref msg) if msg == "Index number already registered")
    );

    // The failed attempts must not leave orphaned credential rows behind.
    assert_eq!(user::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(student::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn create_lecturer_enforces_unique_employee_id() {
    let db = setup_test_db().await;

    let payload = CreateLecturer {
        full_name: "Grace Hopper".to_string(),
        email: "grace@uni.test".to_string(),
        employee_id: "EMP001".to_string(),
        department: "Computer Science".to_string(),
        phone: Some("555-0100".to_string()),
        password: "password123".to_string(),
    };
    let (account, profile) = user::Model::create_lecturer(&db, payload.clone())
        .await
        .unwrap();
    assert_eq!(account.role, Role::Lecturer);
    assert_eq!(profile.employee_id, "EMP001");

    let mut duplicate = payload;
    duplicate.email = "other@uni.test".to_string();
    let err = user::Model::create_lecturer(&db, duplicate)
        .await
        .expect_err("duplicate employee id should conflict");
    assert!(matches!(err, AttendanceError::Conflict(ref msg) if msg == "Employee ID already exists"));

    assert_eq!(lecturer::Entity::find().count(&db).await.unwrap(), 1);
}
