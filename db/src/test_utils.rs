//! Shared test fixtures: isolated in-memory databases plus seeded accounts.
//!
//! Every call to [`setup_test_db`] yields a private database with the full
//! schema applied, so tests never observe each other's state. The seed
//! helpers go through the real registration paths, not raw inserts, so
//! fixtures carry properly hashed passwords and linked profile rows.

use migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::models::{course, lecturer, student, user};

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub async fn seed_lecturer(
    db: &DatabaseConnection,
    employee_id: &str,
) -> (user::Model, lecturer::Model) {
    user::Model::create_lecturer(
        db,
        user::CreateLecturer {
            full_name: format!("Lecturer {employee_id}"),
            email: format!("{employee_id}@uni.test"),
            employee_id: employee_id.to_string(),
            department: "Computer Science".to_string(),
            phone: None,
            password: "password123".to_string(),
        },
    )
    .await
    .expect("failed to seed lecturer")
}

pub async fn seed_course(
    db: &DatabaseConnection,
    lecturer_id: i64,
    code: &str,
) -> course::Model {
    course::Model::create(db, code, &format!("Course {code}"), lecturer_id)
        .await
        .expect("failed to seed course")
}

pub async fn seed_student(
    db: &DatabaseConnection,
    index_number: &str,
) -> (user::Model, student::Model) {
    user::Model::register_student(
        db,
        user::RegisterStudent {
            email: format!("{index_number}@student.test"),
            password: "password123".to_string(),
            index_number: index_number.to_string(),
            full_name: format!("Student {index_number}"),
        },
    )
    .await
    .expect("failed to seed student")
}
