use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

use crate::error::AttendanceError;
use crate::models::{lecturer, student};

/// Represents a login credential row in the `users` table.
///
/// Role profiles (`students`, `lecturers`) hang off this 1:1; a user row is
/// only ever created together with its profile, in one transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique email address.
    pub email: String,
    /// Securely hashed password string.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Closed role tag; the matching profile table carries the details.
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Account role. Stored as a string; matched, never string-compared.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "lecturer")]
    Lecturer,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::student::Entity")]
    Student,
    #[sea_orm(has_one = "super::lecturer::Entity")]
    Lecturer,
    #[sea_orm(has_many = "super::user_session::Entity")]
    Sessions,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::lecturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lecturer.def()
    }
}

impl Related<super::user_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for student self-registration.
#[derive(Debug, Clone, Validate, Deserialize)]
pub struct RegisterStudent {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, message = "Index number is required"))]
    pub index_number: String,

    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub full_name: String,
}

/// Payload for lecturer account creation.
#[derive(Debug, Clone, Validate, Deserialize)]
pub struct CreateLecturer {
    #[validate(length(min = 2, message = "Full name must be at least 2 characters"))]
    pub full_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Employee ID is required"))]
    pub employee_id: String,

    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,

    pub phone: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input".to_string())
}

impl Model {
    pub fn hash_password(password: &str) -> Result<String, AttendanceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AttendanceError::Db(DbErr::Custom(format!("password hashing failed: {e}"))))
    }

    pub fn verify_password(&self, password: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    pub async fn find_by_email(
        db: &DatabaseConnection,
        email: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find().filter(Column::Email.eq(email)).one(db).await
    }

    /// Registers a student: the credential row and the profile row are
    /// created in a single transaction, so a failure leaves no partial state.
    pub async fn register_student(
        db: &DatabaseConnection,
        payload: RegisterStudent,
    ) -> Result<(Model, student::Model), AttendanceError> {
        payload
            .validate()
            .map_err(|e| AttendanceError::Validation(first_validation_message(&e)))?;

        let password_hash = Model::hash_password(&payload.password)?;

        let result = db
            .transaction::<_, (Model, student::Model), AttendanceError>(|txn| {
                Box::pin(async move {
                    if Entity::find()
                        .filter(Column::Email.eq(&payload.email))
                        .one(txn)
                        .await?
                        .is_some()
                    {
                        return Err(AttendanceError::conflict("Email already registered"));
                    }

                    if student::Entity::find()
                        .filter(student::Column::IndexNumber.eq(&payload.index_number))
                        .one(txn)
                        .await?
                        .is_some()
                    {
                        return Err(AttendanceError::conflict("Index number already registered"));
                    }

                    let user = ActiveModel {
                        email: Set(payload.email),
                        password_hash: Set(password_hash),
                        role: Set(Role::Student),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        AttendanceError::conflict_on_unique(e, "Email already registered")
                    })?;

                    let profile = student::ActiveModel {
                        user_id: Set(user.id),
                        index_number: Set(payload.index_number),
                        full_name: Set(payload.full_name),
                        phone: Set(None),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        AttendanceError::conflict_on_unique(e, "Index number already registered")
                    })?;

                    Ok((user, profile))
                })
            })
            .await?;

        Ok(result)
    }

    /// Creates a lecturer account; same one-transaction shape as
    /// [`Model::register_student`].
    pub async fn create_lecturer(
        db: &DatabaseConnection,
        payload: CreateLecturer,
    ) -> Result<(Model, lecturer::Model), AttendanceError> {
        payload
            .validate()
            .map_err(|e| AttendanceError::Validation(first_validation_message(&e)))?;

        let password_hash = Model::hash_password(&payload.password)?;

        let result = db
            .transaction::<_, (Model, lecturer::Model), AttendanceError>(|txn| {
                Box::pin(async move {
                    if Entity::find()
                        .filter(Column::Email.eq(&payload.email))
                        .one(txn)
                        .await?
                        .is_some()
                    {
                        return Err(AttendanceError::conflict("Email already registered"));
                    }

                    if lecturer::Entity::find()
                        .filter(lecturer::Column::EmployeeId.eq(&payload.employee_id))
                        .one(txn)
                        .await?
                        .is_some()
                    {
                        return Err(AttendanceError::conflict("Employee ID already exists"));
                    }

                    let user = ActiveModel {
                        email: Set(payload.email),
                        password_hash: Set(password_hash),
                        role: Set(Role::Lecturer),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        AttendanceError::conflict_on_unique(e, "Email already registered")
                    })?;

                    let profile = lecturer::ActiveModel {
                        user_id: Set(user.id),
                        employee_id: Set(payload.employee_id),
                        full_name: Set(payload.full_name),
                        department: Set(payload.department),
                        phone: Set(payload.phone),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        AttendanceError::conflict_on_unique(e, "Employee ID already exists")
                    })?;

                    Ok((user, profile))
                })
            })
            .await?;

        Ok(result)
    }
}
