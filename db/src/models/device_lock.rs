use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, JoinType, QuerySelect, Set, SqlErr,
};
use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::AttendanceError;
use crate::models::attendance_session;

const LOCKED_TO_OTHER: &str =
    "This device is currently locked to another student for an active attendance session";

/// Binds one device to one student for the lifetime of an active session.
///
/// A lock is created the moment a student marks attendance and released when
/// the session closes. While it exists, no other student can act through the
/// same device for that session.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "device_session_locks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    pub student_id: i64,
    pub device_id: String,
    pub status: LockStatus,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "lock_status_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LockStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "released")]
    Released,
}

/// Outcome of a device admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { reason: String },
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_session::Entity",
        from = "Column::SessionId",
        to = "super::attendance_session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Is this device free for `student_id` to act through?
    ///
    /// Denied when an active lock for the same device exists on any active
    /// session and belongs to a different student. Locks on closed sessions
    /// are released and never count.
    pub async fn check_admission(
        db: &DatabaseConnection,
        device_id: &str,
        student_id: i64,
    ) -> Result<Admission, AttendanceError> {
        let holder = Entity::find()
            .join(JoinType::InnerJoin, Relation::Session.def())
            .filter(Column::DeviceId.eq(device_id))
            .filter(Column::Status.eq(LockStatus::Active))
            .filter(Column::StudentId.ne(student_id))
            .filter(
                attendance_session::Column::Status.eq(attendance_session::Status::Active),
            )
            .one(db)
            .await?;

        match holder {
            Some(_) => Ok(Admission::Denied {
                reason: LOCKED_TO_OTHER.to_string(),
            }),
            None => Ok(Admission::Allowed),
        }
    }

    /// Creates the lock for (session, device) if it does not exist yet.
    ///
    /// Idempotent for the same student. If another student grabbed the pair
    /// first (a race the admission pre-check cannot rule out), this fails,
    /// which rolls back the caller's transaction.
    pub async fn ensure<C: ConnectionTrait>(
        conn: &C,
        session_id: i64,
        student_id: i64,
        device_id: &str,
    ) -> Result<(), AttendanceError> {
        let insert = ActiveModel {
            session_id: Set(session_id),
            student_id: Set(student_id),
            device_id: Set(device_id.to_owned()),
            status: Set(LockStatus::Active),
            created_at: Set(Utc::now()),
            released_at: Set(None),
            ..Default::default()
        }
        .insert(conn)
        .await;

        match insert {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                let existing = Entity::find()
                    .filter(Column::SessionId.eq(session_id))
                    .filter(Column::DeviceId.eq(device_id))
                    .one(conn)
                    .await?;
                match existing {
                    Some(lock) if lock.student_id == student_id => Ok(()),
                    _ => Err(AttendanceError::forbidden(LOCKED_TO_OTHER)),
                }
            }
            Err(err) => Err(AttendanceError::Db(err)),
        }
    }

    /// Releases every active lock held by a session. Returns how many were
    /// released.
    pub async fn release_all<C: ConnectionTrait>(
        conn: &C,
        session_id: i64,
    ) -> Result<u64, AttendanceError> {
        let result = Entity::update_many()
            .set(ActiveModel {
                status: Set(LockStatus::Released),
                released_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(LockStatus::Active))
            .exec(conn)
            .await?;

        Ok(result.rows_affected)
    }
}
