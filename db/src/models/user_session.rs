use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::Serialize;

use crate::error::AttendanceError;
use crate::models::{lecturer, student, user};

/// An issued bearer token. Tokens are opaque 32-hex-char strings; everything
/// about the holder lives server-side in this row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "user_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    /// Device fingerprint the token was issued to.
    pub device_id: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The resolved holder of a valid token.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    /// Fingerprint of the device the token was issued to, carried through to
    /// every device-sensitive operation.
    pub device_id: String,
    pub principal: Principal,
}

/// Role-specific profile behind an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Student { student_id: i64 },
    Lecturer { lecturer_id: i64 },
}

impl Model {
    /// 16 random bytes, hex-encoded: 32 characters, unguessable, opaque.
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Issues a fresh token for `user_id`, bound to the given device.
    pub async fn issue(
        db: &DatabaseConnection,
        user_id: i64,
        device_id: &str,
        ip_address: Option<String>,
        ttl_seconds: i64,
    ) -> Result<Model, AttendanceError> {
        let now = Utc::now();
        let session = ActiveModel {
            user_id: Set(user_id),
            token: Set(Model::generate_token()),
            device_id: Set(device_id.to_owned()),
            ip_address: Set(ip_address),
            created_at: Set(now),
            expires_at: Set(now + Duration::seconds(ttl_seconds)),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(session)
    }

    /// Resolves a presented token to the identity behind it.
    ///
    /// Unknown, expired, and profile-less tokens all fail with the same
    /// message; callers learn nothing about which case they hit.
    pub async fn resolve(
        db: &DatabaseConnection,
        token: &str,
    ) -> Result<Identity, AttendanceError> {
        let invalid = || AttendanceError::auth("Invalid or expired token");

        let session = Entity::find()
            .filter(Column::Token.eq(token))
            .filter(Column::ExpiresAt.gt(Utc::now()))
            .one(db)
            .await?
            .ok_or_else(invalid)?;

        let account = user::Entity::find_by_id(session.user_id)
            .one(db)
            .await?
            .ok_or_else(invalid)?;

        let principal = match account.role {
            user::Role::Student => {
                let profile = student::Model::find_by_user_id(db, account.id)
                    .await?
                    .ok_or_else(invalid)?;
                Principal::Student {
                    student_id: profile.id,
                }
            }
            user::Role::Lecturer => {
                let profile = lecturer::Model::find_by_user_id(db, account.id)
                    .await?
                    .ok_or_else(invalid)?;
                Principal::Lecturer {
                    lecturer_id: profile.id,
                }
            }
        };

        Ok(Identity {
            user_id: account.id,
            email: account.email,
            device_id: session.device_id,
            principal,
        })
    }

    /// Deletes the session behind a token. Revoking an unknown token is a
    /// no-op.
    pub async fn revoke(db: &DatabaseConnection, token: &str) -> Result<(), AttendanceError> {
        Entity::delete_many()
            .filter(Column::Token.eq(token))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Drops every expired session row. Returns how many were removed.
    pub async fn cleanup_expired(db: &DatabaseConnection) -> Result<u64, AttendanceError> {
        let result = Entity::delete_many()
            .filter(Column::ExpiresAt.lte(Utc::now()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
