//! POST /api/auth — account and token actions.
//!
//! One endpoint, one closed action enum. Each variant carries exactly the
//! fields its action needs; a missing field fails deserialization with a
//! message naming it.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use db::error::AttendanceError;
use db::models::user::{self, CreateLecturer, RegisterStudent, Role};
use db::models::user_session::{self, Principal};
use db::models::{device_lock, lecturer, student};
use sea_orm::EntityTrait;
use util::{config, state::AppState};

use crate::auth::{self, device};
use crate::error::ApiError;
use crate::response::ApiResponse;

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AuthAction {
    Register {
        email: String,
        password: String,
        index_number: String,
        full_name: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout {
        token: String,
    },
    Verify {
        token: String,
    },
    CurrentUser {
        token: String,
    },
    CreateLecturer {
        token: String,
        full_name: String,
        email: String,
        employee_id: String,
        department: String,
        #[serde(default)]
        phone: Option<String>,
        password: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredData {
    user_id: i64,
    student_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    token: String,
    role: Role,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyData {
    role: Role,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUserData {
    email: String,
    role: Role,
    full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    department: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LecturerCreatedData {
    user_id: i64,
    lecturer_id: i64,
}

pub async fn dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AuthAction>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(action) = payload?;
    let db = state.db();

    match action {
        AuthAction::Register {
            email,
            password,
            index_number,
            full_name,
        } => {
            let (account, profile) = user::Model::register_student(
                db,
                RegisterStudent {
                    email,
                    password,
                    index_number,
                    full_name,
                },
            )
            .await?;

            Ok(Json(ApiResponse::success(
                RegisteredData {
                    user_id: account.id,
                    student_id: profile.id,
                },
                "Registration successful",
            ))
            .into_response())
        }

        AuthAction::Login { email, password } => {
            let account = user::Model::find_by_email(db, &email)
                .await
                .map_err(AttendanceError::from)?
                .ok_or_else(|| AttendanceError::auth("Invalid email or password"))?;
            if !account.verify_password(&password) {
                return Err(AttendanceError::auth("Invalid email or password").into());
            }

            let device_id = device::fingerprint(&headers);

            // A device locked to another student under an active session
            // cannot be used to log a different student in.
            if account.role == Role::Student {
                let profile = student::Model::find_by_user_id(db, account.id)
                    .await
                    .map_err(AttendanceError::from)?
                    .ok_or_else(|| AttendanceError::auth("Invalid email or password"))?;
                match device_lock::Model::check_admission(db, &device_id, profile.id).await? {
                    device_lock::Admission::Allowed => {}
                    device_lock::Admission::Denied { reason } => {
                        return Err(AttendanceError::forbidden(reason).into());
                    }
                }
            }

            let session = user_session::Model::issue(
                db,
                account.id,
                &device_id,
                device::client_ip(&headers),
                config::token_ttl_seconds() as i64,
            )
            .await?;

            Ok(Json(ApiResponse::success(
                LoginData {
                    token: session.token,
                    role: account.role,
                    expires_at: session.expires_at,
                },
                "Login successful",
            ))
            .into_response())
        }

        AuthAction::Logout { token } => {
            user_session::Model::revoke(db, &token).await?;
            Ok(Json(ApiResponse::ok("Logged out successfully")).into_response())
        }

        AuthAction::Verify { token } => {
            let identity = auth::authenticate(db, &token).await?;
            let role = match identity.principal {
                Principal::Student { .. } => Role::Student,
                Principal::Lecturer { .. } => Role::Lecturer,
            };
            Ok(Json(ApiResponse::success(VerifyData { role }, "Token is valid")).into_response())
        }

        AuthAction::CurrentUser { token } => {
            let identity = auth::authenticate(db, &token).await?;
            let data = match identity.principal {
                Principal::Student { student_id } => {
                    let profile = student::Entity::find_by_id(student_id)
                        .one(db)
                        .await
                        .map_err(AttendanceError::from)?
                        .ok_or_else(|| AttendanceError::auth("Invalid or expired token"))?;
                    CurrentUserData {
                        email: identity.email,
                        role: Role::Student,
                        full_name: profile.full_name,
                        index_number: Some(profile.index_number),
                        employee_id: None,
                        department: None,
                    }
                }
                Principal::Lecturer { lecturer_id } => {
                    let profile = lecturer::Entity::find_by_id(lecturer_id)
                        .one(db)
                        .await
                        .map_err(AttendanceError::from)?
                        .ok_or_else(|| AttendanceError::auth("Invalid or expired token"))?;
                    CurrentUserData {
                        email: identity.email,
                        role: Role::Lecturer,
                        full_name: profile.full_name,
                        index_number: None,
                        employee_id: Some(profile.employee_id),
                        department: Some(profile.department),
                    }
                }
            };
            Ok(Json(ApiResponse::success(data, "User retrieved successfully")).into_response())
        }

        AuthAction::CreateLecturer {
            token,
            full_name,
            email,
            employee_id,
            department,
            phone,
            password,
        } => {
            let identity = auth::authenticate(db, &token).await?;
            auth::require_lecturer(&identity)?;

            let (account, profile) = user::Model::create_lecturer(
                db,
                CreateLecturer {
                    full_name,
                    email,
                    employee_id,
                    department,
                    phone,
                    password,
                },
            )
            .await?;

            Ok(Json(ApiResponse::success(
                LecturerCreatedData {
                    user_id: account.id,
                    lecturer_id: profile.id,
                },
                "Lecturer account created successfully",
            ))
            .into_response())
        }
    }
}
