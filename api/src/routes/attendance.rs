//! POST /api/attendance — session lifecycle, marking, and reporting.
//!
//! The bearer token rides in the body with the action. Role authorization is
//! pattern matching on the resolved principal: a student hitting a lecturer
//! action is an unmatched arm, answered 403 by the gate.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use db::models::attendance_record::{self, HistoryRow};
use db::models::attendance_session::{
    self, ActiveSessionRow, LecturerSessionRow, Period, SessionReportRow,
};
use util::geo::Coordinate;
use util::state::AppState;

use crate::auth;
use crate::error::ApiError;
use crate::response::ApiResponse;

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AttendanceAction {
    CreateSession {
        token: String,
        course_id: i64,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    },
    EndSession {
        token: String,
        session_id: i64,
    },
    GetActiveSessions {
        token: String,
    },
    MarkAttendance {
        token: String,
        session_id: i64,
        latitude: f64,
        longitude: f64,
    },
    StudentHistory {
        token: String,
        period: Period,
    },
    LecturerSessions {
        token: String,
        period: Period,
    },
    SessionReport {
        token: String,
        session_id: i64,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionCreatedData {
    session_id: i64,
}

#[derive(Serialize)]
struct ActiveSessionsData {
    sessions: Vec<ActiveSessionRow>,
}

#[derive(Serialize)]
struct HistoryData {
    history: Vec<HistoryRow>,
}

#[derive(Serialize)]
struct LecturerSessionsData {
    sessions: Vec<LecturerSessionRow>,
}

#[derive(Serialize)]
struct ReportData {
    report: Vec<SessionReportRow>,
}

pub async fn dispatch(
    State(state): State<AppState>,
    payload: Result<Json<AttendanceAction>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(action) = payload?;
    let db = state.db();

    match action {
        AttendanceAction::CreateSession {
            token,
            course_id,
            latitude,
            longitude,
            radius_meters,
        } => {
            let identity = auth::authenticate(db, &token).await?;
            let lecturer_id = auth::require_lecturer(&identity)?;

            let session = attendance_session::Model::create(
                db,
                lecturer_id,
                course_id,
                Coordinate {
                    latitude,
                    longitude,
                },
                radius_meters,
            )
            .await?;

            Ok(Json(ApiResponse::success(
                SessionCreatedData {
                    session_id: session.id,
                },
                "Session created successfully",
            ))
            .into_response())
        }

        AttendanceAction::EndSession { token, session_id } => {
            let identity = auth::authenticate(db, &token).await?;
            let lecturer_id = auth::require_lecturer(&identity)?;

            attendance_session::Model::close(db, lecturer_id, session_id).await?;
            Ok(Json(ApiResponse::ok("Session closed successfully")).into_response())
        }

        AttendanceAction::GetActiveSessions { token } => {
            let identity = auth::authenticate(db, &token).await?;
            auth::require_student(&identity)?;

            let sessions = attendance_session::Model::list_active(db).await?;
            Ok(Json(ApiResponse::success(
                ActiveSessionsData { sessions },
                "Active sessions retrieved",
            ))
            .into_response())
        }

        AttendanceAction::MarkAttendance {
            token,
            session_id,
            latitude,
            longitude,
        } => {
            let identity = auth::authenticate(db, &token).await?;
            let student_id = auth::require_student(&identity)?;

            // The device identity is the one the token was issued to, not
            // anything the client can put in the body.
            attendance_record::Model::mark(
                db,
                student_id,
                &identity.device_id,
                session_id,
                Coordinate {
                    latitude,
                    longitude,
                },
            )
            .await?;

            Ok(Json(ApiResponse::ok("Attendance marked successfully")).into_response())
        }

        AttendanceAction::StudentHistory { token, period } => {
            let identity = auth::authenticate(db, &token).await?;
            let student_id = auth::require_student(&identity)?;

            let history =
                attendance_record::Model::student_history(db, student_id, period).await?;
            Ok(Json(ApiResponse::success(
                HistoryData { history },
                "Attendance history retrieved",
            ))
            .into_response())
        }

        AttendanceAction::LecturerSessions { token, period } => {
            let identity = auth::authenticate(db, &token).await?;
            let lecturer_id = auth::require_lecturer(&identity)?;

            let sessions =
                attendance_session::Model::lecturer_sessions(db, lecturer_id, period).await?;
            Ok(Json(ApiResponse::success(
                LecturerSessionsData { sessions },
                "Sessions retrieved",
            ))
            .into_response())
        }

        AttendanceAction::SessionReport { token, session_id } => {
            let identity = auth::authenticate(db, &token).await?;
            let lecturer_id = auth::require_lecturer(&identity)?;

            let report =
                attendance_session::Model::session_report(db, lecturer_id, session_id).await?;
            Ok(Json(ApiResponse::success(
                ReportData { report },
                "Session report retrieved",
            ))
            .into_response())
        }
    }
}
