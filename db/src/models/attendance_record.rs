use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait};
use serde::Serialize;
use util::geo::{self, Coordinate, ZoneCheck};

use crate::error::AttendanceError;
use crate::models::{attendance_session, course, device_lock};

/// One student's mark for one session.
///
/// The (session, student) pair is the primary key, so the table itself
/// guarantees at most one mark per student per session.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
    /// Coordinates the student reported when marking.
    pub lat_recorded: f64,
    pub long_recorded: f64,
    /// Haversine distance from the session center, in meters, at mark time.
    pub distance_from_center: f64,
    pub marked_at: DateTime<Utc>,
}

/// Attended/absent flag for reports and history. Derived, never stored: a
/// record row means attended, its absence means absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Attended,
    Absent,
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

/// One line of a student's own attendance history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRow {
    pub session_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub started_at: DateTime<Utc>,
    pub status: AttendanceStatus,
    pub marked_at: Option<DateTime<Utc>>,
    pub distance_from_center: Option<f64>,
}

impl Model {
    /// Marks attendance for `student_id` in `session_id`.
    ///
    /// Order of checks: the session must be active, the reported position
    /// must fall inside the geofence (boundary inclusive), and the device
    /// must not already be locked to a different student for an active
    /// session. The insert and the device lock then happen in one
    /// transaction; a concurrent duplicate loses on the primary key rather
    /// than on a racy pre-check.
    pub async fn mark(
        db: &DatabaseConnection,
        student_id: i64,
        device_id: &str,
        session_id: i64,
        position: Coordinate,
    ) -> Result<Model, AttendanceError> {
        let session = attendance_session::Model::get_by_id(db, session_id).await?;
        if session.status != attendance_session::Status::Active {
            return Err(AttendanceError::conflict("Session is not active"));
        }

        match geo::check_zone(session.center(), position, session.radius_meters) {
            ZoneCheck::Inside { .. } => {}
            ZoneCheck::Outside {
                distance_m,
                overage_m,
            } => {
                return Err(AttendanceError::OutOfZone {
                    distance_m,
                    overage_m,
                });
            }
        }

        match device_lock::Model::check_admission(db, device_id, student_id).await? {
            device_lock::Admission::Allowed => {}
            device_lock::Admission::Denied { reason } => {
                return Err(AttendanceError::forbidden(reason));
            }
        }

        let distance = geo::haversine_distance_m(session.center(), position);
        let device_id = device_id.to_owned();

        let record = db
            .transaction::<_, Model, AttendanceError>(move |txn| {
                Box::pin(async move {
                    let record = ActiveModel {
                        session_id: Set(session.id),
                        student_id: Set(student_id),
                        lat_recorded: Set(position.latitude),
                        long_recorded: Set(position.longitude),
                        distance_from_center: Set(distance),
                        marked_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        AttendanceError::conflict_on_unique(
                            e,
                            "You have already marked attendance for this session",
                        )
                    })?;

                    device_lock::Model::ensure(txn, session.id, student_id, &device_id).await?;

                    Ok(record)
                })
            })
            .await?;

        Ok(record)
    }

    /// Sessions within the requested window, newest first, flagged attended
    /// or absent for this student.
    pub async fn student_history(
        db: &DatabaseConnection,
        student_id: i64,
        period: attendance_session::Period,
    ) -> Result<Vec<HistoryRow>, AttendanceError> {
        let mut query = attendance_session::Entity::find()
            .order_by_desc(attendance_session::Column::StartedAt);
        if let Some(cutoff) = period.cutoff(Utc::now()) {
            query = query.filter(attendance_session::Column::StartedAt.gte(cutoff));
        }
        let sessions = query.find_also_related(course::Entity).all(db).await?;

        let marks: HashMap<i64, Model> = Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| (r.session_id, r))
            .collect();

        let rows = sessions
            .into_iter()
            .filter_map(|(session, maybe_course)| {
                let course = maybe_course?;
                let row = match marks.get(&session.id) {
                    Some(mark) => HistoryRow {
                        session_id: session.id,
                        course_code: course.code,
                        course_name: course.name,
                        started_at: session.started_at,
                        status: AttendanceStatus::Attended,
                        marked_at: Some(mark.marked_at),
                        distance_from_center: Some(mark.distance_from_center),
                    },
                    None => HistoryRow {
                        session_id: session.id,
                        course_code: course.code,
                        course_name: course.name,
                        started_at: session.started_at,
                        status: AttendanceStatus::Absent,
                        marked_at: None,
                        distance_from_center: None,
                    },
                };
                Some(row)
            })
            .collect();

        Ok(rows)
    }
}
