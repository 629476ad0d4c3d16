use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, PaginatorTrait, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use util::geo::Coordinate;

use crate::error::AttendanceError;
use crate::models::{attendance_record, course, device_lock, lecturer, student};

/// A geofenced attendance window for one course.
///
/// The geofence is frozen at creation: center and radius never change for the
/// lifetime of the session. Closing is the only state transition.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub status: Status,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "session_status_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// History window for lecturer session listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Period {
    All,
    Week,
    Month,
}

impl Period {
    /// Earliest `started_at` included by this window, or `None` for no bound.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::All => None,
            Period::Week => Some(now - Duration::days(7)),
            Period::Month => Some(now - Duration::days(30)),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
    #[sea_orm(has_many = "super::device_lock::Entity")]
    DeviceLocks,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl Related<super::device_lock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceLocks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// One row of the active-session listing shown to students.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSessionRow {
    pub id: i64,
    pub course_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub lecturer_employee_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub started_at: DateTime<Utc>,
}

/// One row of a lecturer's session history, with per-session counts.
#[derive(Debug, Clone, Serialize)]
pub struct LecturerSessionRow {
    pub id: i64,
    pub course_code: String,
    pub course_name: String,
    pub status: Status,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub attendance_count: u64,
    pub total_students: u64,
}

/// One student line of a per-session report.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReportRow {
    pub index_number: String,
    pub full_name: String,
    pub status: attendance_record::AttendanceStatus,
    pub marked_at: Option<DateTime<Utc>>,
    pub distance_from_center: Option<f64>,
}

impl Model {
    /// Opens an attendance session for `course_id` with the given geofence.
    ///
    /// Only the lecturer who owns the course may open one. Geometry is
    /// validated up front so a session row can never carry an unusable fence.
    pub async fn create(
        db: &DatabaseConnection,
        lecturer_id: i64,
        course_id: i64,
        center: Coordinate,
        radius_meters: f64,
    ) -> Result<Model, AttendanceError> {
        if !(-90.0..=90.0).contains(&center.latitude) {
            return Err(AttendanceError::validation("Invalid latitude"));
        }
        if !(-180.0..=180.0).contains(&center.longitude) {
            return Err(AttendanceError::validation("Invalid longitude"));
        }
        if !(10.0..=10_000.0).contains(&radius_meters) {
            return Err(AttendanceError::validation(
                "Radius must be between 10m and 10km",
            ));
        }

        let course = course::Model::get_by_id(db, course_id).await?;
        if course.lecturer_id != lecturer_id {
            return Err(AttendanceError::forbidden(
                "You can only start sessions for your own courses",
            ));
        }

        let session = ActiveModel {
            course_id: Set(course_id),
            latitude: Set(center.latitude),
            longitude: Set(center.longitude),
            radius_meters: Set(radius_meters),
            status: Set(Status::Active),
            started_at: Set(Utc::now()),
            ended_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(session)
    }

    pub async fn get_by_id(db: &DatabaseConnection, id: i64) -> Result<Model, AttendanceError> {
        Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AttendanceError::not_found("Session not found"))
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// All currently active sessions, newest first, with course and lecturer
    /// details attached.
    pub async fn list_active(
        db: &DatabaseConnection,
    ) -> Result<Vec<ActiveSessionRow>, AttendanceError> {
        let sessions = Entity::find()
            .filter(Column::Status.eq(Status::Active))
            .filter(Column::StartedAt.lte(Utc::now()))
            .order_by_desc(Column::StartedAt)
            .find_also_related(course::Entity)
            .all(db)
            .await?;

        let lecturer_ids: Vec<i64> = sessions
            .iter()
            .filter_map(|(_, c)| c.as_ref().map(|c| c.lecturer_id))
            .collect();

        let lecturers: HashMap<i64, lecturer::Model> = lecturer::Entity::find()
            .filter(lecturer::Column::Id.is_in(lecturer_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        let rows = sessions
            .into_iter()
            .filter_map(|(session, maybe_course)| {
                let course = maybe_course?;
                let employee_id = lecturers
                    .get(&course.lecturer_id)
                    .map(|l| l.employee_id.clone())
                    .unwrap_or_default();
                Some(ActiveSessionRow {
                    id: session.id,
                    course_id: course.id,
                    course_code: course.code,
                    course_name: course.name,
                    lecturer_employee_id: employee_id,
                    latitude: session.latitude,
                    longitude: session.longitude,
                    radius_meters: session.radius_meters,
                    started_at: session.started_at,
                })
            })
            .collect();

        Ok(rows)
    }

    /// Closes the session and releases every device lock it holds, in one
    /// transaction. Closing an already-closed session is a no-op that keeps
    /// the original `ended_at`.
    pub async fn close(
        db: &DatabaseConnection,
        lecturer_id: i64,
        session_id: i64,
    ) -> Result<Model, AttendanceError> {
        let session = Model::get_by_id(db, session_id).await?;
        let course = course::Model::get_by_id(db, session.course_id).await?;
        if course.lecturer_id != lecturer_id {
            return Err(AttendanceError::forbidden(
                "You can only close sessions for your own courses",
            ));
        }

        if session.status == Status::Closed {
            return Ok(session);
        }

        let closed = db
            .transaction::<_, Model, AttendanceError>(move |txn| {
                Box::pin(async move {
                    let mut active: ActiveModel = session.into();
                    active.status = Set(Status::Closed);
                    active.ended_at = Set(Some(Utc::now()));
                    let updated = active.update(txn).await?;

                    let released = device_lock::Model::release_all(txn, updated.id).await?;
                    tracing::info!("closed session {}, released {released} device locks", updated.id);

                    Ok(updated)
                })
            })
            .await?;

        Ok(closed)
    }

    /// Session history for one lecturer's courses, with per-session marked
    /// counts and the size of the student body at report time.
    ///
    /// Counts are built in two grouped passes instead of one wide join, so a
    /// session with many marks can never inflate the student total.
    pub async fn lecturer_sessions(
        db: &DatabaseConnection,
        lecturer_id: i64,
        period: Period,
    ) -> Result<Vec<LecturerSessionRow>, AttendanceError> {
        let courses: HashMap<i64, course::Model> =
            course::Model::for_lecturer(db, lecturer_id)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect();

        if courses.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = Entity::find()
            .filter(Column::CourseId.is_in(courses.keys().copied().collect::<Vec<_>>()))
            .order_by_desc(Column::StartedAt);
        if let Some(cutoff) = period.cutoff(Utc::now()) {
            query = query.filter(Column::StartedAt.gte(cutoff));
        }
        let sessions = query.all(db).await?;

        let session_ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
        let mut counts: HashMap<i64, u64> = HashMap::new();
        for record in attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.is_in(session_ids))
            .all(db)
            .await?
        {
            *counts.entry(record.session_id).or_insert(0) += 1;
        }

        let total_students = student::Entity::find().count(db).await?;

        let rows = sessions
            .into_iter()
            .filter_map(|session| {
                let course = courses.get(&session.course_id)?;
                Some(LecturerSessionRow {
                    id: session.id,
                    course_code: course.code.clone(),
                    course_name: course.name.clone(),
                    status: session.status,
                    started_at: session.started_at,
                    ended_at: session.ended_at,
                    attendance_count: counts.get(&session.id).copied().unwrap_or(0),
                    total_students,
                })
            })
            .collect();

        Ok(rows)
    }

    /// Per-session attendance report: every registered student, marked or
    /// not, ordered by name.
    pub async fn session_report(
        db: &DatabaseConnection,
        lecturer_id: i64,
        session_id: i64,
    ) -> Result<Vec<SessionReportRow>, AttendanceError> {
        let session = Model::get_by_id(db, session_id).await?;
        let course = course::Model::get_by_id(db, session.course_id).await?;
        if course.lecturer_id != lecturer_id {
            return Err(AttendanceError::forbidden(
                "You can only view reports for your own courses",
            ));
        }

        let records: HashMap<i64, attendance_record::Model> = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session_id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| (r.student_id, r))
            .collect();

        let students = student::Entity::find()
            .order_by_asc(student::Column::FullName)
            .all(db)
            .await?;

        let rows = students
            .into_iter()
            .map(|s| match records.get(&s.id) {
                Some(record) => SessionReportRow {
                    index_number: s.index_number,
                    full_name: s.full_name,
                    status: attendance_record::AttendanceStatus::Attended,
                    marked_at: Some(record.marked_at),
                    distance_from_center: Some(record.distance_from_center),
                },
                None => SessionReportRow {
                    index_number: s.index_number,
                    full_name: s.full_name,
                    status: attendance_record::AttendanceStatus::Absent,
                    marked_at: None,
                    distance_from_center: None,
                },
            })
            .collect();

        Ok(rows)
    }
}
