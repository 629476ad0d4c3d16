use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, QueryOrder, Set};
use serde::Serialize;

use crate::error::AttendanceError;

/// A taught course. Attendance sessions are always opened against a course,
/// and only by the lecturer who owns it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub code: String,
    pub name: String,
    pub lecturer_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lecturer::Entity",
        from = "Column::LecturerId",
        to = "super::lecturer::Column::Id"
    )]
    Lecturer,
    #[sea_orm(has_many = "super::attendance_session::Entity")]
    Sessions,
}

impl Related<super::lecturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lecturer.def()
    }
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        code: &str,
        name: &str,
        lecturer_id: i64,
    ) -> Result<Model, AttendanceError> {
        if code.trim().is_empty() {
            return Err(AttendanceError::validation("Course code is required"));
        }
        if name.trim().is_empty() {
            return Err(AttendanceError::validation("Course name is required"));
        }

        ActiveModel {
            code: Set(code.trim().to_owned()),
            name: Set(name.trim().to_owned()),
            lecturer_id: Set(lecturer_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| AttendanceError::conflict_on_unique(e, "Course code already exists"))
    }

    pub async fn get_by_id(db: &DatabaseConnection, id: i64) -> Result<Model, AttendanceError> {
        Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AttendanceError::not_found("Course not found"))
    }

    pub async fn for_lecturer(
        db: &DatabaseConnection,
        lecturer_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::LecturerId.eq(lecturer_id))
            .order_by_asc(Column::Code)
            .all(db)
            .await
    }
}
