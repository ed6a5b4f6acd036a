//! Latest fetched metadata for a directory instance.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot fields from the most recent successful probe.
/// Each instance has exactly one row, overwritten wholesale on every probe.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "instance_data")]
pub struct Model {
    /// Same as instances.id (1:1 relationship)
    #[sea_orm(primary_key, auto_increment = false)]
    pub instance_id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Thumbnail URL as reported by the instance.
    #[sea_orm(nullable)]
    pub thumbnail: Option<String>,

    pub user_count: i64,

    pub status_count: i64,

    /// Administrator username, or "null" when the platform does not expose one.
    pub contact_handle: String,

    pub registrations: bool,

    pub approval_required: bool,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::instance::Entity",
        from = "Column::InstanceId",
        to = "super::instance::Column::Id",
        on_delete = "Cascade"
    )]
    Instance,
}

impl Related<super::instance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
