//! Directory instance entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Federation software family an instance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    /// Mastodon and API-compatible servers (Pleroma, Akkoma, ...).
    #[sea_orm(string_value = "mastodon")]
    Mastodon,
    /// Misskey and its forks.
    #[sea_orm(string_value = "misskey")]
    Misskey,
}

impl PlatformFamily {
    /// Parse a submitted platform tag. Unknown tags yield `None`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "mastodon" => Some(Self::Mastodon),
            "misskey" => Some(Self::Misskey),
            _ => None,
        }
    }

    /// The tag stored and accepted over the API.
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Mastodon => "mastodon",
            Self::Misskey => "misskey",
        }
    }
}

impl std::fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// An instance listed in the directory.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Hostname of the instance (unique identifier).
    #[sea_orm(unique)]
    pub uri: String,

    /// Instance title captured at onboarding.
    pub name: String,

    /// Free-form directory category chosen by the submitter.
    #[sea_orm(nullable)]
    pub category: Option<String>,

    /// Which API family is used to probe this instance.
    pub platform: PlatformFamily,

    /// Content-policy flag chosen by the submitter.
    pub nsfw_flag: String,

    /// Whether the administrator completed the verification challenge.
    #[sea_orm(default_value = false)]
    pub verified: bool,

    /// Consecutive failed health probes.
    #[sea_orm(default_value = 0)]
    pub failed_checks: i32,

    #[sea_orm(default_value = false)]
    pub banned: bool,

    #[sea_orm(nullable)]
    pub ban_reason: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::instance_data::Entity")]
    InstanceData,
    #[sea_orm(has_one = "super::api_key::Entity")]
    ApiKey,
}

impl Related<super::instance_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InstanceData.def()
    }
}

impl Related<super::api_key::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiKey.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
