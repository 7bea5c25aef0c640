//! Idea entity - a candidate activity stored in a jar.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moderation status of an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdeaStatus {
    /// In the candidate pool.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Waiting for admin approval.
    #[sea_orm(string_value = "pending")]
    Pending,
}

impl Default for IdeaStatus {
    fn default() -> Self {
        Self::Approved
    }
}

/// Idea entity.
///
/// Soft-consumed by stamping `selected_at`; hard-deleted by its author or a
/// jar admin.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "idea")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub jar_id: String,

    /// Member who suggested the idea.
    #[sea_orm(indexed)]
    pub created_by_id: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Free-form category, loosely guided by the jar topic.
    #[sea_orm(nullable)]
    pub category: Option<String>,

    /// Rough cost indicator, 1 (cheap) to 3 (splurge).
    #[sea_orm(nullable)]
    pub cost_level: Option<i32>,

    /// Rough time commitment in minutes.
    #[sea_orm(nullable)]
    pub time_minutes: Option<i32>,

    /// Visible only to the author until selected.
    #[sea_orm(default_value = false)]
    pub is_private: bool,

    /// Description is masked for other members until selected.
    #[sea_orm(default_value = false)]
    pub is_surprise: bool,

    pub status: IdeaStatus,

    /// Set when the idea is chosen; removes it from the candidate pool.
    #[sea_orm(nullable)]
    pub selected_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether the idea is still in the candidate pool.
    #[must_use]
    pub fn is_candidate(&self) -> bool {
        self.selected_at.is_none() && self.status == IdeaStatus::Approved
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::jar::Entity",
        from = "Column::JarId",
        to = "super::jar::Column::Id",
        on_delete = "Cascade"
    )]
    Jar,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedById",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,
}

impl Related<super::jar::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Jar.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
