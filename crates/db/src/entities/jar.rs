//! Jar entity - a shared collection of ideas.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How ideas in a jar are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionMode {
    /// A uniform random draw from the unselected pool.
    #[sea_orm(string_value = "random")]
    Random,
    /// A group vote round decides.
    #[sea_orm(string_value = "vote")]
    Vote,
    /// A jar admin picks directly.
    #[sea_orm(string_value = "admin_pick")]
    AdminPick,
    /// Selection is allocated per member.
    #[sea_orm(string_value = "allocation")]
    Allocation,
}

impl Default for SelectionMode {
    fn default() -> Self {
        Self::Random
    }
}

/// Jar entity - a named collection owning ideas and members.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "jar")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// User who created the jar.
    #[sea_orm(indexed)]
    pub owner_id: String,

    /// Jar name.
    pub name: String,

    /// Jar description (optional).
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Topic controlling suggested idea categories (optional).
    #[sea_orm(nullable)]
    pub topic: Option<String>,

    /// Invite token members use to join.
    #[sea_orm(unique)]
    pub reference_code: String,

    /// Governs how ideas are chosen. Exactly one mode at a time.
    pub selection_mode: SelectionMode,

    /// Whether member ideas need admin approval before entering the pool.
    #[sea_orm(default_value = false)]
    pub requires_approval: bool,

    /// Number of members (denormalized).
    #[sea_orm(default_value = 1)]
    pub members_count: i64,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(has_many = "super::jar_member::Entity")]
    Members,
    #[sea_orm(has_many = "super::idea::Entity")]
    Ideas,
    #[sea_orm(has_many = "super::vote_session::Entity")]
    VoteSessions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::jar_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::idea::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ideas.def()
    }
}

impl Related<super::vote_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoteSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
