//! Jar member entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a jar member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JarRole {
    /// Regular member.
    #[sea_orm(string_value = "member")]
    Member,
    /// Admin - manages the jar, its members, and vote rounds.
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Default for JarRole {
    fn default() -> Self {
        Self::Member
    }
}

impl JarRole {
    /// Check if the role can manage the jar and start or cancel votes.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Jar member - tracks which users belong to which jars.
///
/// Unique per `(jar_id, user_id)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "jar_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The jar the membership belongs to.
    #[sea_orm(indexed)]
    pub jar_id: String,

    /// The member user.
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Role of the member in the jar.
    pub role: JarRole,

    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::jar::Entity",
        from = "Column::JarId",
        to = "super::jar::Column::Id",
        on_delete = "Cascade"
    )]
    Jar,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::jar::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Jar.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
