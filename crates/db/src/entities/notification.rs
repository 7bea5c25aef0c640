//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    #[sea_orm(string_value = "voteStarted")]
    VoteStarted,
    #[sea_orm(string_value = "voteEnded")]
    VoteEnded,
    #[sea_orm(string_value = "ideaSelected")]
    IdeaSelected,
    #[sea_orm(string_value = "ideaAdded")]
    IdeaAdded,
    #[sea_orm(string_value = "memberJoined")]
    MemberJoined,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    #[sea_orm(indexed)]
    pub user_id: String,

    pub kind: NotificationKind,

    /// Jar the event happened in
    #[sea_orm(nullable)]
    pub jar_id: Option<String>,

    /// The user who triggered the notification (optional for some kinds)
    #[sea_orm(nullable)]
    pub actor_id: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Has this notification been read?
    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ActorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Actor,
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
        Relation::Recipient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
