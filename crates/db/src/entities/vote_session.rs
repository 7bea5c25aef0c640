//! Vote session entity - one bounded voting round scoped to a jar.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a vote session.
///
/// The only transitions are `Active -> Completed` (resolution, including
/// the zero-vote case) and `Active -> Cancelled` (admin cancel). A tie
/// under re-vote completes the round and spawns a fresh `Active` round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteSessionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Policy for resolving a tied vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TieBreakerMode {
    /// Pick uniformly among the tied ideas.
    #[sea_orm(string_value = "random_pick")]
    RandomPick,
    /// Complete the round and open a runoff restricted to the tied ideas.
    #[sea_orm(string_value = "re_vote")]
    ReVote,
}

impl Default for TieBreakerMode {
    fn default() -> Self {
        Self::RandomPick
    }
}

/// Vote session entity.
///
/// At most one `active` session exists per jar, enforced by a partial
/// unique index on `(jar_id) WHERE status = 'active'`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub jar_id: String,

    pub status: VoteSessionStatus,

    pub tie_breaker_mode: TieBreakerMode,

    /// Round number; starts at 1 and increments on a re-vote runoff.
    #[sea_orm(default_value = 1)]
    pub round: i32,

    /// Candidate restriction for runoff rounds (JSON array of idea ids).
    #[sea_orm(column_type = "Json", nullable)]
    pub eligible_idea_ids: Option<Json>,

    /// Voting deadline. Checked passively on read and write, never by a
    /// timer.
    #[sea_orm(nullable)]
    pub end_time: Option<DateTimeWithTimeZone>,

    /// Winning idea once the session is completed with a winner.
    #[sea_orm(nullable)]
    pub winner_id: Option<String>,

    /// Admin who opened the round.
    pub started_by_id: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub resolved_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether the deadline has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: &DateTimeWithTimeZone) -> bool {
        self.end_time.as_ref().is_some_and(|end| end < now)
    }

    /// Parsed candidate restriction, if this is a runoff round.
    #[must_use]
    pub fn eligible_ids(&self) -> Option<Vec<String>> {
        self.eligible_idea_ids
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
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
        from = "Column::StartedById",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    StartedBy,
    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,
}

impl Related<super::jar::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Jar.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn session(end_time: Option<DateTimeWithTimeZone>) -> Model {
        Model {
            id: "sess1".to_string(),
            jar_id: "jar1".to_string(),
            status: VoteSessionStatus::Active,
            tie_breaker_mode: TieBreakerMode::RandomPick,
            round: 1,
            eligible_idea_ids: None,
            end_time,
            winner_id: None,
            started_by_id: "user1".to_string(),
            created_at: Utc::now().into(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_is_expired() {
        let now: DateTimeWithTimeZone = Utc::now().into();

        assert!(!session(None).is_expired(&now));
        assert!(!session(Some((Utc::now() + Duration::hours(1)).into())).is_expired(&now));
        assert!(session(Some((Utc::now() - Duration::hours(1)).into())).is_expired(&now));
    }

    #[test]
    fn test_eligible_ids() {
        let mut s = session(None);
        assert_eq!(s.eligible_ids(), None);

        s.eligible_idea_ids = Some(serde_json::json!(["idea1", "idea2"]));
        assert_eq!(
            s.eligible_ids(),
            Some(vec!["idea1".to_string(), "idea2".to_string()])
        );
    }
}
