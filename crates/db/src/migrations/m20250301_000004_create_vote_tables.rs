//! Create the `vote_session` and vote tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VoteSession::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VoteSession::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VoteSession::JarId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(VoteSession::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(VoteSession::TieBreakerMode)
                            .string_len(20)
                            .not_null()
                            .default("random_pick"),
                    )
                    .col(
                        ColumnDef::new(VoteSession::Round)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(VoteSession::EligibleIdeaIds).json())
                    .col(ColumnDef::new(VoteSession::EndTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(VoteSession::WinnerId).string_len(32))
                    .col(
                        ColumnDef::new(VoteSession::StartedById)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VoteSession::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(VoteSession::ResolvedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_session_jar")
                            .from(VoteSession::Table, VoteSession::JarId)
                            .to(Jar::Table, Jar::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_session_starter")
                            .from(VoteSession::Table, VoteSession::StartedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vote_session_jar_id")
                    .table(VoteSession::Table)
                    .col(VoteSession::JarId)
                    .to_owned(),
            )
            .await?;

        // At most one active session per jar. sea-query's index builder
        // has no WHERE clause, so raw SQL it is.
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_vote_session_one_active
                ON vote_session (jar_id)
                WHERE status = 'active';
                ",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vote::SessionId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::IdeaId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_session")
                            .from(Vote::Table, Vote::SessionId)
                            .to(VoteSession::Table, VoteSession::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_voter")
                            .from(Vote::Table, Vote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_idea")
                            .from(Vote::Table, Vote::IdeaId)
                            .to(Idea::Table, Idea::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One ballot per member per session
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_session_user_unique")
                    .table(Vote::Table)
                    .col(Vote::SessionId)
                    .col(Vote::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VoteSession::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum VoteSession {
    Table,
    Id,
    JarId,
    Status,
    TieBreakerMode,
    Round,
    EligibleIdeaIds,
    EndTime,
    WinnerId,
    StartedById,
    CreatedAt,
    ResolvedAt,
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    SessionId,
    UserId,
    IdeaId,
    CreatedAt,
}

#[derive(Iden)]
enum Jar {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Idea {
    Table,
    Id,
}
