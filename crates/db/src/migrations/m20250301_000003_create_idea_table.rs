//! Create the idea table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Idea::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Idea::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Idea::JarId).string_len(32).not_null())
                    .col(ColumnDef::new(Idea::CreatedById).string_len(32).not_null())
                    .col(ColumnDef::new(Idea::Description).text().not_null())
                    .col(ColumnDef::new(Idea::Category).string_len(64))
                    .col(ColumnDef::new(Idea::CostLevel).integer())
                    .col(ColumnDef::new(Idea::TimeMinutes).integer())
                    .col(
                        ColumnDef::new(Idea::IsPrivate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Idea::IsSurprise)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Idea::Status)
                            .string_len(20)
                            .not_null()
                            .default("approved"),
                    )
                    .col(ColumnDef::new(Idea::SelectedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Idea::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Idea::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_jar")
                            .from(Idea::Table, Idea::JarId)
                            .to(Jar::Table, Jar::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_author")
                            .from(Idea::Table, Idea::CreatedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_idea_jar_id")
                    .table(Idea::Table)
                    .col(Idea::JarId)
                    .to_owned(),
            )
            .await?;

        // Candidate-pool scans filter on jar + selected_at
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_jar_selected")
                    .table(Idea::Table)
                    .col(Idea::JarId)
                    .col(Idea::SelectedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Idea::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Idea {
    Table,
    Id,
    JarId,
    CreatedById,
    Description,
    Category,
    CostLevel,
    TimeMinutes,
    IsPrivate,
    IsSurprise,
    Status,
    SelectedAt,
    CreatedAt,
    UpdatedAt,
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
