//! Create the jar and `jar_member` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Jar::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Jar::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Jar::OwnerId).string_len(32).not_null())
                    .col(ColumnDef::new(Jar::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Jar::Description).text())
                    .col(ColumnDef::new(Jar::Topic).string_len(64))
                    .col(
                        ColumnDef::new(Jar::ReferenceCode)
                            .string_len(16)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Jar::SelectionMode)
                            .string_len(20)
                            .not_null()
                            .default("random"),
                    )
                    .col(
                        ColumnDef::new(Jar::RequiresApproval)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Jar::MembersCount)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Jar::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Jar::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jar_owner")
                            .from(Jar::Table, Jar::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jar_owner_id")
                    .table(Jar::Table)
                    .col(Jar::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JarMember::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JarMember::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JarMember::JarId).string_len(32).not_null())
                    .col(ColumnDef::new(JarMember::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(JarMember::Role)
                            .string_len(20)
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(JarMember::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jar_member_jar")
                            .from(JarMember::Table, JarMember::JarId)
                            .to(Jar::Table, Jar::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jar_member_user")
                            .from(JarMember::Table, JarMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One membership per user per jar
        manager
            .create_index(
                Index::create()
                    .name("idx_jar_member_unique")
                    .table(JarMember::Table)
                    .col(JarMember::JarId)
                    .col(JarMember::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jar_member_user_id")
                    .table(JarMember::Table)
                    .col(JarMember::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JarMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Jar::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Jar {
    Table,
    Id,
    OwnerId,
    Name,
    Description,
    Topic,
    ReferenceCode,
    SelectionMode,
    RequiresApproval,
    MembersCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum JarMember {
    Table,
    Id,
    JarId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
