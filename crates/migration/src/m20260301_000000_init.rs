//! Initial schema migration.
//!
//! - `users`: authentication
//! - `projects`: construction projects owned by users, with running totals
//! - `parties`: clients and vendors attached to a project
//! - `transactions`: income/expense records, soft-deleted via `deleted_at`
//!
//! Transactions carry no foreign keys to projects/parties: a
//! forced project delete removes the parties and leaves the ledger rows
//! behind.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    PasswordHash,
    CreatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    OwnerId,
    Title,
    Code,
    CodeNorm,
    BudgetMinor,
    TotalIncomeMinor,
    TotalExpenseMinor,
    BalanceMinor,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Parties {
    Table,
    Id,
    ProjectId,
    Name,
    NameNorm,
    Category,
    Phone,
    Email,
    Address,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    ProjectId,
    PartyId,
    Kind,
    AmountMinor,
    OccurredAt,
    Note,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    DeletedBy,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Projects
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Projects::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Projects::OwnerId).string().not_null())
                    .col(ColumnDef::new(Projects::Title).string().not_null())
                    .col(ColumnDef::new(Projects::Code).string().not_null())
                    .col(ColumnDef::new(Projects::CodeNorm).string().not_null())
                    .col(
                        ColumnDef::new(Projects::BudgetMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Projects::TotalIncomeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Projects::TotalExpenseMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Projects::BalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Projects::Status)
                            .string()
                            .not_null()
                            .default("PLANNED"),
                    )
                    .col(ColumnDef::new(Projects::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Projects::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-projects-owner_id")
                            .from(Projects::Table, Projects::OwnerId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-projects-owner_id-code_norm-unique")
                    .table(Projects::Table)
                    .col(Projects::OwnerId)
                    .col(Projects::CodeNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Parties
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Parties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Parties::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Parties::ProjectId).string().not_null())
                    .col(ColumnDef::new(Parties::Name).string().not_null())
                    .col(ColumnDef::new(Parties::NameNorm).string().not_null())
                    .col(ColumnDef::new(Parties::Category).string().not_null())
                    .col(ColumnDef::new(Parties::Phone).string())
                    .col(ColumnDef::new(Parties::Email).string())
                    .col(ColumnDef::new(Parties::Address).string())
                    .col(ColumnDef::new(Parties::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Parties::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-parties-project_id")
                            .from(Parties::Table, Parties::ProjectId)
                            .to(Projects::Table, Projects::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-parties-project_id-name_norm-unique")
                    .table(Parties::Table)
                    .col(Parties::ProjectId)
                    .col(Parties::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::ProjectId).string().not_null())
                    .col(ColumnDef::new(Transactions::PartyId).string().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Note).string())
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::DeletedAt).timestamp())
                    .col(ColumnDef::new(Transactions::DeletedBy).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-project_id-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::ProjectId)
                    .col(Transactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-party_id")
                    .table(Transactions::Table)
                    .col(Transactions::PartyId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Parties::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
