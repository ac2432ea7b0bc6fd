//! Initial schema: users, per-owner ledger versions, accounts and
//! transactions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LedgerBooks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LedgerBooks::OwnerId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(LedgerBooks::Version).big_integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Accounts::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Accounts::InitialBalance).string().not_null())
                    .col(ColumnDef::new(Accounts::Balance).string().not_null())
                    .col(ColumnDef::new(Accounts::Position).big_integer().not_null())
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_accounts_owner")
                    .table(Accounts::Table)
                    .col(Accounts::OwnerId)
                    .col(Accounts::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Transactions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Transactions::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::TransactionType).string_len(16).not_null())
                    .col(ColumnDef::new(Transactions::Amount).string().not_null())
                    .col(ColumnDef::new(Transactions::Category).string().not_null())
                    .col(ColumnDef::new(Transactions::Division).string_len(16).not_null())
                    .col(ColumnDef::new(Transactions::AccountId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::AccountName).string().not_null())
                    .col(ColumnDef::new(Transactions::Description).text().null())
                    .col(ColumnDef::new(Transactions::TransferId).uuid().null())
                    .col(ColumnDef::new(Transactions::Sequence).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Transactions::UpdatedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transactions_owner_sequence")
                    .table(Transactions::Table)
                    .col(Transactions::OwnerId)
                    .col(Transactions::Sequence)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerBooks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LedgerBooks {
    Table,
    OwnerId,
    Version,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    OwnerId,
    Name,
    InitialBalance,
    Balance,
    Position,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    OwnerId,
    TransactionType,
    Amount,
    Category,
    Division,
    AccountId,
    AccountName,
    Description,
    TransferId,
    Sequence,
    CreatedAt,
    UpdatedAt,
}
