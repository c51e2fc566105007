use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    UserId,
    Method,
    Amount,
    Status,
    Description,
    ReceiptImage,
    AdminNote,
    ApprovedBy,
    ApprovedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    CreditId,
    TransactionType,
    Amount,
    BalanceAfter,
    Description,
    PaymentId,
    SubscriptionId,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Credits {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("payment_method"))
                    .values(vec![Alias::new("card_to_card"), Alias::new("online")])
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("payment_status"))
                    .values(vec![
                        Alias::new("pending"),
                        Alias::new("completed"),
                        Alias::new("rejected"),
                    ])
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("transaction_type"))
                    .values(vec![Alias::new("deposit"), Alias::new("withdrawal")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payments::Method)
                            .custom(Alias::new("payment_method"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payments::Status)
                            .custom(Alias::new("payment_status"))
                            .not_null()
                            .default(Expr::cust("'pending'::payment_status")),
                    )
                    .col(ColumnDef::new(Payments::Description).text().null())
                    .col(ColumnDef::new(Payments::ReceiptImage).string_len(500).null())
                    .col(ColumnDef::new(Payments::AdminNote).text().null())
                    .col(ColumnDef::new(Payments::ApprovedBy).big_integer().null())
                    .col(
                        ColumnDef::new(Payments::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Payments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_user")
                            .from(Payments::Table, Payments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_status")
                    .table(Payments::Table)
                    .col(Payments::Status)
                    .to_owned(),
            )
            .await?;

        // Append-only: rows are never updated or deleted by the application
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::CreditId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Transactions::TransactionType)
                            .custom(Alias::new("transaction_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Transactions::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Description).text().null())
                    .col(ColumnDef::new(Transactions::PaymentId).big_integer().null())
                    .col(
                        ColumnDef::new(Transactions::SubscriptionId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Transactions::CreatedBy).big_integer().null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_credit")
                            .from(Transactions::Table, Transactions::CreditId)
                            .to(Credits::Table, Credits::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_payment")
                            .from(Transactions::Table, Transactions::PaymentId)
                            .to(Payments::Table, Payments::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_credit_created")
                    .table(Transactions::Table)
                    .col(Transactions::CreditId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Payments::Table).to_owned())
            .await?;
        for name in ["transaction_type", "payment_status", "payment_method"] {
            manager
                .drop_type(Type::drop().name(Alias::new(name)).to_owned())
                .await?;
        }
        Ok(())
    }
}
