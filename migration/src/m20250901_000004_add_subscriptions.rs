use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    ProductId,
    AgentId,
    CustomerId,
    CustomerName,
    CustomerNote,
    Status,
    Price,
    IsTest,
    DurationType,
    DurationValue,
    TestDuration,
    StartDate,
    EndDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Agents {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    SubscriptionId,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("subscription_status"))
                    .values(vec![
                        Alias::new("pending"),
                        Alias::new("active"),
                        Alias::new("suspended"),
                        Alias::new("expired"),
                        Alias::new("cancelled"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscriptions::AgentId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::CustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CustomerName)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscriptions::CustomerNote).text().null())
                    .col(
                        ColumnDef::new(Subscriptions::Status)
                            .custom(Alias::new("subscription_status"))
                            .not_null()
                            .default(Expr::cust("'pending'::subscription_status")),
                    )
                    .col(ColumnDef::new(Subscriptions::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::IsTest)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::DurationType)
                            .custom(Alias::new("duration_type"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::DurationValue)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::TestDuration)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::StartDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::EndDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_product")
                            .from(Subscriptions::Table, Subscriptions::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_agent")
                            .from(Subscriptions::Table, Subscriptions::AgentId)
                            .to(Agents::Table, Agents::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_agent_status")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::AgentId)
                    .col(Subscriptions::Status)
                    .to_owned(),
            )
            .await?;

        // expiry sweep scans active rows by end_date
        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_status_end_date")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::Status)
                    .col(Subscriptions::EndDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_transactions_subscription")
                    .from(Transactions::Table, Transactions::SubscriptionId)
                    .to(Subscriptions::Table, Subscriptions::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_foreign_key(
                ForeignKey::drop()
                    .name("fk_transactions_subscription")
                    .table(Transactions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("subscription_status")).to_owned())
            .await?;
        Ok(())
    }
}
