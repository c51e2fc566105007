use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum ProductGroups {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Description,
    ProductType,
    GroupId,
    Price,
    CommissionRate,
    DurationType,
    DurationValue,
    IsActive,
    HasTestOption,
    TestDuration,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("product_type"))
                    .values(vec![
                        Alias::new("api_based"),
                        Alias::new("user_password"),
                        Alias::new("license"),
                    ])
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("duration_type"))
                    .values(vec![
                        Alias::new("days"),
                        Alias::new("months"),
                        Alias::new("years"),
                        Alias::new("permanent"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductGroups::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductGroups::Name).string_len(100).not_null())
                    .col(ColumnDef::new(ProductGroups::Description).text().null())
                    .col(
                        ColumnDef::new(ProductGroups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(ProductGroups::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Products::Description).text().null())
                    .col(
                        ColumnDef::new(Products::ProductType)
                            .custom(Alias::new("product_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Products::GroupId).big_integer().not_null())
                    .col(ColumnDef::new(Products::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Products::CommissionRate)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Products::DurationType)
                            .custom(Alias::new("duration_type"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::DurationValue)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Products::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Products::HasTestOption)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Products::TestDuration)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_group")
                            .from(Products::Table, Products::GroupId)
                            .to(ProductGroups::Table, ProductGroups::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_group_id")
                    .table(Products::Table)
                    .col(Products::GroupId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(ProductGroups::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("duration_type")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("product_type")).to_owned())
            .await?;
        Ok(())
    }
}
