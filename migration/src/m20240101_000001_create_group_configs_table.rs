use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrchGroupConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrchGroupConfigs::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrchGroupConfigs::ProviderType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrchGroupConfigs::BaseUrl).string_len(255))
                    .col(ColumnDef::new(OrchGroupConfigs::ApiKeys).text().not_null())
                    .col(ColumnDef::new(OrchGroupConfigs::Models).text().not_null())
                    .col(ColumnDef::new(OrchGroupConfigs::ModelAliases).text().not_null())
                    .col(
                        ColumnDef::new(OrchGroupConfigs::ParameterOverrides)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrchGroupConfigs::Headers).text().not_null())
                    .col(
                        ColumnDef::new(OrchGroupConfigs::BalancePolicy)
                            .string_len(32)
                            .not_null()
                            .default("round_robin"),
                    )
                    .col(
                        ColumnDef::new(OrchGroupConfigs::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrchGroupConfigs::Timeout)
                            .integer()
                            .not_null()
                            .default(180),
                    )
                    .col(
                        ColumnDef::new(OrchGroupConfigs::RpmLimit)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrchGroupConfigs::TestModel).string_len(100))
                    .col(
                        ColumnDef::new(OrchGroupConfigs::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrchGroupConfigs::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(OrchGroupConfigs::FakeStreaming)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(OrchGroupConfigs::ProxyConfig).text())
                    .col(
                        ColumnDef::new(OrchGroupConfigs::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OrchGroupConfigs::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(OrchGroupConfigs::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_configs_enabled_deleted")
                    .table(OrchGroupConfigs::Table)
                    .col(OrchGroupConfigs::Enabled)
                    .col(OrchGroupConfigs::IsDeleted)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrchGroupConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrchGroupConfigs {
    Table,
    Id,
    ProviderType,
    BaseUrl,
    ApiKeys,
    Models,
    ModelAliases,
    ParameterOverrides,
    Headers,
    BalancePolicy,
    RetryCount,
    Timeout,
    RpmLimit,
    TestModel,
    Priority,
    Enabled,
    FakeStreaming,
    ProxyConfig,
    IsDeleted,
    CreatedAt,
    UpdatedAt,
}
