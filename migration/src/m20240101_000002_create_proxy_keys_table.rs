use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrchProxyKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrchProxyKeys::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrchProxyKeys::KeyValue)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OrchProxyKeys::Name).string_len(100).not_null())
                    .col(ColumnDef::new(OrchProxyKeys::Description).string_len(255))
                    .col(
                        ColumnDef::new(OrchProxyKeys::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(OrchProxyKeys::RpmLimit)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrchProxyKeys::AllowedGroups).text().not_null())
                    .col(
                        ColumnDef::new(OrchProxyKeys::GroupBalancePolicy)
                            .string_len(32)
                            .not_null()
                            .default("failover"),
                    )
                    .col(ColumnDef::new(OrchProxyKeys::GroupWeights).text().not_null())
                    .col(
                        ColumnDef::new(OrchProxyKeys::UsageCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrchProxyKeys::LastUsedAt).timestamp())
                    .col(
                        ColumnDef::new(OrchProxyKeys::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(OrchProxyKeys::UpdatedAt)
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
                    .name("idx_proxy_keys_key_value")
                    .table(OrchProxyKeys::Table)
                    .col(OrchProxyKeys::KeyValue)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrchProxyKeys::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrchProxyKeys {
    Table,
    Id,
    KeyValue,
    Name,
    Description,
    Enabled,
    RpmLimit,
    AllowedGroups,
    GroupBalancePolicy,
    GroupWeights,
    UsageCount,
    LastUsedAt,
    CreatedAt,
    UpdatedAt,
}
