use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrchKeyUsageStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrchKeyUsageStats::GroupId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrchKeyUsageStats::ApiKeyHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrchKeyUsageStats::UsageCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrchKeyUsageStats::LastUsedAt).timestamp())
                    .primary_key(
                        Index::create()
                            .col(OrchKeyUsageStats::GroupId)
                            .col(OrchKeyUsageStats::ApiKeyHash),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrchKeyUsageStats::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrchKeyUsageStats {
    Table,
    GroupId,
    ApiKeyHash,
    UsageCount,
    LastUsedAt,
}
