use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrchHealthCheckStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrchHealthCheckStats::GroupId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrchHealthCheckStats::CheckType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrchHealthCheckStats::TotalCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrchHealthCheckStats::SuccessCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrchHealthCheckStats::FailureCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrchHealthCheckStats::AvgResponseTimeMs)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(OrchHealthCheckStats::ConsecutiveFailures)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrchHealthCheckStats::LastCheckedAt).timestamp())
                    .primary_key(
                        Index::create()
                            .col(OrchHealthCheckStats::GroupId)
                            .col(OrchHealthCheckStats::CheckType),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrchHealthCheckStats::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrchHealthCheckStats {
    Table,
    GroupId,
    CheckType,
    TotalCount,
    SuccessCount,
    FailureCount,
    AvgResponseTimeMs,
    ConsecutiveFailures,
    LastCheckedAt,
}
