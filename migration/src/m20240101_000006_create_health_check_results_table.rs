use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrchHealthCheckResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrchHealthCheckResults::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrchHealthCheckResults::GroupId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrchHealthCheckResults::CheckType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrchHealthCheckResults::ApiKeyHash).string_len(64))
                    .col(ColumnDef::new(OrchHealthCheckResults::Model).string_len(100))
                    .col(ColumnDef::new(OrchHealthCheckResults::Success).boolean().not_null())
                    .col(ColumnDef::new(OrchHealthCheckResults::StatusCode).integer())
                    .col(ColumnDef::new(OrchHealthCheckResults::ErrorMessage).text())
                    .col(ColumnDef::new(OrchHealthCheckResults::ResponseTimeMs).integer())
                    .col(
                        ColumnDef::new(OrchHealthCheckResults::CheckedAt)
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
                    .name("idx_health_check_results_group_checked")
                    .table(OrchHealthCheckResults::Table)
                    .col(OrchHealthCheckResults::GroupId)
                    .col(OrchHealthCheckResults::CheckedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrchHealthCheckResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrchHealthCheckResults {
    Table,
    Id,
    GroupId,
    CheckType,
    ApiKeyHash,
    Model,
    Success,
    StatusCode,
    ErrorMessage,
    ResponseTimeMs,
    CheckedAt,
}
