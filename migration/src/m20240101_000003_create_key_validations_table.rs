use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrchKeyValidations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrchKeyValidations::GroupId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrchKeyValidations::ApiKeyHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrchKeyValidations::IsValid)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(OrchKeyValidations::ErrorCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrchKeyValidations::LastError).text())
                    .col(ColumnDef::new(OrchKeyValidations::LastStatusCode).integer())
                    .col(
                        ColumnDef::new(OrchKeyValidations::LastValidatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(OrchKeyValidations::GroupId)
                            .col(OrchKeyValidations::ApiKeyHash),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_key_validations_is_valid")
                    .table(OrchKeyValidations::Table)
                    .col(OrchKeyValidations::GroupId)
                    .col(OrchKeyValidations::IsValid)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrchKeyValidations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrchKeyValidations {
    Table,
    GroupId,
    ApiKeyHash,
    IsValid,
    ErrorCount,
    LastError,
    LastStatusCode,
    LastValidatedAt,
}
