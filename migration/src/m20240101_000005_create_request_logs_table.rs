use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrchRequestLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrchRequestLogs::RequestId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrchRequestLogs::Method).string_len(16).not_null())
                    .col(
                        ColumnDef::new(OrchRequestLogs::Endpoint)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrchRequestLogs::ProxyKeyId).integer())
                    .col(ColumnDef::new(OrchRequestLogs::GroupId).string_len(64))
                    .col(ColumnDef::new(OrchRequestLogs::ProviderType).string_len(32))
                    .col(ColumnDef::new(OrchRequestLogs::Model).string_len(100))
                    .col(ColumnDef::new(OrchRequestLogs::Status).integer())
                    .col(
                        ColumnDef::new(OrchRequestLogs::HasTools)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OrchRequestLogs::IsStreaming)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(OrchRequestLogs::UpstreamKey).string_len(64))
                    .col(ColumnDef::new(OrchRequestLogs::PromptTokens).integer())
                    .col(ColumnDef::new(OrchRequestLogs::CompletionTokens).integer())
                    .col(ColumnDef::new(OrchRequestLogs::TotalTokens).integer())
                    .col(ColumnDef::new(OrchRequestLogs::RequestBody).text())
                    .col(ColumnDef::new(OrchRequestLogs::RequestHeaders).text())
                    .col(ColumnDef::new(OrchRequestLogs::ResponseBody).text())
                    .col(ColumnDef::new(OrchRequestLogs::ResponseHeaders).text())
                    .col(ColumnDef::new(OrchRequestLogs::Error).text())
                    .col(
                        ColumnDef::new(OrchRequestLogs::ContentTruncated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(OrchRequestLogs::ClientIp).string_len(64))
                    .col(ColumnDef::new(OrchRequestLogs::UserAgent).string_len(255))
                    .col(
                        ColumnDef::new(OrchRequestLogs::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(OrchRequestLogs::EndedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_logs_created_at")
                    .table(OrchRequestLogs::Table)
                    .col(OrchRequestLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_logs_proxy_key_group_model")
                    .table(OrchRequestLogs::Table)
                    .col(OrchRequestLogs::ProxyKeyId)
                    .col(OrchRequestLogs::GroupId)
                    .col(OrchRequestLogs::Model)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrchRequestLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrchRequestLogs {
    Table,
    RequestId,
    Method,
    Endpoint,
    ProxyKeyId,
    GroupId,
    ProviderType,
    Model,
    Status,
    HasTools,
    IsStreaming,
    UpstreamKey,
    PromptTokens,
    CompletionTokens,
    TotalTokens,
    RequestBody,
    RequestHeaders,
    ResponseBody,
    ResponseHeaders,
    Error,
    ContentTruncated,
    ClientIp,
    UserAgent,
    CreatedAt,
    EndedAt,
}
