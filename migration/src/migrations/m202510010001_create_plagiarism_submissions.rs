use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010001_create_plagiarism_submissions"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("plagiarism_submissions"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    // assigned by the remote service on creation
                    .col(ColumnDef::new(Alias::new("external_id")).text().null())
                    .col(ColumnDef::new(Alias::new("owner_module_ref")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("user_ref")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("group_ref")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("submitter_ref")).big_integer().not_null())
                    // content descriptor
                    .col(ColumnDef::new(Alias::new("content_identifier")).text().not_null())
                    .col(ColumnDef::new(Alias::new("content_item_ref")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("content_type")).string().not_null())
                    .col(ColumnDef::new(Alias::new("content_category")).string().not_null())
                    .col(ColumnDef::new(Alias::new("quiz_answer_key")).string().null())
                    .col(ColumnDef::new(Alias::new("filename")).text().null())
                    // lifecycle
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .string()
                            .not_null()
                            .default("queued"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("to_generate"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("generation_time"))
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Alias::new("submitted_at")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("requested_at")).big_integer().null())
                    // outcome
                    .col(ColumnDef::new(Alias::new("overall_score")).double().null())
                    .col(ColumnDef::new(Alias::new("error_message")).text().null())
                    // retry bookkeeping, one counter per phase
                    .col(
                        ColumnDef::new(Alias::new("send_attempts"))
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("report_attempts"))
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("next_retry_not_before"))
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_plagiarism_submissions_status")
                    .table(Alias::new("plagiarism_submissions"))
                    .col(Alias::new("status"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_plagiarism_submissions_external_id")
                    .table(Alias::new("plagiarism_submissions"))
                    .col(Alias::new("external_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_plagiarism_submissions_content")
                    .table(Alias::new("plagiarism_submissions"))
                    .col(Alias::new("owner_module_ref"))
                    .col(Alias::new("user_ref"))
                    .col(Alias::new("content_identifier"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("plagiarism_submissions")).to_owned())
            .await
    }
}
