use sea_orm_migration::prelude::*;
use voting_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240115_000004_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(pending_transaction::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(pending_transaction::Column::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(pending_transaction::Column::PayerUserId).string())
                    .col(ColumnDef::new(pending_transaction::Column::GuestEmail).string())
                    .col(
                        ColumnDef::new(pending_transaction::Column::EventId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::CandidateId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::PublisherId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::Amount)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::Currency)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::Points)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::PaymentMethod)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::ProviderReference)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(pending_transaction::Column::CaptureId).string())
                    .col(
                        ColumnDef::new(pending_transaction::Column::Purpose)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::Status)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(pending_transaction::Column::ErrorMessage).string())
                    .col(
                        ColumnDef::new(pending_transaction::Column::CreatedTimestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(pending_transaction::Column::VerifiedTimestamp)
                            .big_integer(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(pending_transaction::Entity)
                    .to_owned(),
            )
            .await
    }
}
