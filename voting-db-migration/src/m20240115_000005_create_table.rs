use sea_orm_migration::prelude::*;
use voting_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240115_000005_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(vote::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(vote::Column::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(vote::Column::VoterUserId).string())
                    .col(ColumnDef::new(vote::Column::GuestEmail).string())
                    .col(ColumnDef::new(vote::Column::CandidateId).string().not_null())
                    .col(ColumnDef::new(vote::Column::EventId).string().not_null())
                    .col(ColumnDef::new(vote::Column::Points).big_integer().not_null())
                    .col(ColumnDef::new(vote::Column::AmountPaid).decimal().not_null())
                    .col(ColumnDef::new(vote::Column::Currency).string().not_null())
                    .col(
                        ColumnDef::new(vote::Column::PaymentMethod)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(vote::Column::ProviderReference).string())
                    .col(ColumnDef::new(vote::Column::Status).string().not_null())
                    .col(
                        ColumnDef::new(vote::Column::CreatedTimestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(vote::Entity).to_owned())
            .await
    }
}
