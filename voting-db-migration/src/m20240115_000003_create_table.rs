use sea_orm_migration::prelude::*;
use voting_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240115_000003_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(wallet::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(wallet::Column::OwnerId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(wallet::Column::Balance).decimal().not_null())
                    .col(ColumnDef::new(wallet::Column::LastAction).string().not_null())
                    .col(
                        ColumnDef::new(wallet::Column::UpdatedTimestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(wallet::Entity).to_owned())
            .await
    }
}
