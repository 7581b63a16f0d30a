use sea_orm_migration::prelude::*;
use voting_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240115_000006_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(token_transaction::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(token_transaction::Column::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(token_transaction::Column::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(token_transaction::Column::TokensIn)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(token_transaction::Column::TokensOut)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(token_transaction::Column::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(token_transaction::Column::ExternalReference).string())
                    .col(
                        ColumnDef::new(token_transaction::Column::PaymentMethod)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(token_transaction::Column::CreatedTimestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(token_transaction::Entity).to_owned())
            .await
    }
}
