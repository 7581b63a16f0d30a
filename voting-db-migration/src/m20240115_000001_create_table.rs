use sea_orm_migration::prelude::*;
use voting_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240115_000001_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(event::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(event::Column::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(event::Column::PublisherId).string().not_null())
                    .col(ColumnDef::new(event::Column::Name).string().not_null())
                    .col(ColumnDef::new(event::Column::IsActive).boolean().not_null())
                    .col(
                        ColumnDef::new(event::Column::CreatedTimestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(event::Entity).to_owned())
            .await
    }
}
