use sea_orm_migration::prelude::*;
use voting_db_entity::db::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240115_000002_create_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(candidate::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(candidate::Column::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(candidate::Column::EventId).string().not_null())
                    .col(ColumnDef::new(candidate::Column::Name).string().not_null())
                    .col(ColumnDef::new(candidate::Column::Votes).big_integer().not_null())
                    .col(ColumnDef::new(candidate::Column::Gifts).big_integer().not_null())
                    .col(
                        ColumnDef::new(candidate::Column::PointsScore)
                            .decimal()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(candidate::Entity).to_owned())
            .await
    }
}
