use figment::{
    providers::{Format, Toml},
    Figment,
};
use sea_orm_migration::prelude::*;
use serde::Deserialize;
use voting_db_migration::Migrator;

#[derive(Deserialize)]
struct MigrationConfig {
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<(), DbErr> {
    let config: MigrationConfig = Figment::new()
        .merge(Toml::file("App.toml"))
        .extract()
        .expect("Error reading App.toml");

    let db = sea_orm_migration::sea_orm::Database::connect(&config.database_url).await?;
    Migrator::up(&db, None).await
}
