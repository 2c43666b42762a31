use crate::{
    adapters::persistence::PostgresPersistence,
    infra::{db::init_db, error::InfraError},
};

pub mod ai_client;
pub mod app;
pub mod config;
pub mod creem_client;
pub mod db;
pub mod error;
pub mod http_client;
pub mod setup;

pub async fn postgres_persistence(database_url: &str) -> Result<PostgresPersistence, InfraError> {
    let pool = init_db(database_url).await?;
    Ok(PostgresPersistence::new(pool))
}
