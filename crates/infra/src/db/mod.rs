use std::sync::Arc;

use anyhow::Context;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.surreal_endpoint.clone(),
            namespace: config.surreal_ns.clone(),
            database: config.surreal_db.clone(),
            username: config.surreal_user.clone(),
            password: config.surreal_pass.clone(),
        }
    }
}

/// Opens an authenticated connection scoped to the configured
/// namespace/database. Shared by every SurrealDB repository.
pub async fn connect(config: &DbConfig) -> anyhow::Result<Arc<Surreal<Client>>> {
    let db = Surreal::<Client>::init();
    db.connect::<Ws>(&config.endpoint)
        .await
        .with_context(|| format!("connect surrealdb endpoint {}", config.endpoint))?;
    db.signin(Root {
        username: &config.username,
        password: &config.password,
    })
    .await
    .context("surreal signin")?;
    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .context("select surrealdb namespace/database")?;
    Ok(Arc::new(db))
}
