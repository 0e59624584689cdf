//! MongoDB connection handle and the `db` core module that owns its lifecycle.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bookshelf_kernel::settings::Settings;
use bookshelf_kernel::{InitCtx, Module};
use mongodb::bson::doc;
use mongodb::{Client, Collection, Database};

/// Handle to the configured database.
///
/// Cheap to clone; every clone shares the same connection pool.
#[derive(Clone, Debug)]
pub struct DbHandle {
    client: Client,
    database: Database,
}

impl DbHandle {
    /// Build a client for the configured deployment and select the database
    /// matching the execution mode. No network round trip happens here.
    pub async fn connect(settings: &Settings) -> anyhow::Result<Self> {
        let uri = settings.database.uri();
        let name = settings.database.database_name(settings.environment);

        let client = Client::with_uri_str(&uri)
            .await
            .with_context(|| format!("failed to create MongoDB client for {}", uri))?;
        let database = client.database(name);

        tracing::info!(target: "bookshelf-db", %uri, database = name, "database client created");

        Ok(Self { client, database })
    }

    /// Name of the selected database.
    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    /// Typed handle to a collection in the selected database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    /// Round-trip a `ping` command to verify the deployment is reachable.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .with_context(|| format!("failed to ping database '{}'", self.database_name()))?;
        Ok(())
    }

    /// Close pooled connections and stop background monitoring.
    pub async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        tracing::info!(target: "bookshelf-db", database = self.database_name(), "database client shut down");
    }
}

/// Core module wiring the database handle into the registry lifecycle.
pub struct DbModule {
    handle: DbHandle,
}

impl DbModule {
    pub fn new(handle: DbHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.handle.ping().await?;
        tracing::info!(
            module = self.name(),
            database = self.handle.database_name(),
            "connected to database"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.handle.shutdown().await;
        Ok(())
    }
}

/// Create the core `db` module for the given handle
pub fn create_module(handle: DbHandle) -> Arc<dyn Module> {
    Arc::new(DbModule::new(handle))
}
