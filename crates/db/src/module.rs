use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bedrock_kernel::{InitCtx, Module};

use crate::engine::Engine;

/// Core module owning the shared engine: verifies connectivity at startup and
/// shuts the engine down last.
pub struct DbModule {
    engine: Arc<dyn Engine>,
}

impl DbModule {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.engine
            .ping()
            .await
            .context("failed to reach MongoDB")?;

        tracing::info!(
            module = self.name(),
            database = %ctx.settings.database.database,
            "connected to MongoDB"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.engine.shutdown().await;
        tracing::info!(module = self.name(), "database connection closed");
        Ok(())
    }
}
