//! Bedrock application service
//!
//! Wires the MongoDB engine, the core `db` module, and the project modules
//! into the HTTP server.

pub mod modules;

use std::sync::Arc;

use anyhow::Context;
use bedrock_db::{mongo::MongoEngine, DbModule, Engine};
use bedrock_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build the registry with the `db` core module and every project module.
pub fn build_registry(engine: Arc<dyn Engine>, settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_core(Arc::new(DbModule::new(engine.clone())));
    modules::register_all(&mut registry, engine, settings);
    registry
}

/// Connect to MongoDB, boot every module, and serve HTTP until Ctrl-C.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let engine: Arc<dyn Engine> = Arc::new(
        MongoEngine::connect(&settings.database)
            .await
            .context("failed to create MongoDB client")?,
    );

    let registry = build_registry(engine, &settings);
    let ctx = InitCtx {
        settings: &settings,
    };
    registry.boot(&ctx).await?;

    let served = bedrock_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry
        .shutdown()
        .await
        .context("failed to stop modules cleanly")?;
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use bedrock_db::memory::MemoryEngine;
    use tower::ServiceExt;

    async fn get(path: &str) -> (StatusCode, serde_json::Value) {
        let settings = Settings::default();
        let registry = build_registry(Arc::new(MemoryEngine::new()), &settings);
        let router = bedrock_http::build_router(&registry, &settings);

        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn registry_holds_db_and_project_modules() {
        let registry = build_registry(Arc::new(MemoryEngine::new()), &Settings::default());
        let names: Vec<_> = registry.modules().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["db", "health", "bootstrap"]);
    }

    #[tokio::test]
    async fn health_routes_are_served_under_api_v1() {
        assert_eq!(
            get("/api/v1/health").await,
            (StatusCode::OK, serde_json::json!({ "status": "ok" }))
        );
        assert_eq!(
            get("/api/v1/health/db").await,
            (StatusCode::OK, serde_json::json!({ "database": "connected" }))
        );
    }

    #[tokio::test]
    async fn bootstrap_status_is_served() {
        let (status, body) = get("/api/v1/bootstrap").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "app_db");
        assert_eq!(body["collection"], "initial");
    }

    #[tokio::test]
    async fn merged_openapi_lists_module_paths() {
        let (status, body) = get("/docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/v1/health/db"].is_object());
        assert!(body["paths"]["/api/v1/bootstrap"].is_object());
    }
}
