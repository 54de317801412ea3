use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use bedrock_db::Engine;
use bedrock_kernel::{InitCtx, Module};
use serde::Serialize;
use serde_json::json;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness and database connectivity checks
pub struct HealthModule {
    engine: Arc<dyn Engine>,
}

impl HealthModule {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DatabaseHealth {
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[async_trait]
impl Module for HealthModule {
    fn name(&self) -> &'static str {
        "health"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "health module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(health_check))
            .route("/db", get(database_check))
            .with_state(self.engine.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Service health",
                        "tags": ["Health"],
                        "responses": {
                            "200": {
                                "description": "Service is up",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/HealthStatus" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/db": {
                    "get": {
                        "summary": "Database connectivity",
                        "tags": ["Health"],
                        "responses": {
                            "200": {
                                "description": "Result of a ping against MongoDB",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/DatabaseHealth" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "HealthStatus": {
                        "type": "object",
                        "properties": {
                            "status": { "type": "string", "example": "ok" }
                        },
                        "required": ["status"]
                    },
                    "DatabaseHealth": {
                        "type": "object",
                        "properties": {
                            "database": {
                                "type": "string",
                                "enum": ["connected", "disconnected"]
                            },
                            "error": { "type": "string" }
                        },
                        "required": ["database"]
                    }
                }
            }
        }))
    }
}

async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

/// Always answers 200; the body says whether MongoDB answered a ping.
async fn database_check(State(engine): State<Arc<dyn Engine>>) -> Json<DatabaseHealth> {
    let error = match tokio::time::timeout(PING_TIMEOUT, engine.ping()).await {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err.to_string()),
        Err(_) => Some(format!("ping timed out after {}s", PING_TIMEOUT.as_secs())),
    };

    if let Some(error) = &error {
        tracing::warn!(error = %error, "database health check failed");
    }

    Json(DatabaseHealth {
        database: if error.is_none() {
            "connected"
        } else {
            "disconnected"
        },
        error,
    })
}

/// Create a new instance of the health module
pub fn create_module(engine: Arc<dyn Engine>) -> Arc<dyn Module> {
    Arc::new(HealthModule::new(engine))
}
