use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use bedrock_db::{bootstrap, BootstrapError, BootstrapPlan, BootstrapStatus, Engine, EngineError};
use bedrock_http::error::AppError;
use bedrock_kernel::{InitCtx, Module};
use serde_json::json;

/// Read-only view of whether the bootstrap user and collection exist
pub struct BootstrapModule {
    state: BootstrapState,
}

#[derive(Clone)]
struct BootstrapState {
    engine: Arc<dyn Engine>,
    plan: Arc<BootstrapPlan>,
}

impl BootstrapModule {
    pub fn new(engine: Arc<dyn Engine>, plan: BootstrapPlan) -> Self {
        Self {
            state: BootstrapState {
                engine,
                plan: Arc::new(plan),
            },
        }
    }
}

#[async_trait]
impl Module for BootstrapModule {
    fn name(&self) -> &'static str {
        "bootstrap"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            database = %self.state.plan.database,
            username = %self.state.plan.user.username,
            "bootstrap module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(bootstrap_status))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Bootstrap status",
                        "tags": ["Bootstrap"],
                        "responses": {
                            "200": {
                                "description": "Observed state of the bootstrap user and collection",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BootstrapStatus" }
                                    }
                                }
                            },
                            "503": {
                                "description": "Database unreachable",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "BootstrapStatus": {
                        "type": "object",
                        "properties": {
                            "database": { "type": "string" },
                            "username": { "type": "string" },
                            "user_roles": {
                                "type": "array",
                                "description": "Null when the user does not exist",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "role": { "type": "string" },
                                        "db": { "type": "string" }
                                    },
                                    "required": ["role", "db"]
                                }
                            },
                            "collection": { "type": "string" },
                            "collection_present": { "type": "boolean" },
                            "complete": { "type": "boolean" }
                        },
                        "required": ["database", "username", "collection", "collection_present", "complete"]
                    }
                }
            }
        }))
    }
}

async fn bootstrap_status(
    State(state): State<BootstrapState>,
) -> Result<Json<BootstrapStatus>, AppError> {
    bootstrap::inspect(&*state.engine, &state.plan)
        .await
        .map(Json)
        .map_err(|err| match err {
            BootstrapError::Engine(EngineError::Connection(message)) => {
                AppError::unavailable(message)
            }
            other => AppError::Internal(other.into()),
        })
}

/// Create a new instance of the bootstrap module
pub fn create_module(engine: Arc<dyn Engine>, plan: BootstrapPlan) -> Arc<dyn Module> {
    Arc::new(BootstrapModule::new(engine, plan))
}
