use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::plan::{RoleGrant, UserSpec};

/// The database engine operations the bootstrap procedure and health checks
/// depend on. Atomicity and error codes are owned by the engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Round-trip to the engine to prove it is reachable.
    async fn ping(&self) -> Result<(), EngineError>;

    /// Create `user` in `database`. Existing users yield
    /// [`EngineError::DuplicateUser`].
    async fn create_user(&self, database: &str, user: &UserSpec) -> Result<(), EngineError>;

    /// Create an empty collection. Existing collections yield
    /// [`EngineError::DuplicateCollection`].
    async fn create_collection(&self, database: &str, name: &str) -> Result<(), EngineError>;

    /// Role grants of `username` in `database`, or `None` if no such user.
    async fn user_roles(
        &self,
        database: &str,
        username: &str,
    ) -> Result<Option<Vec<RoleGrant>>, EngineError>;

    async fn collection_names(&self, database: &str) -> Result<Vec<String>, EngineError>;

    /// Release connections. The engine must not be used afterwards.
    async fn shutdown(&self) {}
}

/// An administrative session scoped to one run of the bootstrap procedure.
///
/// Holds the active database selected with [`AdminSession::select_database`];
/// every write goes to that database. Consumed by [`AdminSession::close`].
pub struct AdminSession {
    engine: Arc<dyn Engine>,
    database: Option<String>,
}

impl AdminSession {
    /// Open a session, failing with [`EngineError::Connection`] when the
    /// engine cannot be reached.
    pub async fn open(engine: Arc<dyn Engine>) -> Result<Self, EngineError> {
        engine.ping().await?;
        tracing::debug!(target: "bedrock-db", "administrative session opened");
        Ok(Self {
            engine,
            database: None,
        })
    }

    /// Switch the active database. No engine round-trip.
    pub fn select_database(&mut self, name: &str) {
        tracing::debug!(target: "bedrock-db", database = name, "database selected");
        self.database = Some(name.to_string());
    }

    pub fn database(&self) -> Result<&str, EngineError> {
        self.database
            .as_deref()
            .ok_or(EngineError::NoDatabaseSelected)
    }

    pub async fn create_user(&self, user: &UserSpec) -> Result<(), EngineError> {
        let database = self.database()?;
        self.engine.create_user(database, user).await
    }

    pub async fn create_collection(&self, name: &str) -> Result<(), EngineError> {
        let database = self.database()?;
        self.engine.create_collection(database, name).await
    }

    /// Role grants of `username` on the selected database, `None` when absent.
    pub async fn user_roles(&self, username: &str) -> Result<Option<Vec<RoleGrant>>, EngineError> {
        let database = self.database()?;
        self.engine.user_roles(database, username).await
    }

    pub async fn collection_exists(&self, name: &str) -> Result<bool, EngineError> {
        let database = self.database()?;
        let names = self.engine.collection_names(database).await?;
        Ok(names.iter().any(|existing| existing == name))
    }

    /// End the session. The engine itself stays open for its owner.
    pub fn close(self) {
        tracing::debug!(
            target: "bedrock-db",
            database = self.database.as_deref().unwrap_or("-"),
            "administrative session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEngine;
    use crate::plan::BootstrapPlan;

    #[tokio::test]
    async fn writes_require_a_selected_database() {
        let session = AdminSession::open(Arc::new(MemoryEngine::new()))
            .await
            .unwrap();
        let plan = BootstrapPlan::default();

        assert_eq!(
            session.create_user(&plan.user).await,
            Err(EngineError::NoDatabaseSelected)
        );
        assert_eq!(
            session.create_collection("initial").await,
            Err(EngineError::NoDatabaseSelected)
        );
    }

    #[tokio::test]
    async fn open_fails_on_unreachable_engine() {
        let result = AdminSession::open(Arc::new(MemoryEngine::unreachable())).await;
        assert!(matches!(result, Err(EngineError::Connection(_))));
    }

    #[tokio::test]
    async fn writes_land_in_the_selected_database() {
        let engine = Arc::new(MemoryEngine::new());
        let mut session = AdminSession::open(engine.clone()).await.unwrap();
        session.select_database("orders");
        session.create_collection("invoices").await.unwrap();
        assert!(session.collection_exists("invoices").await.unwrap());
        session.close();

        assert_eq!(
            engine.collection_names("orders").await.unwrap(),
            vec!["invoices".to_string()]
        );
        assert!(engine.collection_names("app_db").await.unwrap().is_empty());
    }
}
