//! In-process [`Engine`] with the duplicate-entity semantics of a real server.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::plan::{RoleGrant, UserSpec};

#[derive(Debug, Default)]
struct DatabaseState {
    users: BTreeMap<String, UserSpec>,
    collections: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryEngine {
    databases: Mutex<HashMap<String, DatabaseState>>,
    unreachable: bool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose every call fails with [`EngineError::Connection`].
    pub fn unreachable() -> Self {
        Self {
            databases: Mutex::default(),
            unreachable: true,
        }
    }

    /// Check a username/password pair against the users of `database`.
    pub fn authenticate(&self, database: &str, username: &str, password: &str) -> bool {
        self.lock()
            .get(database)
            .and_then(|db| db.users.get(username))
            .is_some_and(|user| user.password == password)
    }

    /// Number of users stored in `database`.
    pub fn user_count(&self, database: &str) -> usize {
        self.lock().get(database).map_or(0, |db| db.users.len())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DatabaseState>> {
        // A panic while holding the lock cannot leave the maps half-updated.
        self.databases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn reachable(&self) -> Result<(), EngineError> {
        if self.unreachable {
            Err(EngineError::Connection(
                "server selection timeout: no available servers".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.reachable()
    }

    async fn create_user(&self, database: &str, user: &UserSpec) -> Result<(), EngineError> {
        self.reachable()?;
        let mut databases = self.lock();
        let db = databases.entry(database.to_string()).or_default();
        if db.users.contains_key(&user.username) {
            return Err(EngineError::DuplicateUser {
                username: user.username.clone(),
                database: database.to_string(),
            });
        }
        db.users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn create_collection(&self, database: &str, name: &str) -> Result<(), EngineError> {
        self.reachable()?;
        let mut databases = self.lock();
        let db = databases.entry(database.to_string()).or_default();
        if !db.collections.insert(name.to_string()) {
            return Err(EngineError::DuplicateCollection {
                database: database.to_string(),
                collection: name.to_string(),
            });
        }
        Ok(())
    }

    async fn user_roles(
        &self,
        database: &str,
        username: &str,
    ) -> Result<Option<Vec<RoleGrant>>, EngineError> {
        self.reachable()?;
        Ok(self
            .lock()
            .get(database)
            .and_then(|db| db.users.get(username))
            .map(|user| user.roles.clone()))
    }

    async fn collection_names(&self, database: &str) -> Result<Vec<String>, EngineError> {
        self.reachable()?;
        Ok(self
            .lock()
            .get(database)
            .map(|db| db.collections.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::BootstrapPlan;

    #[tokio::test]
    async fn duplicate_user_leaves_original_untouched() {
        let engine = MemoryEngine::new();
        let plan = BootstrapPlan::default();
        engine.create_user("app_db", &plan.user).await.unwrap();

        let mut impostor = plan.user.clone();
        impostor.password = "other".to_string();
        let err = engine.create_user("app_db", &impostor).await.unwrap_err();

        assert!(matches!(err, EngineError::DuplicateUser { .. }));
        assert!(engine.authenticate("app_db", "admin", "admin"));
        assert!(!engine.authenticate("app_db", "admin", "other"));
    }

    #[tokio::test]
    async fn users_are_scoped_per_database() {
        let engine = MemoryEngine::new();
        let plan = BootstrapPlan::default();
        engine.create_user("app_db", &plan.user).await.unwrap();
        engine.create_user("other_db", &plan.user).await.unwrap();

        assert_eq!(engine.user_count("app_db"), 1);
        assert_eq!(engine.user_roles("third", "admin").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreachable_engine_fails_every_call() {
        let engine = MemoryEngine::unreachable();
        assert!(matches!(
            engine.ping().await,
            Err(EngineError::Connection(_))
        ));
        assert!(matches!(
            engine.collection_names("app_db").await,
            Err(EngineError::Connection(_))
        ));
    }
}
