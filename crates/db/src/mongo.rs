//! [`Engine`] backed by the official MongoDB driver.

use std::time::Duration;

use async_trait::async_trait;
use bedrock_kernel::settings::DatabaseSettings;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{Error as MongoError, ErrorKind},
    options::ClientOptions,
    Client,
};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::plan::{RoleGrant, UserSpec};

const APP_NAME: &str = "bedrock";

/// A MongoDB deployment reached through a pooled [`Client`].
#[derive(Clone)]
pub struct MongoEngine {
    client: Client,
}

impl MongoEngine {
    /// Build a client from settings. The driver connects lazily, so an
    /// unreachable server only surfaces on the first command.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, EngineError> {
        let mut options = ClientOptions::parse(settings.uri.as_str())
            .await
            .map_err(|err| EngineError::Connection(err.to_string()))?;

        let timeout = Duration::from_millis(settings.connect_timeout_ms);
        options.app_name = Some(APP_NAME.to_string());
        options.max_pool_size = Some(settings.max_pool);
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client =
            Client::with_options(options).map_err(|err| EngineError::Connection(err.to_string()))?;

        tracing::info!(
            target: "bedrock-db",
            max_pool = settings.max_pool,
            "MongoDB client created"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl Engine for MongoEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|err| map_error(err, "admin", ""))?;
        Ok(())
    }

    async fn create_user(&self, database: &str, user: &UserSpec) -> Result<(), EngineError> {
        let roles: Vec<Document> = user
            .roles
            .iter()
            .map(|grant| doc! { "role": grant.role.as_str(), "db": grant.database.as_str() })
            .collect();

        self.client
            .database(database)
            .run_command(doc! {
                "createUser": user.username.as_str(),
                "pwd": user.password.as_str(),
                "roles": roles,
            })
            .await
            .map_err(|err| map_error(err, database, &user.username))?;

        tracing::debug!(target: "bedrock-db", database, username = %user.username, "user created");
        Ok(())
    }

    async fn create_collection(&self, database: &str, name: &str) -> Result<(), EngineError> {
        self.client
            .database(database)
            .create_collection(name)
            .await
            .map_err(|err| map_error(err, database, name))?;

        tracing::debug!(target: "bedrock-db", database, collection = name, "collection created");
        Ok(())
    }

    async fn user_roles(
        &self,
        database: &str,
        username: &str,
    ) -> Result<Option<Vec<RoleGrant>>, EngineError> {
        let reply = self
            .client
            .database(database)
            .run_command(doc! { "usersInfo": username })
            .await
            .map_err(|err| map_error(err, database, username))?;

        parse_users_info(&reply)
    }

    async fn collection_names(&self, database: &str) -> Result<Vec<String>, EngineError> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(|err| map_error(err, database, ""))
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        tracing::debug!(target: "bedrock-db", "MongoDB client shut down");
    }
}

/// Translate a driver error into the engine taxonomy.
fn map_error(err: MongoError, database: &str, subject: &str) -> EngineError {
    match *err.kind {
        ErrorKind::Command(ref command) => {
            EngineError::from_command(command.code, command.message.clone(), database, subject)
        }
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            EngineError::Connection(err.to_string())
        }
        _ => EngineError::Transport(err.to_string()),
    }
}

/// Extract the role grants of the first user in a `usersInfo` reply.
fn parse_users_info(reply: &Document) -> Result<Option<Vec<RoleGrant>>, EngineError> {
    let malformed = |what: &str| EngineError::Transport(format!("malformed usersInfo reply: {what}"));

    let users = reply.get_array("users").map_err(|_| malformed("missing users"))?;
    let Some(user) = users.first() else {
        return Ok(None);
    };
    let Bson::Document(user) = user else {
        return Err(malformed("user is not a document"));
    };

    let roles = user.get_array("roles").map_err(|_| malformed("missing roles"))?;
    roles
        .iter()
        .map(|role| match role {
            Bson::Document(role) => Ok(RoleGrant::new(
                role.get_str("role").map_err(|_| malformed("role name"))?,
                role.get_str("db").map_err(|_| malformed("role db"))?,
            )),
            _ => Err(malformed("role is not a document")),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedrock_kernel::settings::DatabaseSettings;

    #[test]
    fn users_info_reply_yields_roles() {
        let reply = doc! {
            "users": [{
                "_id": "app_db.admin",
                "user": "admin",
                "db": "app_db",
                "roles": [
                    { "role": "readWrite", "db": "app_db" },
                    { "role": "dbAdmin", "db": "app_db" },
                ],
            }],
            "ok": 1.0,
        };

        assert_eq!(
            parse_users_info(&reply).unwrap(),
            Some(vec![
                RoleGrant::new("readWrite", "app_db"),
                RoleGrant::new("dbAdmin", "app_db"),
            ])
        );
    }

    #[test]
    fn empty_users_info_means_absent() {
        let reply = doc! { "users": [], "ok": 1.0 };
        assert_eq!(parse_users_info(&reply).unwrap(), None);
    }

    #[test]
    fn malformed_users_info_is_a_transport_error() {
        let reply = doc! { "ok": 1.0 };
        assert!(matches!(
            parse_users_info(&reply),
            Err(EngineError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn connect_rejects_malformed_uri() {
        let settings = DatabaseSettings {
            uri: "mongodb://localhost:notaport".to_string(),
            ..DatabaseSettings::default()
        };
        assert!(matches!(
            MongoEngine::connect(&settings).await,
            Err(EngineError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn connect_is_lazy() {
        let settings = DatabaseSettings {
            uri: "mongodb://127.0.0.1:1".to_string(),
            ..DatabaseSettings::default()
        };
        assert!(MongoEngine::connect(&settings).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let settings = DatabaseSettings {
            uri: "mongodb://127.0.0.1:1".to_string(),
            connect_timeout_ms: 300,
            ..DatabaseSettings::default()
        };
        let engine = MongoEngine::connect(&settings).await.unwrap();

        assert!(matches!(engine.ping().await, Err(EngineError::Connection(_))));
        engine.shutdown().await;
    }
}
