//! Error types for engine calls and the bootstrap procedure.

use thiserror::Error;

/// MongoDB server error code for `createUser` on an existing user.
pub const DUPLICATE_USER_CODE: i32 = 51003;
/// MongoDB `NamespaceExists` error code.
pub const NAMESPACE_EXISTS_CODE: i32 = 48;

/// Failures reported by an [`crate::Engine`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("user \"{username}@{database}\" already exists")]
    DuplicateUser { username: String, database: String },

    #[error("collection \"{database}.{collection}\" already exists")]
    DuplicateCollection {
        database: String,
        collection: String,
    },

    #[error("no database selected on the administrative session")]
    NoDatabaseSelected,

    #[error("command failed with code {code}: {message}")]
    Command { code: i32, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl EngineError {
    /// True for the duplicate-entity errors a second bootstrap run produces.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            EngineError::DuplicateUser { .. } | EngineError::DuplicateCollection { .. }
        )
    }

    /// Classify a server command failure by its error code.
    ///
    /// `subject` is the user name for `createUser` and the collection name for
    /// `create`; it only feeds the duplicate variants.
    pub fn from_command(code: i32, message: String, database: &str, subject: &str) -> Self {
        match code {
            DUPLICATE_USER_CODE => EngineError::DuplicateUser {
                username: subject.to_string(),
                database: database.to_string(),
            },
            NAMESPACE_EXISTS_CODE => EngineError::DuplicateCollection {
                database: database.to_string(),
                collection: subject.to_string(),
            },
            _ => EngineError::Command { code, message },
        }
    }
}

/// Failures of the bootstrap procedure as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("invalid bootstrap plan: {0}")]
    InvalidPlan(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_codes_are_classified() {
        let user = EngineError::from_command(
            DUPLICATE_USER_CODE,
            "User \"admin@app_db\" already exists".into(),
            "app_db",
            "admin",
        );
        assert_eq!(
            user,
            EngineError::DuplicateUser {
                username: "admin".into(),
                database: "app_db".into()
            }
        );
        assert!(user.is_duplicate());

        let collection =
            EngineError::from_command(NAMESPACE_EXISTS_CODE, "exists".into(), "app_db", "initial");
        assert_eq!(collection.to_string(), "collection \"app_db.initial\" already exists");
        assert!(collection.is_duplicate());
    }

    #[test]
    fn other_codes_pass_through() {
        let err = EngineError::from_command(13, "not authorized".into(), "app_db", "admin");
        assert_eq!(
            err,
            EngineError::Command {
                code: 13,
                message: "not authorized".into()
            }
        );
        assert!(!err.is_duplicate());
    }

    #[test]
    fn bootstrap_error_is_transparent_over_engine_errors() {
        let err = BootstrapError::from(EngineError::Connection("refused".into()));
        assert_eq!(err.to_string(), "connection error: refused");
    }
}
