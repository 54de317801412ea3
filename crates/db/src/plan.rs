//! What the bootstrap procedure provisions.

use bedrock_kernel::settings::BootstrapSettings;
use serde::Serialize;

use crate::error::BootstrapError;

/// A `(role, database)` pair granted to a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RoleGrant {
    pub role: String,
    #[serde(rename = "db")]
    pub database: String,
}

impl RoleGrant {
    pub fn new(role: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            database: database.into(),
        }
    }
}

/// A user credential record as sent to `createUser`.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub username: String,
    pub password: String,
    pub roles: Vec<RoleGrant>,
}

// Keeps the password out of logs.
impl std::fmt::Debug for UserSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSpec")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

/// The database, user, and collection a bootstrap run provisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPlan {
    pub database: String,
    pub user: UserSpec,
    pub collection: String,
}

impl BootstrapPlan {
    /// Reject empty names and role grants scoped to another database.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        let required = [
            ("database", &self.database),
            ("username", &self.user.username),
            ("password", &self.user.password),
            ("collection", &self.collection),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(BootstrapError::InvalidPlan(format!("{field} must not be empty")));
        }

        if self.user.roles.is_empty() {
            return Err(BootstrapError::InvalidPlan(
                "at least one role grant is required".to_string(),
            ));
        }

        for grant in &self.user.roles {
            if grant.role.is_empty() {
                return Err(BootstrapError::InvalidPlan(
                    "role name must not be empty".to_string(),
                ));
            }
            if grant.database != self.database {
                return Err(BootstrapError::InvalidPlan(format!(
                    "role '{}' is scoped to '{}' but the user belongs to '{}'",
                    grant.role, grant.database, self.database
                )));
            }
        }

        Ok(())
    }

    /// Point the plan at another database, rescoping every role grant with it.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        for grant in &mut self.user.roles {
            grant.database = self.database.clone();
        }
        self
    }
}

impl Default for BootstrapPlan {
    fn default() -> Self {
        Self::from(&BootstrapSettings::default())
    }
}

impl From<&BootstrapSettings> for BootstrapPlan {
    fn from(settings: &BootstrapSettings) -> Self {
        Self {
            database: settings.database.clone(),
            user: UserSpec {
                username: settings.username.clone(),
                password: settings.password.clone(),
                roles: settings
                    .roles
                    .iter()
                    .map(|grant| RoleGrant::new(&grant.role, &grant.db))
                    .collect(),
            },
            collection: settings.collection.clone(),
        }
    }
}
