//! One-shot provisioning of the development database.
//!
//! [`run`] selects the plan's database, creates its user, creates its
//! collection, then writes a confirmation line. Each step is awaited before
//! the next and the first failure aborts the rest. Nothing is rolled back: a
//! failed collection step leaves the user in place for an operator to clean
//! up.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use crate::engine::{AdminSession, Engine};
use crate::error::BootstrapError;
use crate::plan::{BootstrapPlan, RoleGrant};

/// How to treat entities that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapMode {
    /// Create unconditionally; an existing user or collection is an error.
    #[default]
    Strict,
    /// Check first and skip whatever is already present.
    IfMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Created,
    AlreadyPresent,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub database: String,
    pub username: String,
    pub collection: String,
    pub user: StepOutcome,
    pub collection_outcome: StepOutcome,
}

impl BootstrapReport {
    /// The line printed once every step has succeeded.
    pub fn confirmation(&self) -> String {
        format!(
            "Database {} initialized with user {}",
            self.database, self.username
        )
    }
}

/// Provision `plan` through `engine`, writing the confirmation to `out`.
///
/// The confirmation is written only when both the user and collection steps
/// succeed; a failed write is ignored.
pub async fn run<W: Write>(
    engine: Arc<dyn Engine>,
    plan: &BootstrapPlan,
    mode: BootstrapMode,
    out: &mut W,
) -> Result<BootstrapReport, BootstrapError> {
    plan.validate()?;

    tracing::info!(
        target: "bedrock-db",
        database = %plan.database,
        username = %plan.user.username,
        collection = %plan.collection,
        mode = ?mode,
        "bootstrap starting"
    );

    let mut session = AdminSession::open(engine).await?;
    let result = provision(&mut session, plan, mode).await;
    session.close();

    let report = result.inspect_err(|err| {
        tracing::error!(target: "bedrock-db", error = %err, "bootstrap aborted");
    })?;

    let _ = writeln!(out, "{}", report.confirmation());
    tracing::info!(
        target: "bedrock-db",
        user = ?report.user,
        collection = ?report.collection_outcome,
        "bootstrap complete"
    );

    Ok(report)
}

async fn provision(
    session: &mut AdminSession,
    plan: &BootstrapPlan,
    mode: BootstrapMode,
) -> Result<BootstrapReport, BootstrapError> {
    session.select_database(&plan.database);

    let existing_roles = match mode {
        BootstrapMode::IfMissing => session.user_roles(&plan.user.username).await?,
        BootstrapMode::Strict => None,
    };

    let user = if let Some(roles) = existing_roles {
        if same_grants(&roles, &plan.user.roles) {
            tracing::info!(target: "bedrock-db", username = %plan.user.username, "user already present");
        } else {
            tracing::warn!(
                target: "bedrock-db",
                username = %plan.user.username,
                existing = ?roles,
                planned = ?plan.user.roles,
                "user already present with different roles; leaving it unchanged"
            );
        }
        StepOutcome::AlreadyPresent
    } else {
        session.create_user(&plan.user).await?;
        tracing::info!(target: "bedrock-db", username = %plan.user.username, "user created");
        StepOutcome::Created
    };

    let collection_outcome = if mode == BootstrapMode::IfMissing
        && session.collection_exists(&plan.collection).await?
    {
        tracing::info!(target: "bedrock-db", collection = %plan.collection, "collection already present");
        StepOutcome::AlreadyPresent
    } else {
        session.create_collection(&plan.collection).await?;
        tracing::info!(target: "bedrock-db", collection = %plan.collection, "collection created");
        StepOutcome::Created
    };

    Ok(BootstrapReport {
        database: plan.database.clone(),
        username: plan.user.username.clone(),
        collection: plan.collection.clone(),
        user,
        collection_outcome,
    })
}

/// Observed state of a plan's user and collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapStatus {
    pub database: String,
    pub username: String,
    /// Role grants of the user, `None` when the user does not exist.
    pub user_roles: Option<Vec<RoleGrant>>,
    pub collection: String,
    pub collection_present: bool,
    /// Whether the user exists with exactly the planned roles and the
    /// collection exists.
    pub complete: bool,
}

/// Read the current state of `plan` without modifying anything.
pub async fn inspect(
    engine: &dyn Engine,
    plan: &BootstrapPlan,
) -> Result<BootstrapStatus, BootstrapError> {
    let user_roles = engine
        .user_roles(&plan.database, &plan.user.username)
        .await?;
    let collection_present = engine
        .collection_names(&plan.database)
        .await?
        .iter()
        .any(|name| *name == plan.collection);

    let complete = collection_present
        && user_roles
            .as_ref()
            .is_some_and(|roles| same_grants(roles, &plan.user.roles));

    Ok(BootstrapStatus {
        database: plan.database.clone(),
        username: plan.user.username.clone(),
        user_roles,
        collection: plan.collection.clone(),
        collection_present,
        complete,
    })
}

fn same_grants(actual: &[RoleGrant], expected: &[RoleGrant]) -> bool {
    let mut actual = actual.to_vec();
    let mut expected = expected.to_vec();
    actual.sort();
    expected.sort();
    actual == expected
}
