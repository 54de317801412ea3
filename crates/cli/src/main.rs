use std::sync::Arc;

use anyhow::{bail, Context};
use bedrock_db::{
    bootstrap, mongo::MongoEngine, BootstrapError, BootstrapMode, BootstrapPlan, Engine,
};
use bedrock_kernel::settings::Settings;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bedrock-cli", version, about = "Bedrock database and service tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the bootstrap user and collection, then print a confirmation
    Bootstrap {
        #[command(flatten)]
        plan: PlanArgs,

        /// Skip the user or collection if it already exists instead of failing
        #[arg(long)]
        if_missing: bool,
    },
    /// Report whether the bootstrap user and collection exist; exits non-zero
    /// when anything is missing
    Status {
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Run the HTTP service
    Serve,
}

/// Overrides for the `[bootstrap]` settings section
#[derive(Debug, Args)]
struct PlanArgs {
    /// Target database; role grants are rescoped to it
    #[arg(long)]
    database: Option<String>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    collection: Option<String>,
}

impl PlanArgs {
    fn apply(self, settings: &Settings) -> BootstrapPlan {
        let mut plan = BootstrapPlan::from(&settings.bootstrap);
        if let Some(database) = self.database {
            plan = plan.with_database(database);
        }
        if let Some(username) = self.username {
            plan.user.username = username;
        }
        if let Some(password) = self.password {
            plan.user.password = password;
        }
        if let Some(collection) = self.collection {
            plan.collection = collection;
        }
        plan
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load Bedrock settings")?;
    bedrock_telemetry::init(&settings.telemetry);

    tracing::debug!(env = ?settings.environment, command = ?cli.command, "bedrock-cli starting");

    match cli.command {
        Command::Bootstrap { plan, if_missing } => {
            let plan = plan.apply(&settings);
            let mode = if if_missing {
                BootstrapMode::IfMissing
            } else {
                BootstrapMode::Strict
            };
            run_bootstrap(&settings, &plan, mode).await
        }
        Command::Status { plan } => {
            let plan = plan.apply(&settings);
            run_status(&settings, &plan).await
        }
        Command::Serve => bedrock_app::serve(settings).await,
    }
}

async fn run_bootstrap(
    settings: &Settings,
    plan: &BootstrapPlan,
    mode: BootstrapMode,
) -> anyhow::Result<()> {
    plan.validate()?;
    let engine = connect(settings).await?;

    let result = bootstrap::run(engine.clone(), plan, mode, &mut std::io::stdout()).await;
    engine.shutdown().await;

    match result {
        Ok(_) => Ok(()),
        Err(BootstrapError::Engine(err)) if err.is_duplicate() => Err(anyhow::Error::new(err)
            .context("database is already bootstrapped; pass --if-missing to keep what exists")),
        Err(err) => Err(anyhow::Error::new(err).context("database bootstrap failed")),
    }
}

async fn run_status(settings: &Settings, plan: &BootstrapPlan) -> anyhow::Result<()> {
    plan.validate()?;
    let engine = connect(settings).await?;

    let result = bootstrap::inspect(&*engine, plan).await;
    engine.shutdown().await;

    let status = result.context("failed to read bootstrap status")?;
    println!("{}", serde_json::to_string_pretty(&status)?);

    if !status.complete {
        bail!(
            "database {} is not bootstrapped for user {}",
            status.database,
            status.username
        );
    }
    Ok(())
}

async fn connect(settings: &Settings) -> anyhow::Result<Arc<dyn Engine>> {
    let engine = MongoEngine::connect(&settings.database)
        .await
        .context("failed to create MongoDB client")?;
    Ok(Arc::new(engine))
}
