use anyhow::Context;
use bedrock_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Bedrock settings")?;
    bedrock_telemetry::init(&settings.telemetry);

    tracing::info!(
        env = ?settings.environment,
        database = %settings.database.database,
        port = settings.server.port,
        "bedrock-app starting"
    );

    bedrock_app::serve(settings).await
}
