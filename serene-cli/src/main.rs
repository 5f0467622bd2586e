use clap::Parser;
use serene_cli::{Cli, execute, settings::Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    serene_telemetry::init_telemetry(&settings.telemetry)?;

    execute(cli, settings).await
}
