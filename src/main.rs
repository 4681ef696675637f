use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use motoctl_lib::cli::{run_cli, Cli};
use motoctl_lib::settings::EngineSettings;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings_path = cli.settings.clone().unwrap_or_else(EngineSettings::default_path);
    let settings = match EngineSettings::load(&settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Settings Error: {}", e);
            std::process::exit(2);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run_cli(cli, settings).await {
        eprintln!("CLI Error: {:#}", e);
        std::process::exit(1);
    }
}
