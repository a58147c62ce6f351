use clap::Parser;
use frontdesk_console::{Cli, ConsoleConfig, ConsoleNavigator, run};
use frontdesk_platform_access::{Authority, FileStore, Services};
use frontdesk_remote::RemoteClient;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match ConsoleConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let client = match RemoteClient::new(&config.api_base_url) {
        Ok(client) => client,
        Err(report) => {
            tracing::error!(error = %report, "failed to build API client");
            return ExitCode::FAILURE;
        }
    };

    let navigator = Arc::new(ConsoleNavigator::new());
    let authority = Authority::new(
        &config.access,
        Arc::new(FileStore::new(&config.state_path)),
        Services::from_client(client),
        navigator.clone(),
    );

    let hydration = authority.initialize();
    let result = run(cli.command, &authority, navigator).await;
    hydration.settled().await;

    for notice in authority.take_notices() {
        eprintln!("{notice}");
    }

    match result {
        Ok(output) => {
            for line in &output.lines {
                println!("{line}");
            }
            if output.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(report) => {
            tracing::debug!(error = %report, "command failed");
            ExitCode::FAILURE
        }
    }
}
