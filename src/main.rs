use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pocketftpd::config::{log_config, Config};
use pocketftpd::core_cli::Cli;
use pocketftpd::core_log::logger::{init_logger, log_message};
use pocketftpd::settings::{settings_path, Settings};
use pocketftpd::FtpServer;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_logger(args.verbose);

    let mut config = match args.config.as_deref() {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    if let Some(path) = settings_path(args.settings.as_deref(), &config.server) {
        let settings = Settings::load_over(&path, Settings::from_config(&config.server))
            .with_context(|| format!("Failed to load settings: {}", path.display()))?;
        settings.apply_to(&mut config.server);
    }

    info!("Starting {}", config.server.banner);
    log_config(&config);

    let server = Arc::new(FtpServer::new(config.server));
    server.register_screen_log_callback(Some(Arc::new(|message: &str| {
        println!("{}", log_message(message));
    })));
    server.start()?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    let stopping = Arc::clone(&server);
    tokio::task::spawn_blocking(move || stopping.stop())
        .await
        .context("Stop task failed")??;
    Ok(())
}
