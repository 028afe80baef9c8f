use clap::Parser;
use sftpsync::config::Args;
use sftpsync::SyncEngine;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    // Status lines go to stderr so stdout stays clean for callers.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (ssh, options) = match args.into_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Starting SFTP upload to {}:{}...", ssh.host, ssh.port);
    info!("Local Dir: {:?}", options.local_root);
    info!("Remote Dir: {}", options.remote_root);
    info!("Concurrency: {}", options.concurrency);

    let engine = SyncEngine::new(options);
    if let Err(e) = engine.run(&ssh) {
        error!("Sync failed: {}", e);
        std::process::exit(1);
    }

    info!("Done.");
    Ok(())
}
