use clap::Parser;

use folio::commands::Cli;
use folio::logging::init_logging;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let logs = match init_logging(cli.verbose) {
        Ok(logs) => logs,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(command = ?cli.command, log = %logs.path.display(), "folio starting");

    if let Err(e) = cli.execute().await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
