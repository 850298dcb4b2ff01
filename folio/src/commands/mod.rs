pub mod accounts;
pub mod market;
pub mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_auth::Settings;

use crate::app::App;
use crate::output::OutputFormat;

/// folio: brokerage accounts and market data from the command line
#[derive(Debug, Parser)]
#[command(name = "folio", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "FOLIO_CONFIG", default_value = "config.toml", global = true)]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Also print log output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in through the browser, or confirm the stored session still works
    Login,
    /// Forget the stored session
    Logout,
    /// Show the stored session without contacting the server
    Status,
    /// Hold the session open and keep it refreshed until Ctrl-C
    Keepalive,
    /// Linked accounts and their positions
    Accounts(accounts::AccountsArgs),
    /// Latest quote for a symbol
    Quote(market::QuoteArgs),
    /// Price history for a symbol
    History(market::HistoryArgs),
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let settings = Settings::load(&self.config)
            .with_context(|| format!("Failed to load configuration from {}", self.config))?;

        match &self.command {
            Commands::Login => session::login(&settings, self.format).await,
            Commands::Logout => session::logout(&settings),
            Commands::Status => session::status(&settings, self.format),
            Commands::Keepalive => session::keepalive(&settings, self.format).await,
            Commands::Accounts(args) => {
                let app = App::connect(&settings).await?;
                let result = match app.api().await {
                    Ok(api) => accounts::execute(args, api, self.format).await,
                    Err(e) => Err(e),
                };
                app.shutdown().await;
                result
            }
            Commands::Quote(args) => {
                let app = App::connect(&settings).await?;
                let result = match app.api().await {
                    Ok(api) => market::quote(args, api, self.format).await,
                    Err(e) => Err(e),
                };
                app.shutdown().await;
                result
            }
            Commands::History(args) => {
                let app = App::connect(&settings).await?;
                let result = match app.api().await {
                    Ok(api) => market::history(args, api, self.format).await,
                    Err(e) => Err(e),
                };
                app.shutdown().await;
                result
            }
        }
    }
}
