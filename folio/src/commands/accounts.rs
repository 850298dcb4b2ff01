use anyhow::Result;
use clap::{Args, Subcommand};
use schwab_api::endpoints::accounts::{Account, AccountNumber};
use schwab_api::{Client, Request};

use crate::output::{self, money, OutputFormat};

#[derive(Debug, Args)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: Option<AccountsCommand>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AccountsCommand {
    /// Every linked account with positions (default)
    List,
    /// Account numbers and the hashes used to address them
    Numbers,
    /// One account, by hash
    Show {
        /// Hash value from `folio accounts numbers`
        hash: String,
    },
}

pub async fn execute(args: &AccountsArgs, api: &Client, format: OutputFormat) -> Result<()> {
    match args.command.clone().unwrap_or(AccountsCommand::List) {
        AccountsCommand::List => {
            let accounts = api.send(Request::accounts().list()).await?;
            tracing::info!(count = accounts.len(), "Loaded accounts");

            output::print(&accounts, format, |accounts| {
                if accounts.is_empty() {
                    println!("No linked accounts.");
                }
                for account in accounts {
                    print_account(account);
                }
            })
        }
        AccountsCommand::Numbers => {
            let numbers = api.send(Request::accounts().numbers()).await?;

            output::print(&numbers, format, |numbers: &Vec<AccountNumber>| {
                for number in numbers {
                    println!("{}  {}", mask(&number.account_number), number.hash_value);
                }
            })
        }
        AccountsCommand::Show { hash } => {
            let account = api.send(Request::accounts().get(hash)).await?;

            output::print(&account, format, print_account)
        }
    }
}

fn print_account(account: &Account) {
    let securities = &account.securities_account;
    let balances = securities.current_balances.clone().unwrap_or_default();

    println!(
        "\n{} ({:?})  value {}  cash {}  buying power {}",
        mask(&securities.account_number),
        securities.account_type,
        money(balances.liquidation_value),
        money(balances.cash_balance),
        money(balances.buying_power),
    );

    if securities.positions.is_empty() {
        println!("  no positions");
        return;
    }

    println!(
        "  {:<10} {:>12} {:>12} {:>14} {:>12}",
        "SYMBOL", "QTY", "AVG PRICE", "MARKET VALUE", "DAY P/L"
    );
    for position in &securities.positions {
        println!(
            "  {:<10} {:>12.4} {:>12.2} {:>14.2} {:>12.2}",
            position.instrument.symbol,
            position.quantity(),
            position.average_price,
            position.market_value,
            position.current_day_profit_loss,
        );
    }
}

/// Shows only the last four digits.
fn mask(account_number: &str) -> String {
    let visible = account_number.len().saturating_sub(4);
    match account_number.get(visible..) {
        Some(tail) => format!("****{}", tail),
        None => "****".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask("12345678"), "****5678");
        assert_eq!(mask("12"), "****12");
    }
}
