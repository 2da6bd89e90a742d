use crate::commands::{print_json, print_warning};
use crate::config::{DeployConfig, OutputFormat};
use crate::deploy::connect_provider;
use crate::signer::{checksum, signers};
use anyhow::{Context, Result};
use colored::*;
use ethers::providers::Middleware;
use ethers::signers::Signer;
use ethers::utils::format_ether;
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct AccountRow {
    index: usize,
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    balance: Option<String>,
}

/// List the signing accounts configured for a network
pub async fn run(config: &DeployConfig, network_name: &str, balances: bool) -> Result<()> {
    let network = config.network(network_name)?;
    let wallets = signers(network_name, network, None)?;

    if wallets.is_empty() {
        print_warning(&format!(
            "No accounts configured for '{}'; set {}",
            network_name, network.accounts_env
        ));
        return Ok(());
    }

    let provider = if balances {
        Some(connect_provider(
            &network.url,
            Duration::from_millis(config.deploy.poll_interval_ms),
        )?)
    } else {
        None
    };

    let mut rows = Vec::with_capacity(wallets.len());
    for (index, wallet) in wallets.iter().enumerate() {
        let balance = match &provider {
            Some(provider) => {
                let wei = provider
                    .get_balance(wallet.address(), None)
                    .await
                    .with_context(|| format!("Failed to fetch balance from '{}'", network_name))?;
                Some(format!("{} ETH", format_ether(wei)))
            }
            None => None,
        };
        rows.push(AccountRow {
            index,
            address: checksum(wallet.address()),
            balance,
        });
    }

    match &config.output_format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => {
            for row in &rows {
                match &row.balance {
                    Some(balance) => println!("{} ({})", row.address, balance),
                    None => println!("{}", row.address),
                }
            }
        }
        OutputFormat::Table => {
            println!("\n{}", format!("Accounts on {}", network_name).bold().green());

            let mut table = Table::new();
            let mut header = vec![
                Cell::new("#").style_spec("bFg"),
                Cell::new("Address").style_spec("bFg"),
            ];
            if balances {
                header.push(Cell::new("Balance").style_spec("bFg"));
            }
            table.add_row(Row::new(header));

            for row in &rows {
                let mut cells = vec![
                    Cell::new(&row.index.to_string()),
                    Cell::new(&row.address).style_spec("Fy"),
                ];
                if let Some(balance) = &row.balance {
                    cells.push(Cell::new(balance));
                }
                table.add_row(Row::new(cells));
            }
            table.printstd();
        }
    }

    Ok(())
}
