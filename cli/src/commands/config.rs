use crate::commands::{print_info, print_json, print_success};
use crate::config::{ConfigFile, DeployConfig, OutputFormat, CONFIG_FILE_NAME};
use crate::error::DeployError;
use anyhow::{Context, Result};
use colored::*;
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;

pub async fn show(config: &DeployConfig, active_network: &str) -> Result<()> {
    match &config.output_format {
        OutputFormat::Json => {
            print_json(config)?;
        }
        _ => {
            println!("\n{}", "Current Configuration".bold().green());
            println!("{}", "=".repeat(50));

            let mut table = Table::new();
            table.add_row(Row::new(vec![
                Cell::new("Setting").style_spec("bFg"),
                Cell::new("Value").style_spec("bFg"),
            ]));

            let solidity = &config.solidity;
            table.add_row(Row::new(vec![
                Cell::new("Compiler"),
                Cell::new(&format!(
                    "solc {} (optimizer {}, {} runs, viaIR {})",
                    solidity.version,
                    if solidity.optimizer.enabled { "on" } else { "off" },
                    solidity.optimizer.runs,
                    solidity.via_ir
                )),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Active Network"),
                Cell::new(active_network).style_spec("Fy"),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Artifacts"),
                Cell::new(&config.paths.artifacts.display().to_string()),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Confirmations"),
                Cell::new(&config.deploy.confirmations.to_string()),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Explorer Timeout"),
                Cell::new(&format!("{} seconds", config.timeout)),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Output Format"),
                Cell::new(&format!("{:?}", config.output_format)),
            ]));

            for (name, network) in &config.networks {
                let accounts = if network.accounts.is_empty() {
                    format!("none ({} unset)", network.accounts_env)
                } else {
                    format!("{} from {}", network.accounts.len(), network.accounts_env)
                };
                table.add_row(Row::new(vec![
                    Cell::new(&format!("Network {}", name)),
                    Cell::new(&format!("{}\naccounts: {}", network.url, accounts)),
                ]));
            }

            for chain in &config.etherscan.custom_chains {
                let key = match config.etherscan.api_key.get(&chain.network) {
                    Some(entry) if entry.key.is_some() => format!("set ({})", entry.env),
                    Some(entry) => format!("missing ({} unset)", entry.env),
                    None => "not configured".to_string(),
                };
                table.add_row(Row::new(vec![
                    Cell::new(&format!("Explorer {}", chain.network)),
                    Cell::new(&format!(
                        "chain {}\napi: {}\nbrowser: {}\nkey: {}",
                        chain.chain_id, chain.urls.api_url, chain.urls.browser_url, key
                    )),
                ]));
            }

            table.printstd();

            match ConfigFile::locate(None)? {
                Some(path) => println!("\nConfig file: {}", path.display().to_string().cyan()),
                None => print_info("No config file found; using built-in settings"),
            }
        }
    }

    Ok(())
}

/// Write a starter `deployer.toml` reflecting the current settings
pub async fn init(config: &DeployConfig, force: bool, global: bool) -> Result<()> {
    let path = if global {
        ConfigFile::global_path().context("Failed to get home directory")?
    } else {
        PathBuf::from(CONFIG_FILE_NAME)
    };

    if path.exists() && !force {
        return Err(DeployError::ConfigFile(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        ))
        .into());
    }

    ConfigFile::template(config).save(&path)?;
    print_success(&format!("Wrote {}", path.display()));

    Ok(())
}
