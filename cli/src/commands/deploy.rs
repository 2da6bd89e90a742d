use crate::artifact::{ArtifactStore, ContractName};
use crate::commands::{print_json, print_warning, spinner};
use crate::config::{DeployConfig, OutputFormat};
use crate::deploy::{Deployer, Deployment};
use crate::signer::checksum;
use anyhow::Result;
use colored::*;
use ethers::utils::format_ether;
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;

pub async fn run(
    config: &DeployConfig,
    network: &str,
    contract: &str,
    artifacts: Option<PathBuf>,
) -> Result<()> {
    let contract = ContractName::parse(contract);
    let store = ArtifactStore::new(artifacts.unwrap_or_else(|| config.paths.artifacts.clone()));

    let deployer = Deployer::connect(config, network).await?;
    if config.output_format != OutputFormat::Json {
        println!(
            "Deploying contracts with the account: {}",
            checksum(deployer.address())
        );
    }

    match deployer.balance().await {
        Ok(balance) if balance.is_zero() => {
            if config.output_format == OutputFormat::Json {
                log::warn!("Deployer account has no funds on this network");
            } else {
                print_warning("Deployer account has no funds on this network");
            }
        }
        Ok(balance) => log::info!("Account balance: {} ETH", format_ether(balance)),
        Err(e) => log::debug!("{:#}", e),
    }

    let artifact = store.load(&contract)?;
    store.warn_on_compiler_mismatch(&contract, &config.solidity);

    let progress = spinner(&format!(
        "Waiting for {} confirmation(s) on {}...",
        config.deploy.confirmations, network
    ));
    let result = deployer.deploy(&artifact, config.deploy.confirmations).await;
    progress.finish_and_clear();
    let deployment = result?;

    log::info!(
        "Deployed in block {:?}, gas used {}",
        deployment.block_number,
        deployment.gas_used.as_deref().unwrap_or("unknown")
    );
    show(&deployment, &artifact.contract_name, &config.output_format)
}

fn show(deployment: &Deployment, name: &str, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(deployment)?,
        OutputFormat::Text => {
            println!("{} address: {}", name, deployment.address);
        }
        OutputFormat::Table => {
            println!("{} address: {}", name, deployment.address.green().bold());

            let mut table = Table::new();
            let rows = [
                ("Contract", deployment.contract.clone()),
                ("Network", format!("{} (chain {})", deployment.network, deployment.chain_id)),
                ("Deployer", deployment.deployer.clone()),
                (
                    "Transaction",
                    deployment.transaction_hash.clone().unwrap_or_default(),
                ),
                (
                    "Block",
                    deployment
                        .block_number
                        .map(|n| n.to_string())
                        .unwrap_or_default(),
                ),
                ("Gas Used", deployment.gas_used.clone().unwrap_or_default()),
            ];
            for (label, value) in rows {
                table.add_row(Row::new(vec![
                    Cell::new(label).style_spec("bFg"),
                    Cell::new(&value),
                ]));
            }
            table.printstd();
        }
    }
    Ok(())
}
