use crate::artifact::{ArtifactStore, ContractName};
use crate::commands::{print_json, print_info, print_success, spinner};
use crate::config::{DeployConfig, OutputFormat};
use crate::error::DeployError;
use crate::explorer::{ExplorerClient, Submission, VerificationRequest, VerificationStatus};
use crate::signer::checksum;
use anyhow::{anyhow, Result};
use ethers::types::Address;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);
const MAX_STATUS_CHECKS: u32 = 20;

pub async fn run(
    config: &DeployConfig,
    network: &str,
    address: &str,
    contract: &str,
    artifacts: Option<PathBuf>,
) -> Result<()> {
    let address: Address = address
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid contract address '{}'", address))?;
    let address = checksum(address);

    let chain = config
        .custom_chain(network)
        .ok_or_else(|| DeployError::NoExplorer(network.to_string()))?;
    let api_key = config
        .explorer_api_key(network)
        .cloned()
        .ok_or_else(|| DeployError::NoExplorerApiKey(network.to_string()))?;
    let client = ExplorerClient::new(chain, api_key, config.timeout)?;

    if client.is_verified(&address).await? {
        return report(&client, &address, true, &config.output_format);
    }

    let contract = ContractName::parse(contract);
    let store = ArtifactStore::new(artifacts.unwrap_or_else(|| config.paths.artifacts.clone()));
    let artifact = store.load(&contract)?;
    let build_info = store.build_info(&contract)?;
    for mismatch in build_info.compiler_mismatches(&config.solidity) {
        log::warn!("{} was compiled with {}", contract, mismatch);
    }

    let request = VerificationRequest {
        address: address.clone(),
        source_code: build_info.standard_json_input()?,
        contract_name: artifact.qualified_name(),
        compiler_version: build_info.compiler_version_tag(),
        constructor_args: String::new(),
    };

    if config.output_format != OutputFormat::Json {
        print_info(&format!(
            "Submitting {} at {} for verification on {}",
            request.contract_name, address, network
        ));
    }
    let guid = match client.submit(&request).await? {
        Submission::Queued(guid) => guid,
        Submission::AlreadyVerified => {
            return report(&client, &address, true, &config.output_format);
        }
    };
    log::debug!("Verification GUID: {}", guid);

    let progress = spinner("Waiting for the explorer to verify...");
    let status = client
        .wait_for(&guid, STATUS_POLL_INTERVAL, MAX_STATUS_CHECKS)
        .await;
    progress.finish_and_clear();

    match status? {
        status if status.is_success() => report(&client, &address, false, &config.output_format),
        VerificationStatus::Failed(reason) => Err(DeployError::VerificationFailed(reason).into()),
        _ => Err(DeployError::VerificationTimedOut(MAX_STATUS_CHECKS).into()),
    }
}

fn report(
    client: &ExplorerClient,
    address: &str,
    already: bool,
    format: &OutputFormat,
) -> Result<()> {
    let url = client.contract_url(address);
    match format {
        OutputFormat::Json => print_json(&json!({
            "address": address,
            "verified": true,
            "already_verified": already,
            "url": url,
        })),
        _ => {
            if already {
                print_success(&format!("Contract {} is already verified", address));
            } else {
                print_success(&format!("Successfully verified contract {}", address));
            }
            println!("{}", url);
            Ok(())
        }
    }
}
