//! The deployment procedure: acquire a signer, submit the contract's
//! creation bytecode and wait for the receipt.

use crate::artifact::Artifact;
use crate::config::DeployConfig;
use crate::error::DeployError;
use crate::signer::{checksum, first_signer};
use anyhow::{Context, Result};
use ethers::contract::ContractFactory;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub type DeployClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Outcome of a successful deployment
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    pub contract: String,
    pub network: String,
    pub chain_id: u64,
    pub deployer: String,
    pub address: String,
    pub transaction_hash: Option<String>,
    pub block_number: Option<u64>,
    pub gas_used: Option<String>,
}

/// HTTP provider for a network URL. No request timeout is applied.
pub fn connect_provider(url: &str, poll_interval: Duration) -> Result<Provider<Http>, DeployError> {
    Provider::<Http>::try_from(url)
        .map(|provider| provider.interval(poll_interval))
        .map_err(|e| DeployError::InvalidRpcUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

/// A signing identity connected to one network
pub struct Deployer {
    client: Arc<DeployClient>,
    network: String,
    chain_id: u64,
}

impl Deployer {
    /// Acquire the first configured account and bind it to the network's chain.
    ///
    /// The key is parsed before the node is contacted, so credential errors
    /// are reported even when the network is unreachable.
    pub async fn connect(config: &DeployConfig, network_name: &str) -> Result<Self> {
        let network = config.network(network_name)?;
        let wallet = first_signer(network_name, network, None)?;

        let provider = connect_provider(
            &network.url,
            Duration::from_millis(config.deploy.poll_interval_ms),
        )?;
        let chain_id = provider
            .get_chainid()
            .await
            .with_context(|| format!("Failed to reach network '{}'", network_name))?
            .as_u64();
        log::debug!("Connected to {} (chain id {})", network_name, chain_id);

        if let Some(expected) = network.chain_id {
            if expected != chain_id {
                return Err(DeployError::ChainIdMismatch {
                    network: network_name.to_string(),
                    expected,
                    actual: chain_id,
                }
                .into());
            }
        }
        if let Some(chain) = config.custom_chain(network_name) {
            if chain.chain_id != chain_id {
                log::warn!(
                    "Explorer chain for '{}' has id {} but the node reports {}; verification will not match",
                    network_name,
                    chain.chain_id,
                    chain_id
                );
            }
        }

        let client = SignerMiddleware::new(provider, wallet.with_chain_id(chain_id));

        Ok(Self {
            client: Arc::new(client),
            network: network_name.to_string(),
            chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.client.signer().address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub async fn balance(&self) -> Result<U256> {
        self.client
            .get_balance(self.address(), None)
            .await
            .context("Failed to fetch deployer balance")
    }

    /// Submit the artifact's creation bytecode and wait for `confirmations`
    /// blocks. Constructor arguments are not supported.
    pub async fn deploy(&self, artifact: &Artifact, confirmations: usize) -> Result<Deployment> {
        let factory = ContractFactory::new(
            artifact.abi.clone(),
            artifact.bytecode.clone(),
            self.client.clone(),
        );

        let deployer = factory
            .deploy(())
            .context("Failed to build deployment transaction")?
            .confirmations(confirmations);

        log::info!(
            "Submitting {} to {} ({} bytes of init code)",
            artifact.contract_name,
            self.network,
            artifact.bytecode.len()
        );
        let (contract, receipt) = deployer
            .send_with_receipt()
            .await
            .context("Deployment transaction failed")?;

        Ok(Deployment {
            contract: artifact.qualified_name(),
            network: self.network.clone(),
            chain_id: self.chain_id,
            deployer: checksum(self.address()),
            address: checksum(contract.address()),
            transaction_hash: Some(format!("{:?}", receipt.transaction_hash)),
            block_number: receipt.block_number.map(|n| n.as_u64()),
            gas_used: receipt.gas_used.map(|gas| gas.to_string()),
        })
    }
}
