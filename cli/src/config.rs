use crate::error::DeployError;
use anyhow::{Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the deployment account's private key
pub const PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";

/// Environment variable holding the block explorer API key
pub const EXPLORER_API_KEY_VAR: &str = "ETHSCAN_API_KEY";

/// Name of the optional settings overlay
pub const CONFIG_FILE_NAME: &str = "deployer.toml";

pub const DEFAULT_NETWORK: &str = "goerli";
const GOERLI_RPC_URL: &str = "https://rpc.ankr.com/eth_goerli";
const GOERLI_CHAIN_ID: u64 = 5;
const GOERLI_API_URL: &str = "https://api-goerli.etherscan.io/api";
const GOERLI_BROWSER_URL: &str = "https://goerli.etherscan.io";

/// A credential read from the environment. Never printed or serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<redacted>")
    }
}

/// Deployment configuration, assembled once at startup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployConfig {
    /// Network used when none is given on the command line
    pub default_network: String,

    /// Explorer HTTP request timeout in seconds
    pub timeout: u64,

    /// Enable debug logging
    pub debug: bool,

    /// Output format (text, json, table)
    pub output_format: OutputFormat,

    /// Compiler settings the artifacts are expected to be built with
    pub solidity: SolidityConfig,

    pub paths: PathsConfig,

    pub deploy: DeploySettings,

    /// Network name -> RPC endpoint and signing accounts
    pub networks: BTreeMap<String, NetworkConfig>,

    pub etherscan: EtherscanConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Table,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            "text" => Ok(OutputFormat::Text),
            other => Err(format!(
                "invalid output format '{}', expected json, table or text",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolidityConfig {
    pub version: String,
    pub via_ir: bool,
    pub optimizer: OptimizerConfig,
}

impl Default for SolidityConfig {
    fn default() -> Self {
        Self {
            version: "0.8.18".to_string(),
            via_ir: true,
            optimizer: OptimizerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub enabled: bool,
    pub runs: u32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            runs: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the compiled artifact tree
    pub artifacts: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts: PathBuf::from("artifacts"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    /// Blocks to wait for after the deployment is included
    pub confirmations: usize,

    /// Receipt polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            confirmations: 1,
            poll_interval_ms: 4000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkConfig {
    pub url: String,

    /// Variable the accounts were read from
    pub accounts_env: String,

    /// Private keys, unvalidated until a signer is built from them
    pub accounts: Vec<Secret>,

    /// Expected chain id, checked against the node when set
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtherscanConfig {
    /// Network name -> explorer API key
    pub api_key: BTreeMap<String, ExplorerKey>,

    pub custom_chains: Vec<CustomChain>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerKey {
    pub env: String,
    pub key: Option<Secret>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomChain {
    pub network: String,
    pub chain_id: u64,
    pub urls: ChainUrls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainUrls {
    pub api_url: String,
    pub browser_url: String,
}

fn read_accounts<F>(lookup: &F, var: &str) -> Vec<Secret>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).map(Secret::new).into_iter().collect()
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl DeployConfig {
    /// Assemble the configuration from literals and the given variable lookup.
    ///
    /// Nothing is validated here: a missing private key simply leaves the
    /// network without accounts.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut networks = BTreeMap::new();
        networks.insert(
            DEFAULT_NETWORK.to_string(),
            NetworkConfig {
                url: GOERLI_RPC_URL.to_string(),
                accounts_env: PRIVATE_KEY_VAR.to_string(),
                accounts: read_accounts(&lookup, PRIVATE_KEY_VAR),
                chain_id: None,
            },
        );

        let mut api_key = BTreeMap::new();
        api_key.insert(
            DEFAULT_NETWORK.to_string(),
            ExplorerKey {
                env: EXPLORER_API_KEY_VAR.to_string(),
                key: lookup(EXPLORER_API_KEY_VAR).map(Secret::new),
            },
        );

        Self {
            default_network: DEFAULT_NETWORK.to_string(),
            timeout: 30,
            debug: false,
            output_format: OutputFormat::Text,
            solidity: SolidityConfig::default(),
            paths: PathsConfig::default(),
            deploy: DeploySettings::default(),
            networks,
            etherscan: EtherscanConfig {
                api_key,
                custom_chains: vec![CustomChain {
                    network: DEFAULT_NETWORK.to_string(),
                    chain_id: GOERLI_CHAIN_ID,
                    urls: ChainUrls {
                        api_url: GOERLI_API_URL.to_string(),
                        browser_url: GOERLI_BROWSER_URL.to_string(),
                    },
                }],
            },
        }
    }

    /// Assemble the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    /// Assemble from the environment and apply the settings file, if any
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = Self::from_env();

        match ConfigFile::locate(explicit)? {
            Some(path) => {
                log::debug!("Applying settings from {}", path.display());
                let file = ConfigFile::read(&path)?;
                Ok(config.with_file(file, env_lookup))
            }
            None => Ok(config),
        }
    }

    /// Apply a settings overlay. Credentials are resolved through `lookup`.
    pub fn with_file<F>(mut self, file: ConfigFile, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(network) = file.default_network {
            self.default_network = network;
        }
        if let Some(timeout) = file.timeout {
            self.timeout = timeout;
        }
        if let Some(format) = file.output_format {
            self.output_format = format;
        }
        if let Some(solidity) = file.solidity {
            self.solidity = solidity;
        }
        if let Some(paths) = file.paths {
            self.paths = paths;
        }
        if let Some(deploy) = file.deploy {
            self.deploy = deploy;
        }

        for (name, entry) in file.networks {
            let accounts_env = entry
                .accounts_env
                .unwrap_or_else(|| PRIVATE_KEY_VAR.to_string());
            let accounts = read_accounts(&lookup, &accounts_env);
            self.networks.insert(
                name,
                NetworkConfig {
                    url: entry.url,
                    accounts_env,
                    accounts,
                    chain_id: entry.chain_id,
                },
            );
        }

        if let Some(etherscan) = file.etherscan {
            for (network, env) in etherscan.api_key_env {
                let key = lookup(env.as_str()).map(Secret::new);
                self.etherscan
                    .api_key
                    .insert(network, ExplorerKey { env, key });
            }
            for chain in etherscan.custom_chains {
                self.etherscan
                    .custom_chains
                    .retain(|existing| existing.network != chain.network);
                self.etherscan.custom_chains.push(chain);
            }
        }

        self
    }

    /// Substitute the RPC URL of one network, e.g. to target a local node
    pub fn with_rpc_url(mut self, network: &str, url: String) -> Result<Self, DeployError> {
        let entry = self
            .networks
            .get_mut(network)
            .ok_or_else(|| DeployError::UnknownNetwork(network.to_string()))?;
        entry.url = url;
        Ok(self)
    }

    pub fn network(&self, name: &str) -> Result<&NetworkConfig, DeployError> {
        self.networks
            .get(name)
            .ok_or_else(|| DeployError::UnknownNetwork(name.to_string()))
    }

    pub fn custom_chain(&self, network: &str) -> Option<&CustomChain> {
        self.etherscan
            .custom_chains
            .iter()
            .find(|chain| chain.network == network)
    }

    pub fn explorer_api_key(&self, network: &str) -> Option<&Secret> {
        self.etherscan
            .api_key
            .get(network)
            .and_then(|entry| entry.key.as_ref())
    }
}

/// Optional `deployer.toml` overlay. Holds no secrets, only the names of
/// the variables they are read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solidity: Option<SolidityConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<PathsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeploySettings>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, NetworkEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etherscan: Option<EtherscanEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkEntry {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EtherscanEntry {
    #[serde(default)]
    pub api_key_env: BTreeMap<String, String>,

    #[serde(default)]
    pub custom_chains: Vec<CustomChain>,
}

impl ConfigFile {
    /// Find the overlay: explicit path, then the working directory, then home
    pub fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(DeployError::ConfigFile(format!(
                    "{} does not exist",
                    path.display()
                ))
                .into());
            }
            return Ok(Some(path.to_path_buf()));
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(Some(local));
        }

        Ok(Self::global_path().filter(|path| path.exists()))
    }

    /// `~/.inscription/deployer.toml`
    pub fn global_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".inscription").join(CONFIG_FILE_NAME))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| DeployError::ConfigFile(e.to_string()).into())
    }

    /// Starter overlay mirroring the given configuration
    pub fn template(config: &DeployConfig) -> Self {
        let networks = config
            .networks
            .iter()
            .map(|(name, network)| {
                (
                    name.clone(),
                    NetworkEntry {
                        url: network.url.clone(),
                        accounts_env: Some(network.accounts_env.clone()),
                        chain_id: network.chain_id,
                    },
                )
            })
            .collect();

        let api_key_env = config
            .etherscan
            .api_key
            .iter()
            .map(|(name, entry)| (name.clone(), entry.env.clone()))
            .collect();

        Self {
            default_network: Some(config.default_network.clone()),
            timeout: Some(config.timeout),
            output_format: Some(config.output_format),
            solidity: Some(config.solidity.clone()),
            paths: Some(config.paths.clone()),
            deploy: Some(config.deploy),
            networks,
            etherscan: Some(EtherscanEntry {
                api_key_env,
                custom_chains: config.etherscan.custom_chains.clone(),
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }
}
