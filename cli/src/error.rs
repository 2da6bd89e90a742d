use std::path::PathBuf;
use thiserror::Error;

/// Failure points owned by the deployer itself.
///
/// Provider and signing failures come from `ethers` and are carried through
/// `anyhow` unchanged; at the top level every error is reported the same way.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Unknown network '{0}'")]
    UnknownNetwork(String),

    #[error("No signing account configured for network '{0}'")]
    NoSigningAccount(String),

    #[error("Invalid private key for account #{index}: {reason}")]
    InvalidPrivateKey { index: usize, reason: String },

    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidRpcUrl { url: String, reason: String },

    #[error("Network '{network}' is configured for chain {expected} but the node reports {actual}")]
    ChainIdMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },

    #[error("Artifact for '{name}' not found at {}", .path.display())]
    ArtifactNotFound { name: String, path: PathBuf },

    #[error("Malformed artifact {}: {reason}", .path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("Contract '{0}' has unlinked library references")]
    UnlinkedLibraries(String),

    #[error("Build info for '{0}' not found; recompile the contract")]
    BuildInfoMissing(String),

    #[error("Config file error: {0}")]
    ConfigFile(String),

    #[error("No block explorer configured for network '{0}'")]
    NoExplorer(String),

    #[error("No block explorer API key configured for network '{0}'")]
    NoExplorerApiKey(String),

    #[error("Explorer API error: {0}")]
    Explorer(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Verification still pending after {0} status checks")]
    VerificationTimedOut(u32),
}
