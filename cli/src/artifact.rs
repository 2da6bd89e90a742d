//! Compiled contract artifacts.
//!
//! Artifacts are produced by an external Solidity toolchain. Both the Hardhat
//! layout (`<root>/<source path>/<Name>.json` with a `.dbg.json` sidecar
//! pointing at the build info) and the Foundry layout
//! (`<root>/<File.sol>/<Name>.json`) are understood.

use crate::config::SolidityConfig;
use crate::error::DeployError;
use anyhow::{Context, Result};
use ethers::abi::Abi;
use ethers::types::Bytes;
use ethers::utils::hex;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Contract deployed when none is named on the command line
pub const DEFAULT_CONTRACT: &str = "contracts/InscriptionFactory.sol:InscriptionFactory";

const BUILD_INFO_DIR: &str = "build-info";

/// `path/to/Source.sol:Name` or a bare `Name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractName {
    pub source: Option<String>,
    pub name: String,
}

impl ContractName {
    pub fn parse(input: &str) -> Self {
        match input.rsplit_once(':') {
            Some((source, name)) if !source.is_empty() => Self {
                source: Some(source.to_string()),
                name: name.to_string(),
            },
            _ => Self {
                source: None,
                name: input.trim_start_matches(':').to_string(),
            },
        }
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}:{}", source, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: Option<String>,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Fully qualified name as the explorer expects it
    pub fn qualified_name(&self) -> String {
        match &self.source_name {
            Some(source) => format!("{}:{}", source, self.contract_name),
            None => self.contract_name.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    contract_name: Option<String>,
    source_name: Option<String>,
    abi: Abi,
    bytecode: RawBytecode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl RawBytecode {
    fn into_hex(self) -> String {
        match self {
            RawBytecode::Hex(hex) => hex,
            RawBytecode::Object { object } => object,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

/// Compiler input and version of the run that produced an artifact
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_version: String,
    pub solc_long_version: String,
    pub input: serde_json::Value,
}

impl BuildInfo {
    /// Compiler version in the `v0.8.18+commit.87f61d96` form
    pub fn compiler_version_tag(&self) -> String {
        format!("v{}", self.solc_long_version)
    }

    pub fn standard_json_input(&self) -> Result<String> {
        serde_json::to_string(&self.input).context("Failed to serialize compiler input")
    }

    /// Settings that differ from the configured compiler settings
    pub fn compiler_mismatches(&self, expected: &SolidityConfig) -> Vec<String> {
        let mut mismatches = Vec::new();
        let settings = &self.input["settings"];

        if self.solc_version != expected.version {
            mismatches.push(format!(
                "compiler version {} (configured {})",
                self.solc_version, expected.version
            ));
        }

        // solc defaults when the keys are absent
        let enabled = settings["optimizer"]["enabled"].as_bool().unwrap_or(false);
        let runs = settings["optimizer"]["runs"].as_u64().unwrap_or(200);
        let via_ir = settings["viaIR"].as_bool().unwrap_or(false);

        if enabled != expected.optimizer.enabled {
            mismatches.push(format!(
                "optimizer enabled {} (configured {})",
                enabled, expected.optimizer.enabled
            ));
        }
        if enabled && runs != u64::from(expected.optimizer.runs) {
            mismatches.push(format!(
                "optimizer runs {} (configured {})",
                runs, expected.optimizer.runs
            ));
        }
        if via_ir != expected.via_ir {
            mismatches.push(format!("viaIR {} (configured {})", via_ir, expected.via_ir));
        }

        mismatches
    }
}

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate the artifact file for a contract
    pub fn artifact_path(&self, contract: &ContractName) -> Result<PathBuf> {
        let file_name = format!("{}.json", contract.name);

        if let Some(source) = &contract.source {
            let hardhat = self.root.join(source).join(&file_name);
            if hardhat.is_file() {
                return Ok(hardhat);
            }

            // Foundry keys the directory by file name only
            if let Some(base) = Path::new(source).file_name() {
                let foundry = self.root.join(base).join(&file_name);
                if foundry.is_file() {
                    return Ok(foundry);
                }
            }

            return Err(DeployError::ArtifactNotFound {
                name: contract.to_string(),
                path: hardhat,
            }
            .into());
        }

        let pattern = self.root.join("**").join(&file_name);
        let pattern = pattern.to_string_lossy();
        let mut matches: Vec<PathBuf> = glob::glob(&pattern)
            .with_context(|| format!("Invalid artifact search pattern {}", pattern))?
            .filter_map(|entry| entry.ok())
            .filter(|path| !path.starts_with(self.root.join(BUILD_INFO_DIR)))
            .collect();
        matches.sort();

        match matches.len() {
            0 => Err(DeployError::ArtifactNotFound {
                name: contract.to_string(),
                path: self.root.clone(),
            }
            .into()),
            1 => Ok(matches.remove(0)),
            _ => {
                let candidates: Vec<String> = matches
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                anyhow::bail!(
                    "Contract name '{}' is ambiguous, use a fully qualified name. Candidates: {}",
                    contract,
                    candidates.join(", ")
                )
            }
        }
    }

    pub fn load(&self, contract: &ContractName) -> Result<Artifact> {
        let path = self.artifact_path(contract)?;
        log::debug!("Reading artifact {}", path.display());

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let raw: RawArtifact =
            serde_json::from_str(&contents).map_err(|e| DeployError::MalformedArtifact {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let code = raw.bytecode.into_hex();
        let code = code.trim().trim_start_matches("0x");
        if code.contains("__$") {
            return Err(DeployError::UnlinkedLibraries(contract.to_string()).into());
        }
        if code.is_empty() {
            return Err(DeployError::MalformedArtifact {
                path,
                reason: "no creation bytecode (abstract contract or interface?)".to_string(),
            }
            .into());
        }
        let bytecode = hex::decode(code).map_err(|e| DeployError::MalformedArtifact {
            path: path.clone(),
            reason: format!("bytecode is not valid hex: {}", e),
        })?;

        Ok(Artifact {
            contract_name: raw.contract_name.unwrap_or_else(|| contract.name.clone()),
            source_name: raw.source_name.or_else(|| contract.source.clone()),
            abi: raw.abi,
            bytecode: Bytes::from(bytecode),
        })
    }

    /// Build info of the compilation that produced the contract's artifact
    pub fn build_info(&self, contract: &ContractName) -> Result<BuildInfo> {
        let artifact_path = self.artifact_path(contract)?;
        let debug_path = artifact_path.with_extension("dbg.json");
        if !debug_path.is_file() {
            return Err(DeployError::BuildInfoMissing(contract.to_string()).into());
        }

        let debug: DebugFile = serde_json::from_str(
            &fs::read_to_string(&debug_path)
                .with_context(|| format!("Failed to read {}", debug_path.display()))?,
        )
        .with_context(|| format!("Failed to parse {}", debug_path.display()))?;

        let dir = debug_path.parent().unwrap_or_else(|| Path::new("."));
        let build_info_path = dir.join(&debug.build_info);
        if !build_info_path.is_file() {
            return Err(DeployError::BuildInfoMissing(contract.to_string()).into());
        }

        let contents = fs::read_to_string(&build_info_path)
            .with_context(|| format!("Failed to read {}", build_info_path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", build_info_path.display()))
    }

    /// Log compiler settings that differ from the configured ones.
    /// Missing build info is not an error here.
    pub fn warn_on_compiler_mismatch(&self, contract: &ContractName, expected: &SolidityConfig) {
        match self.build_info(contract) {
            Ok(info) => {
                for mismatch in info.compiler_mismatches(expected) {
                    log::warn!("{} was compiled with {}", contract, mismatch);
                }
            }
            Err(e) => log::debug!("Skipping compiler settings check: {:#}", e),
        }
    }
}
