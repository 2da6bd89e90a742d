use crate::config::NetworkConfig;
use crate::error::DeployError;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use ethers::utils::to_checksum;

/// Build a local wallet for every account configured on a network.
///
/// This is the first point where keys are parsed, so a malformed
/// `PRIVATE_KEY` is reported here.
pub fn signers(
    network_name: &str,
    network: &NetworkConfig,
    chain_id: Option<u64>,
) -> Result<Vec<LocalWallet>, DeployError> {
    network
        .accounts
        .iter()
        .enumerate()
        .map(|(index, key)| {
            let wallet = key
                .expose()
                .trim()
                .parse::<LocalWallet>()
                .map_err(|e| DeployError::InvalidPrivateKey {
                    index,
                    reason: e.to_string(),
                })?;
            log::debug!(
                "Loaded account #{} for {}: {}",
                index,
                network_name,
                checksum(wallet.address())
            );
            Ok(match chain_id {
                Some(id) => wallet.with_chain_id(id),
                None => wallet,
            })
        })
        .collect()
}

/// The signing identity used for deployments: the first configured account
pub fn first_signer(
    network_name: &str,
    network: &NetworkConfig,
    chain_id: Option<u64>,
) -> Result<LocalWallet, DeployError> {
    signers(network_name, network, chain_id)?
        .into_iter()
        .next()
        .ok_or_else(|| DeployError::NoSigningAccount(network_name.to_string()))
}

/// EIP-55 mixed-case rendering
pub fn checksum(address: Address) -> String {
    to_checksum(&address, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    // Well-known development account #0
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn network(keys: &[&str]) -> NetworkConfig {
        NetworkConfig {
            url: "http://127.0.0.1:8545".to_string(),
            accounts_env: "PRIVATE_KEY".to_string(),
            accounts: keys.iter().map(|k| Secret::new(*k)).collect(),
            chain_id: None,
        }
    }

    #[test]
    fn test_first_signer_address() {
        let wallet = first_signer("local", &network(&[DEV_KEY]), Some(31337)).unwrap();
        assert_eq!(checksum(wallet.address()), DEV_ADDRESS);
        assert_eq!(wallet.chain_id(), 31337);
    }

    #[test]
    fn test_key_without_prefix() {
        let wallet = first_signer("local", &network(&[&DEV_KEY[2..]]), None).unwrap();
        assert_eq!(checksum(wallet.address()), DEV_ADDRESS);
    }

    #[test]
    fn test_no_accounts() {
        let err = first_signer("goerli", &network(&[]), Some(5)).unwrap_err();
        assert!(matches!(err, DeployError::NoSigningAccount(ref n) if n == "goerli"));
        assert!(err.to_string().contains("goerli"));
    }

    #[test]
    fn test_invalid_key_reports_index_without_leaking() {
        let err = signers("goerli", &network(&[DEV_KEY, "0xnothex"]), None).unwrap_err();
        match err {
            DeployError::InvalidPrivateKey { index, ref reason } => {
                assert_eq!(index, 1);
                assert!(!reason.contains("nothex"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(first_signer("goerli", &network(&[""]), None).is_err());
    }
}
