use crate::config::{CustomChain, Secret};
use crate::error::DeployError;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for an Etherscan-compatible verification API
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    client: Client,
    api_url: String,
    browser_url: String,
    api_key: Secret,
}

/// Every Etherscan response shares this envelope. `result` is a string on
/// errors and a method-specific value otherwise.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExplorerResponse {
    pub status: String,
    pub message: String,
    pub result: serde_json::Value,
}

impl ExplorerResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "1"
    }

    fn describe(&self) -> String {
        match &self.result {
            serde_json::Value::String(text) => format!("{} ({})", self.message, text),
            _ => self.message.clone(),
        }
    }

    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        if !self.is_ok() {
            return Err(DeployError::Explorer(self.describe()).into());
        }
        serde_json::from_value(self.result).context("Unexpected explorer result")
    }
}

#[derive(Debug, Deserialize)]
struct SourceCodeEntry {
    #[serde(rename = "SourceCode", default)]
    source_code: String,
}

/// Parameters of a `verifysourcecode` submission
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub address: String,
    /// Standard JSON compiler input
    pub source_code: String,
    /// `path/Source.sol:Name`
    pub contract_name: String,
    /// `v0.8.18+commit.87f61d96`
    pub compiler_version: String,
    /// ABI-encoded constructor arguments, hex without prefix
    pub constructor_args: String,
}

impl VerificationRequest {
    fn form<'a>(&'a self, api_key: &'a str) -> Vec<(&'static str, &'a str)> {
        vec![
            ("apikey", api_key),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", self.address.as_str()),
            ("sourceCode", self.source_code.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", self.contract_name.as_str()),
            ("compilerversion", self.compiler_version.as_str()),
            // Misspelling is part of the API
            ("constructorArguements", self.constructor_args.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Verified,
    AlreadyVerified,
    Failed(String),
}

impl VerificationStatus {
    /// Classify a `checkverifystatus` result string
    pub fn classify(result: &str) -> Self {
        let lower = result.to_lowercase();
        if lower.starts_with("pending") {
            VerificationStatus::Pending
        } else if lower.starts_with("pass") {
            VerificationStatus::Verified
        } else if lower.contains("already verified") {
            VerificationStatus::AlreadyVerified
        } else {
            VerificationStatus::Failed(result.to_string())
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Verified | VerificationStatus::AlreadyVerified
        )
    }
}

/// Outcome of a `verifysourcecode` submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Queued; poll `checkverifystatus` with this GUID
    Queued(String),
    /// Rejected because the explorer already has the source
    AlreadyVerified,
}

fn source_is_published(response: ExplorerResponse) -> Result<bool> {
    let entries: Vec<SourceCodeEntry> = response.into_result()?;
    Ok(entries
        .first()
        .map(|entry| !entry.source_code.trim().is_empty())
        .unwrap_or(false))
}

impl ExplorerClient {
    pub fn new(chain: &CustomChain, api_key: Secret, timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: chain.urls.api_url.clone(),
            browser_url: chain.urls.browser_url.clone(),
            api_key,
        })
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<ExplorerResponse> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("apikey", self.api_key.expose())])
            .query(params)
            .send()
            .await
            .context("Failed to send explorer request")?;

        response
            .json()
            .await
            .context("Failed to parse explorer response")
    }

    /// Whether the explorer already has source code for the address
    pub async fn is_verified(&self, address: &str) -> Result<bool> {
        let response = self
            .get(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address),
            ])
            .await?;
        source_is_published(response)
    }

    /// Submit a verification for processing
    pub async fn submit(&self, request: &VerificationRequest) -> Result<Submission> {
        let response: ExplorerResponse = self
            .client
            .post(&self.api_url)
            .form(&request.form(self.api_key.expose()))
            .send()
            .await
            .context("Failed to send verification request")?
            .json()
            .await
            .context("Failed to parse verification response")?;

        // The source lookup can lag behind a verification that already landed
        if let serde_json::Value::String(result) = &response.result {
            if !response.is_ok()
                && VerificationStatus::classify(result) == VerificationStatus::AlreadyVerified
            {
                return Ok(Submission::AlreadyVerified);
            }
        }
        response.into_result().map(Submission::Queued)
    }

    pub async fn status(&self, guid: &str) -> Result<VerificationStatus> {
        let response = self
            .get(&[
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .await?;

        // Pending and failed checks come back with status "0"
        match response.result {
            serde_json::Value::String(result) => Ok(VerificationStatus::classify(&result)),
            _ => Err(DeployError::Explorer(response.message).into()),
        }
    }

    /// Poll until the explorer finishes processing the submission
    pub async fn wait_for(
        &self,
        guid: &str,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<VerificationStatus> {
        for attempt in 1..=max_attempts {
            tokio::time::sleep(interval).await;

            let status = self.status(guid).await?;
            log::debug!("Verification status check {}: {:?}", attempt, status);
            if status != VerificationStatus::Pending {
                return Ok(status);
            }
        }

        Err(DeployError::VerificationTimedOut(max_attempts).into())
    }

    /// Explorer page showing the contract's source
    pub fn contract_url(&self, address: &str) -> String {
        format!(
            "{}/address/{}#code",
            self.browser_url.trim_end_matches('/'),
            address
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainUrls;
    use mockito::Matcher;

    fn response(json: &str) -> ExplorerResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            VerificationStatus::classify("Pending in queue"),
            VerificationStatus::Pending
        );
        assert_eq!(
            VerificationStatus::classify("Pass - Verified"),
            VerificationStatus::Verified
        );
        assert_eq!(
            VerificationStatus::classify("Contract source code already verified"),
            VerificationStatus::AlreadyVerified
        );

        let failed = VerificationStatus::classify("Fail - Unable to verify");
        assert_eq!(
            failed,
            VerificationStatus::Failed("Fail - Unable to verify".to_string())
        );
        assert!(!failed.is_success());
    }

    #[test]
    fn test_source_code_lookup() {
        let unverified = response(
            r#"{"status":"1","message":"OK","result":[{"SourceCode":"","ABI":"Contract source code not verified","ContractName":""}]}"#,
        );
        assert!(!source_is_published(unverified).unwrap());

        let verified = response(
            r#"{"status":"1","message":"OK","result":[{"SourceCode":"pragma solidity 0.8.18;","ContractName":"InscriptionFactory"}]}"#,
        );
        assert!(source_is_published(verified).unwrap());
    }

    #[test]
    fn test_error_envelope() {
        let err = response(r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#)
            .into_result::<String>()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("NOTOK"));
        assert!(message.contains("Invalid API Key"));

        let guid: String = response(r#"{"status":"1","message":"OK","result":"abc-guid"}"#)
            .into_result()
            .unwrap();
        assert_eq!(guid, "abc-guid");
    }

    #[test]
    fn test_verification_form() {
        let request = VerificationRequest {
            address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            source_code: "{}".to_string(),
            contract_name: "contracts/InscriptionFactory.sol:InscriptionFactory".to_string(),
            compiler_version: "v0.8.18+commit.87f61d96".to_string(),
            constructor_args: String::new(),
        };
        let form = request.form("KEY");

        let get = |name: &str| {
            form.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        };
        assert_eq!(get("action"), Some("verifysourcecode"));
        assert_eq!(get("codeformat"), Some("solidity-standard-json-input"));
        assert_eq!(get("compilerversion"), Some("v0.8.18+commit.87f61d96"));
        assert_eq!(get("constructorArguements"), Some(""));
        assert_eq!(get("apikey"), Some("KEY"));
    }

    fn mock_client(server: &mockito::Server) -> ExplorerClient {
        let chain = CustomChain {
            network: "goerli".to_string(),
            chain_id: 5,
            urls: ChainUrls {
                api_url: format!("{}/api", server.url()),
                browser_url: "https://goerli.etherscan.io".to_string(),
            },
        };
        ExplorerClient::new(&chain, Secret::new("KEY"), 5).unwrap()
    }

    fn status_query(guid: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("apikey".into(), "KEY".into()),
            Matcher::UrlEncoded("action".into(), "checkverifystatus".into()),
            Matcher::UrlEncoded("guid".into(), guid.into()),
        ])
    }

    fn request() -> VerificationRequest {
        VerificationRequest {
            address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            source_code: r#"{"language":"Solidity"}"#.to_string(),
            contract_name: "contracts/InscriptionFactory.sol:InscriptionFactory".to_string(),
            compiler_version: "v0.8.18+commit.87f61d96".to_string(),
            constructor_args: String::new(),
        }
    }

    #[tokio::test]
    async fn test_is_verified_queries_source_code() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("apikey".into(), "KEY".into()),
                Matcher::UrlEncoded("module".into(), "contract".into()),
                Matcher::UrlEncoded("action".into(), "getsourcecode".into()),
                Matcher::UrlEncoded("address".into(), "0xabc".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":"1","message":"OK","result":[{"SourceCode":"contract A {}"}]}"#)
            .create_async()
            .await;

        let client = mock_client(&server);
        assert!(client.is_verified("0xabc").await.unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("apikey".into(), "KEY".into()),
                Matcher::UrlEncoded("action".into(), "verifysourcecode".into()),
                Matcher::UrlEncoded(
                    "codeformat".into(),
                    "solidity-standard-json-input".into(),
                ),
                Matcher::UrlEncoded("sourceCode".into(), r#"{"language":"Solidity"}"#.into()),
                Matcher::UrlEncoded(
                    "contractname".into(),
                    "contracts/InscriptionFactory.sol:InscriptionFactory".into(),
                ),
                Matcher::UrlEncoded("constructorArguements".into(), "".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":"1","message":"OK","result":"abc-guid"}"#)
            .create_async()
            .await;

        let client = mock_client(&server);
        let submission = client.submit(&request()).await.unwrap();
        assert_eq!(submission, Submission::Queued("abc-guid".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_already_verified_is_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api")
            .with_status(200)
            .with_body(
                r#"{"status":"0","message":"NOTOK","result":"Contract source code already verified"}"#,
            )
            .create_async()
            .await;

        let client = mock_client(&server);
        let submission = client.submit(&request()).await.unwrap();
        assert_eq!(submission, Submission::AlreadyVerified);
    }

    #[tokio::test]
    async fn test_submit_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api")
            .with_status(200)
            .with_body(r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#)
            .create_async()
            .await;

        let client = mock_client(&server);
        let err = client.submit(&request()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[tokio::test]
    async fn test_wait_for_polls_until_pass() {
        let mut server = mockito::Server::new_async().await;
        let pending = server
            .mock("GET", "/api")
            .match_query(status_query("abc-guid"))
            .with_status(200)
            .with_body(r#"{"status":"0","message":"NOTOK","result":"Pending in queue"}"#)
            .expect(2)
            .create_async()
            .await;
        let pass = server
            .mock("GET", "/api")
            .match_query(status_query("abc-guid"))
            .with_status(200)
            .with_body(r#"{"status":"1","message":"OK","result":"Pass - Verified"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = mock_client(&server);
        let status = client
            .wait_for("abc-guid", Duration::from_millis(1), 5)
            .await
            .unwrap();
        assert_eq!(status, VerificationStatus::Verified);
        pending.assert_async().await;
        pass.assert_async().await;
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(status_query("slow-guid"))
            .with_status(200)
            .with_body(r#"{"status":"0","message":"NOTOK","result":"Pending in queue"}"#)
            .expect(3)
            .create_async()
            .await;

        let client = mock_client(&server);
        let err = client
            .wait_for("slow-guid", Duration::from_millis(1), 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::VerificationTimedOut(3))
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_without_result_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api")
            .match_query(status_query("abc-guid"))
            .with_status(200)
            .with_body(r#"{"status":"0","message":"NOTOK","result":null}"#)
            .create_async()
            .await;

        let client = mock_client(&server);
        let err = client.status("abc-guid").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::Explorer(message)) if message == "NOTOK"
        ));
    }

    #[test]
    fn test_contract_url() {
        let chain = CustomChain {
            network: "goerli".to_string(),
            chain_id: 5,
            urls: ChainUrls {
                api_url: "https://api-goerli.etherscan.io/api".to_string(),
                browser_url: "https://goerli.etherscan.io/".to_string(),
            },
        };
        let client = ExplorerClient::new(&chain, Secret::new("KEY"), 5).unwrap();
        assert_eq!(
            client.contract_url("0xabc"),
            "https://goerli.etherscan.io/address/0xabc#code"
        );
    }
}
