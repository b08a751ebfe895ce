//! Ethereum node access.
//!
//! [`EvmProvider`] is the seam between the deployment procedure and the node.
//! [`HttpProvider`] implements it on an alloy provider talking JSON-RPC over
//! HTTP to a development node that manages unlocked accounts, so signing,
//! nonces and gas estimation all happen node-side.

use std::time::Duration;

use alloy::network::{Ethereum, ReceiptResponse};
use alloy::primitives::{Address, B256, Bytes};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::TransportError;
use alloy::transports::http::{Http, reqwest};
use async_trait::async_trait;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a provider may return.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("confirmation failed: {0}")]
    Confirmation(String),
}

impl From<TransportError> for RpcError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self::Node {
                code: payload.code,
                message: payload.message.to_string(),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// The parts of a mined creation receipt the deployer reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReceipt {
    pub transaction_hash: B256,
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub succeeded: bool,
}

impl From<&TransactionReceipt> for DeploymentReceipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            contract_address: receipt.contract_address,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            succeeded: ReceiptResponse::status(receipt),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The node operations the deployment procedure needs.
#[async_trait]
pub trait EvmProvider: Send + Sync {
    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64, RpcError>;

    /// `eth_accounts`: the accounts the node can sign for.
    async fn accounts(&self) -> Result<Vec<Address>, RpcError>;

    /// `eth_sendTransaction`: returns the transaction hash once the node has
    /// accepted the transaction.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, RpcError>;

    /// Wait until `tx_hash` is mined and return its receipt, checking every
    /// `poll_interval`. Waits indefinitely.
    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        poll_interval: Duration,
    ) -> Result<DeploymentReceipt, RpcError>;

    /// `eth_getCode` at the latest block.
    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError>;
}

// ---------------------------------------------------------------------------
// HTTP provider
// ---------------------------------------------------------------------------

/// An alloy HTTP provider without local fillers: the node signs and fills
/// every transaction itself.
pub struct HttpProvider {
    url: String,
    inner: DynProvider<Ethereum>,
}

impl HttpProvider {
    /// Create a provider for `url`. `timeout` bounds each individual request.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let url = url.into();
        let endpoint: reqwest::Url = url
            .parse()
            .map_err(|e| RpcError::Transport(format!("invalid node URL {url}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {e}")))?;

        let transport = Http::with_client(client, endpoint);
        let is_local = transport.guess_local();
        let inner = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_client(RpcClient::new(transport, is_local))
            .erased();

        Ok(Self { url, inner })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EvmProvider for HttpProvider {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        Ok(self.inner.get_chain_id().await?)
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        Ok(self.inner.get_accounts().await?)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, RpcError> {
        let pending = self.inner.send_transaction(tx).await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        poll_interval: Duration,
    ) -> Result<DeploymentReceipt, RpcError> {
        debug!(%tx_hash, poll_ms = poll_interval.as_millis() as u64, "waiting for receipt");
        self.inner.client().set_poll_interval(poll_interval);
        let receipt = PendingTransactionBuilder::new(self.inner.root().clone(), tx_hash)
            .get_receipt()
            .await
            .map_err(|e| {
                warn!(%tx_hash, "receipt watch failed: {e}");
                RpcError::Confirmation(e.to_string())
            })?;
        Ok(DeploymentReceipt::from(&receipt))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError> {
        Ok(self.inner.get_code_at(address).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::network::TransactionBuilder;
    use alloy::primitives::address;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP request with `status` and `body`, returning the
    /// URL and a handle that yields the raw request. `ID` in `body` is
    /// replaced by the JSON-RPC id of the request.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            let mut body_start = 0;
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(split) = text.find("\r\n\r\n") {
                    let content_length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    body_start = split + 4;
                    if raw.len() >= body_start + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let id = serde_json::from_slice::<serde_json::Value>(&raw[body_start..])
                .ok()
                .and_then(|v| v.get("id").cloned())
                .unwrap_or(serde_json::Value::from(0));
            let body = body.replace("ID", &id.to_string());
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (url, handle)
    }

    fn node_receipt(status: &str, contract_address: &str) -> TransactionReceipt {
        let json = format!(
            r#"{{
                "type": "0x2",
                "status": "{status}",
                "cumulativeGasUsed": "0x10a3c2",
                "logs": [],
                "logsBloom": "0x{bloom}",
                "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "transactionIndex": "0x0",
                "blockHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
                "blockNumber": "0x1",
                "gasUsed": "0x10a3c2",
                "effectiveGasPrice": "0x3b9aca00",
                "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
                "to": null,
                "contractAddress": {contract_address}
            }}"#,
            bloom = "0".repeat(512),
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn receipt_summary_from_node_json() {
        let receipt = node_receipt("0x1", r#""0x5fbdb2315678afecb367f032d93f642f64180aa3""#);
        let summary = DeploymentReceipt::from(&receipt);
        assert!(summary.succeeded);
        assert_eq!(
            summary.contract_address,
            Some(address!("5fbdb2315678afecb367f032d93f642f64180aa3"))
        );
        assert_eq!(summary.gas_used, 0x10a3c2);
        assert_eq!(summary.block_number, Some(1));
        assert_eq!(summary.transaction_hash, B256::repeat_byte(0x11));
    }

    #[test]
    fn reverted_receipt_is_not_success() {
        let receipt = node_receipt("0x0", "null");
        let summary = DeploymentReceipt::from(&receipt);
        assert!(!summary.succeeded);
        assert!(summary.contract_address.is_none());
    }

    #[tokio::test]
    async fn http_provider_reads_chain_id() {
        let (url, server) =
            serve_once("200 OK", r#"{"jsonrpc":"2.0","id":ID,"result":"0x7a69"}"#).await;
        let provider = HttpProvider::new(url, Duration::from_secs(5)).unwrap();

        assert_eq!(provider.chain_id().await.unwrap(), 31_337);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST "));
        assert!(request.contains("\"method\":\"eth_chainId\""));
        assert!(request.contains("\"jsonrpc\":\"2.0\""));
    }

    #[tokio::test]
    async fn http_provider_sends_creation_transaction() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"jsonrpc":"2.0","id":ID,"result":"0x3333333333333333333333333333333333333333333333333333333333333333"}"#,
        )
        .await;
        let provider = HttpProvider::new(url, Duration::from_secs(5)).unwrap();

        let tx = TransactionRequest::default()
            .from(address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"))
            .with_deploy_code(Bytes::from_static(&[0x60, 0x80]));
        let hash = provider.send_transaction(tx).await.unwrap();
        assert_eq!(hash, B256::repeat_byte(0x33));

        let request = server.await.unwrap().to_lowercase();
        assert!(request.contains("\"method\":\"eth_sendtransaction\""));
        assert!(request.contains("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
        assert!(request.contains("\"0x6080\""));
    }

    #[tokio::test]
    async fn http_provider_maps_node_error() {
        let (url, _server) = serve_once(
            "200 OK",
            r#"{"jsonrpc":"2.0","id":ID,"error":{"code":-32000,"message":"insufficient funds"}}"#,
        )
        .await;
        let provider = HttpProvider::new(url, Duration::from_secs(5)).unwrap();

        match provider.accounts().await.unwrap_err() {
            RpcError::Node { code, message } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "insufficient funds");
            }
            other => panic!("expected node error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_provider_maps_error_status_without_json() {
        let (url, _server) = serve_once("502 Bad Gateway", "upstream down").await;
        let provider = HttpProvider::new(url, Duration::from_secs(5)).unwrap();

        let err = provider.accounts().await.unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)), "{err:?}");
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn http_provider_unreachable_node_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let provider = HttpProvider::new(url, Duration::from_secs(2)).unwrap();
        let err = provider.chain_id().await.unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));
    }

    #[test]
    fn invalid_url_is_rejected_up_front() {
        let err = HttpProvider::new("not a url", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, RpcError::Transport(_)));
    }
}
