use std::io::Write;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, B256, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolValue;
use scrooge_core::config::DEFAULT_CONFIRMATION_POLL_MS;
use scrooge_core::{DeployConfig, DeployError, TokenConfig};
use tracing::{debug, info, warn};

use crate::artifact::{ArtifactStore, ContractArtifact};
use crate::network::Network;
use crate::rpc::EvmProvider;

/// Name of the token contract artifact.
pub const SCROOGE_COIN: &str = "ScroogeCoin";

/// Constructor signature the token contract must expose.
pub const TOKEN_CONSTRUCTOR: [&str; 3] = ["string", "string", "uint256"];

/// Result of a confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub tx_hash: B256,
    pub deployer: Address,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// ABI-encode `(name, symbol, initial_supply)` as constructor parameters.
pub fn encode_constructor_args(token: &TokenConfig) -> Vec<u8> {
    (token.name.clone(), token.symbol.clone(), token.initial_supply).abi_encode_params()
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds and submits creation transactions for one artifact.
pub struct ContractFactory<'a, P: EvmProvider + ?Sized> {
    provider: &'a P,
    artifact: ContractArtifact,
    deployer: Address,
    poll_interval: Duration,
}

impl<'a, P: EvmProvider + ?Sized> ContractFactory<'a, P> {
    /// Returns `Err` if the artifact has no creation bytecode or its
    /// constructor does not take `(string, string, uint256)`.
    pub fn new(
        provider: &'a P,
        artifact: ContractArtifact,
        deployer: Address,
    ) -> Result<Self, DeployError> {
        if !artifact.is_deployable() {
            return Err(DeployError::Artifact(format!(
                "{} has no creation bytecode (abstract contract or interface?)",
                artifact.contract_name
            )));
        }

        let inputs = artifact.constructor_inputs();
        if inputs != TOKEN_CONSTRUCTOR {
            return Err(DeployError::Artifact(format!(
                "{} constructor({}) does not match constructor({})",
                artifact.contract_name,
                inputs.join(","),
                TOKEN_CONSTRUCTOR.join(",")
            )));
        }

        Ok(Self {
            provider,
            artifact,
            deployer,
            poll_interval: Duration::from_millis(DEFAULT_CONFIRMATION_POLL_MS),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Creation bytecode followed by the encoded constructor arguments.
    pub fn creation_data(&self, token: &TokenConfig) -> Bytes {
        let mut data = self.artifact.bytecode.to_vec();
        data.extend_from_slice(&encode_constructor_args(token));
        Bytes::from(data)
    }

    /// Submit the creation transaction. Resolves once the node has accepted
    /// it, not once it is mined.
    pub async fn deploy(
        &self,
        token: &TokenConfig,
    ) -> Result<PendingDeployment<'a, P>, DeployError> {
        let data = self.creation_data(token);
        debug!(
            contract = %self.artifact.contract_name,
            bytes = data.len(),
            "submitting creation transaction"
        );
        let tx = TransactionRequest::default()
            .from(self.deployer)
            .with_deploy_code(data);

        let tx_hash = self.provider.send_transaction(tx).await.map_err(|e| {
            DeployError::Transaction(format!(
                "failed to submit {} deployment: {e}",
                self.artifact.contract_name
            ))
        })?;
        info!(%tx_hash, "deployment transaction submitted");

        Ok(PendingDeployment {
            provider: self.provider,
            tx_hash,
            deployer: self.deployer,
            poll_interval: self.poll_interval,
        })
    }
}

// ---------------------------------------------------------------------------
// Pending deployment handle
// ---------------------------------------------------------------------------

/// A submitted, possibly unconfirmed, contract creation.
pub struct PendingDeployment<'a, P: EvmProvider + ?Sized> {
    provider: &'a P,
    tx_hash: B256,
    deployer: Address,
    poll_interval: Duration,
}

impl<P: EvmProvider + ?Sized> PendingDeployment<'_, P> {
    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    /// Wait until the node reports the transaction mined, then check that
    /// code actually lives at the new address. Waits indefinitely.
    pub async fn wait_for_deployment(self) -> Result<DeployedContract, DeployError> {
        let receipt = self
            .provider
            .wait_for_receipt(self.tx_hash, self.poll_interval)
            .await
            .map_err(|e| {
                DeployError::Transaction(format!(
                    "failed to confirm {}: {e}",
                    self.tx_hash
                ))
            })?;

        if !receipt.succeeded {
            return Err(DeployError::Transaction(format!(
                "deployment transaction {} reverted",
                self.tx_hash
            )));
        }

        let address = receipt.contract_address.ok_or_else(|| {
            DeployError::Transaction(format!(
                "receipt for {} has no contract address",
                self.tx_hash
            ))
        })?;

        let code = self.provider.code_at(address).await.map_err(|e| {
            DeployError::Transaction(format!("failed to read code at {address}: {e}"))
        })?;
        if code.is_empty() {
            return Err(DeployError::Transaction(format!(
                "no code at {address} after deployment"
            )));
        }

        Ok(DeployedContract {
            address,
            tx_hash: self.tx_hash,
            deployer: self.deployer,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }
}

// ---------------------------------------------------------------------------
// Deployment procedure
// ---------------------------------------------------------------------------

/// The first account the node can sign for.
pub async fn first_signer<P: EvmProvider + ?Sized>(provider: &P) -> Result<Address, DeployError> {
    let accounts = provider
        .accounts()
        .await
        .map_err(|e| DeployError::Environment(format!("failed to list node accounts: {e}")))?;
    accounts.first().copied().ok_or_else(|| {
        DeployError::Environment("no signer available: the node reported no accounts".into())
    })
}

/// Deploy the token contract and write the two result lines to `out`.
///
/// `out` receives `Deployer: <address> initial supply: <n>` once a signer is
/// known and `TOKEN_ADDRESS: <address>` once the contract is confirmed.
pub async fn deploy_token<P, W>(
    config: &DeployConfig,
    provider: &P,
    out: &mut W,
) -> Result<DeployedContract, DeployError>
where
    P: EvmProvider + ?Sized,
    W: Write,
{
    let chain_id = provider
        .chain_id()
        .await
        .map_err(|e| DeployError::Environment(format!("failed to reach node: {e}")))?;
    let network = Network::from_chain_id(chain_id);
    if network.is_local_dev() {
        info!(%network, "connected");
    } else {
        warn!(%network, "connected to a non-development network");
    }

    let deployer = first_signer(provider).await?;
    writeln!(
        out,
        "Deployer: {deployer} initial supply: {}",
        config.token.initial_supply
    )?;

    let store = ArtifactStore::new(&config.artifacts_dir);
    let artifact = store.find(SCROOGE_COIN)?;
    let factory = ContractFactory::new(provider, artifact, deployer)?
        .with_poll_interval(config.poll_interval);

    info!(
        name = %config.token.name,
        symbol = %config.token.symbol,
        supply = %config.token.initial_supply,
        "deploying {SCROOGE_COIN}"
    );
    let pending = factory.deploy(&config.token).await?;
    let deployed = pending.wait_for_deployment().await?;
    info!(
        address = %deployed.address,
        block = ?deployed.block_number,
        gas_used = deployed.gas_used,
        "deployment confirmed"
    );

    writeln!(out, "TOKEN_ADDRESS: {}", deployed.address)?;
    Ok(deployed)
}
