pub mod artifact;
pub mod evm;
pub mod network;
pub mod rpc;

// Re-export primary types for convenient access.
pub use artifact::{ArtifactStore, ContractArtifact};
pub use evm::{
    ContractFactory, DeployedContract, PendingDeployment, SCROOGE_COIN, deploy_token,
    encode_constructor_args, first_signer,
};
pub use network::Network;
pub use rpc::{DeploymentReceipt, EvmProvider, HttpProvider, RpcError};
