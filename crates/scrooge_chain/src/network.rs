use std::fmt;

/// Networks the deployer knows by chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Ethereum,
    Sepolia,
    Base,
    BaseSepolia,
    /// Hardhat network and Anvil both default to 31337.
    Hardhat,
    Ganache,
    Unknown(u64),
}

impl Network {
    pub fn from_chain_id(chain_id: u64) -> Self {
        match chain_id {
            1 => Network::Ethereum,
            11_155_111 => Network::Sepolia,
            8453 => Network::Base,
            84_532 => Network::BaseSepolia,
            31_337 => Network::Hardhat,
            1337 => Network::Ganache,
            other => Network::Unknown(other),
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Sepolia => 11_155_111,
            Network::Base => 8453,
            Network::BaseSepolia => 84_532,
            Network::Hardhat => 31_337,
            Network::Ganache => 1337,
            Network::Unknown(id) => *id,
        }
    }

    /// Human-readable label for the network.
    pub fn label(&self) -> &'static str {
        match self {
            Network::Ethereum => "Ethereum Mainnet",
            Network::Sepolia => "Sepolia",
            Network::Base => "Base Mainnet",
            Network::BaseSepolia => "Base Sepolia",
            Network::Hardhat => "Hardhat/Anvil",
            Network::Ganache => "Ganache",
            Network::Unknown(_) => "Unknown network",
        }
    }

    /// Whether this is a throwaway local development chain.
    pub fn is_local_dev(&self) -> bool {
        matches!(self, Network::Hardhat | Network::Ganache)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (chain id {})", self.label(), self.chain_id())
    }
}
