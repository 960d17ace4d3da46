use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ledger network a request is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network
    Public,
    /// Test network
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Public => "public",
            Network::Testnet => "testnet",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "public" | "primary" | "mainnet" | "main" => Some(Network::Public),
            "testnet" | "test" => Some(Network::Testnet),
            _ => None,
        }
    }

    /// Default Horizon query endpoint for this network.
    pub fn horizon_url(&self) -> &'static str {
        match self {
            Network::Public => "https://horizon.stellar.org",
            Network::Testnet => "https://horizon-testnet.stellar.org",
        }
    }

    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Public => "Public Global Stellar Network ; September 2015",
            Network::Testnet => "Test SDF Network ; September 2015",
        }
    }

    /// Network identifier bound into every transaction signature.
    pub fn network_id(&self) -> [u8; 32] {
        Sha256::digest(self.passphrase().as_bytes()).into()
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!(Network::from_str("public"), Some(Network::Public));
        assert_eq!(Network::from_str("Primary"), Some(Network::Public));
        assert_eq!(Network::from_str("mainnet"), Some(Network::Public));
        assert_eq!(Network::from_str("testnet"), Some(Network::Testnet));
        assert_eq!(Network::from_str("TEST"), Some(Network::Testnet));
        assert_eq!(Network::from_str("futurenet"), None);
    }

    #[test]
    fn test_network_ids() {
        assert_eq!(
            hex::encode(Network::Testnet.network_id()),
            "cee0302d59844d32bdca915c8203dd44b33fbb7edc19051ea37abedf28ecd472"
        );
        assert_eq!(
            hex::encode(Network::Public.network_id()),
            "7ac33997544e3175d266bd022439b22cdb16508c01163f26e5cb2a3e1045a979"
        );
    }
}
