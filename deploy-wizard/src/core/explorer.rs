//! Block-explorer links for transactions and contract addresses.

use serde::{Deserialize, Serialize};

/// Ethereum network the deployment targets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Rinkeby,
    /// Local or private chain; no public explorer.
    #[serde(untagged)]
    Other(String),
}

impl Network {
    fn explorer_base(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => Some("https://etherscan.io"),
            Network::Rinkeby => Some("https://rinkeby.etherscan.io"),
            Network::Other(_) => None,
        }
    }

    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer_base()
            .map(|base| format!("{base}/tx/{tx_hash}"))
    }

    pub fn address_url(&self, address: &str) -> Option<String> {
        self.explorer_base()
            .map(|base| format!("{base}/address/{address}"))
    }
}
