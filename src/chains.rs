use std::collections::HashMap;

use ethers_core::types::Address;
use once_cell::sync::Lazy;

/// Public client contract shared by the SecretPath testnet deployments
const TESTNET_PUBLIC_CLIENT: &str = "0x3879E146140b627a5C858a08e507B171D9E43139";

/// Networks with a deployed relay public client
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Chain {
    /// Ethereum mainnet
    Ethereum,
    /// BNB Smart Chain
    BinanceSmartChain,
    /// Polygon PoS
    Polygon,
    /// OP mainnet
    Optimism,
    /// Arbitrum One
    ArbitrumOne,
    /// Avalanche C-Chain
    AvalancheCChain,
    /// Base
    Base,
    /// Linea
    Linea,
    /// Scroll
    Scroll,
    /// Metis Andromeda
    Metis,
    /// Ethereum Sepolia
    Sepolia,
    /// Scroll Sepolia
    ScrollSepolia,
    /// Polygon Amoy
    PolygonAmoy,
    /// OP Sepolia
    OptimismSepolia,
    /// Arbitrum Sepolia
    ArbitrumSepolia,
    /// Base Sepolia
    BaseSepolia,
    /// Berachain artio
    Berachain,
    /// Etherlink testnet
    Etherlink,
    /// Metis Sepolia
    MetisSepolia,
    /// Aurora (NEAR) testnet
    NearAurora,
    /// Linea Sepolia
    LineaSepolia,
    /// XDC Apothem
    XdcApothem,
    /// Lisk Sepolia
    LiskSepolia,
}

impl Chain {
    /// Every supported chain
    pub const ALL: [Chain; 23] = [
        Chain::Ethereum,
        Chain::BinanceSmartChain,
        Chain::Polygon,
        Chain::Optimism,
        Chain::ArbitrumOne,
        Chain::AvalancheCChain,
        Chain::Base,
        Chain::Linea,
        Chain::Scroll,
        Chain::Metis,
        Chain::Sepolia,
        Chain::ScrollSepolia,
        Chain::PolygonAmoy,
        Chain::OptimismSepolia,
        Chain::ArbitrumSepolia,
        Chain::BaseSepolia,
        Chain::Berachain,
        Chain::Etherlink,
        Chain::MetisSepolia,
        Chain::NearAurora,
        Chain::LineaSepolia,
        Chain::XdcApothem,
        Chain::LiskSepolia,
    ];

    /// The EIP-155 chain id
    pub const fn id(self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::BinanceSmartChain => 56,
            Chain::Polygon => 137,
            Chain::Optimism => 10,
            Chain::ArbitrumOne => 42161,
            Chain::AvalancheCChain => 43114,
            Chain::Base => 8453,
            Chain::Linea => 59144,
            Chain::Scroll => 534352,
            Chain::Metis => 1088,
            Chain::Sepolia => 11155111,
            Chain::ScrollSepolia => 534351,
            Chain::PolygonAmoy => 80002,
            Chain::OptimismSepolia => 11155420,
            Chain::ArbitrumSepolia => 421614,
            Chain::BaseSepolia => 84532,
            Chain::Berachain => 80085,
            Chain::Etherlink => 128123,
            Chain::MetisSepolia => 59902,
            Chain::NearAurora => 1313161555,
            Chain::LineaSepolia => 59141,
            Chain::XdcApothem => 51,
            Chain::LiskSepolia => 4202,
        }
    }

    /// Look up a chain by its id
    pub fn from_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|chain| chain.id() == chain_id)
    }

    /// Whether this is a test network
    pub const fn is_testnet(self) -> bool {
        !matches!(
            self,
            Chain::Ethereum
                | Chain::BinanceSmartChain
                | Chain::Polygon
                | Chain::Optimism
                | Chain::ArbitrumOne
                | Chain::AvalancheCChain
                | Chain::Base
                | Chain::Linea
                | Chain::Scroll
                | Chain::Metis
        )
    }

    /// The relay public client address, as a hex literal
    pub const fn public_client_str(self) -> &'static str {
        match self {
            Chain::Ethereum => "0xfaFCfceC4e29e9b4ECc8C0a3f7df1011580EEEf2",
            Chain::BinanceSmartChain => "0x8EaAB5e8551781F3E8eb745E7fcc7DAeEFd27b1f",
            Chain::Polygon => "0x8EaAB5e8551781F3E8eb745E7fcc7DAeEFd27b1f",
            Chain::Optimism => "0x8EaAB5e8551781F3E8eb745E7fcc7DAeEFd27b1f",
            Chain::ArbitrumOne => "0x8EaAB5e8551781F3E8eb745E7fcc7DAeEFd27b1f",
            Chain::AvalancheCChain => "0x8EaAB5e8551781F3E8eb745E7fcc7DAeEFd27b1f",
            Chain::Base => "0x8EaAB5e8551781F3E8eb745E7fcc7DAeEFd27b1f",
            Chain::Linea => "0x8EaAB5e8551781F3E8eb745E7fcc7DAeEFd27b1f",
            Chain::Scroll => "0x8EaAB5e8551781F3E8eb745E7fcc7DAeEFd27b1f",
            Chain::Metis => "0x8EaAB5e8551781F3E8eb745E7fcc7DAeEFd27b1f",
            Chain::Sepolia
            | Chain::ScrollSepolia
            | Chain::PolygonAmoy
            | Chain::OptimismSepolia
            | Chain::ArbitrumSepolia
            | Chain::BaseSepolia
            | Chain::Berachain
            | Chain::Etherlink
            | Chain::MetisSepolia
            | Chain::NearAurora
            | Chain::LineaSepolia
            | Chain::XdcApothem
            | Chain::LiskSepolia => TESTNET_PUBLIC_CLIENT,
        }
    }

    /// The relay public client contract that accepts `send` on this chain
    pub fn public_client(self) -> Address {
        CHAIN_ID_TO_PUBLIC_CLIENT[&self.id()]
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.id())
    }
}

impl TryFrom<u64> for Chain {
    type Error = u64;

    fn try_from(chain_id: u64) -> Result<Self, Self::Error> {
        Self::from_id(chain_id).ok_or(chain_id)
    }
}

/// Relay public client per chain id. Built from [`Chain::ALL`], so every
/// supported chain has exactly one entry.
pub static CHAIN_ID_TO_PUBLIC_CLIENT: Lazy<HashMap<u64, Address>> = Lazy::new(|| {
    Chain::ALL
        .into_iter()
        .map(|chain| {
            (
                chain.id(),
                chain
                    .public_client_str()
                    .parse()
                    .expect("!public client address"),
            )
        })
        .collect()
});

/// Get the relay destination for a chain id. `None` for unsupported chains.
pub fn resolve_destination(chain_id: u64) -> Option<Address> {
    CHAIN_ID_TO_PUBLIC_CLIENT.get(&chain_id).copied()
}

/// Parse a chain id as delivered by a wallet. Wallets report hex quantities
/// (`"0x14a34"`) in `chainChanged` events; decimal strings are also accepted.
pub fn parse_chain_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}
