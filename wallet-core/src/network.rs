//! Named networks supported by the wallet and their chain parameters.

use std::fmt;
use std::str::FromStr;

use elements::bitcoin::NetworkKind;
use elements::AddressParams;
use serde::{Deserialize, Serialize};

use crate::errors::{WalletError, WalletResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkName {
    Liquid,
    Testnet,
    Regtest,
}

impl NetworkName {
    pub const ALL: [NetworkName; 3] = [
        NetworkName::Liquid,
        NetworkName::Testnet,
        NetworkName::Regtest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkName::Liquid => "liquid",
            NetworkName::Testnet => "testnet",
            NetworkName::Regtest => "regtest",
        }
    }

    /// Address prefixes and blech32 HRPs used when encoding addresses.
    pub fn address_params(&self) -> &'static AddressParams {
        match self {
            NetworkName::Liquid => &AddressParams::LIQUID,
            NetworkName::Testnet => &AddressParams::LIQUID_TESTNET,
            NetworkName::Regtest => &AddressParams::ELEMENTS,
        }
    }

    /// Version bytes for serialized extended keys (xpub on mainnet, tpub otherwise).
    pub fn network_kind(&self) -> NetworkKind {
        match self {
            NetworkName::Liquid => NetworkKind::Main,
            NetworkName::Testnet | NetworkName::Regtest => NetworkKind::Test,
        }
    }
}

impl fmt::Display for NetworkName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkName {
    type Err = WalletError;

    fn from_str(name: &str) -> WalletResult<Self> {
        if name.is_empty() {
            return Err(WalletError::MissingNetwork);
        }

        NetworkName::ALL
            .iter()
            .copied()
            .find(|network| network.as_str() == name)
            .ok_or_else(|| WalletError::InvalidNetwork(name.to_string()))
    }
}
