use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum WalletError {
    // Creation input errors
    MissingSeed,
    MissingPassword,
    MissingNetwork,
    MissingBirthday,
    InvalidNetwork(String),

    // Lock state errors
    WalletLocked,
    WalletUnlocked,
    InvalidPassword,

    // Account errors
    MaxAccountsReached,
    AccountNotFound(String),

    // Key derivation and cipher errors
    DerivationFailure(String),
    CryptoError(String),

    // Validation errors
    ValidationError(String),

    // Storage errors
    StorageError(String),
    FileNotFound(String),
    PermissionDenied(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::MissingSeed => write!(f, "Missing mnemonic"),
            WalletError::MissingPassword => write!(f, "Missing password"),
            WalletError::MissingNetwork => write!(f, "Missing network name"),
            WalletError::MissingBirthday => write!(f, "Missing birthday block height"),
            WalletError::InvalidNetwork(name) => write!(f, "Unknown network: {}", name),

            WalletError::WalletLocked => write!(f, "Wallet is locked"),
            WalletError::WalletUnlocked => write!(f, "Wallet must be locked"),
            WalletError::InvalidPassword => write!(f, "Wrong password"),

            WalletError::MaxAccountsReached => write!(f, "Reached max number of accounts"),
            WalletError::AccountNotFound(name) => {
                write!(f, "Account not found in wallet: {}", name)
            }

            WalletError::DerivationFailure(msg) => write!(f, "Key derivation error: {}", msg),
            WalletError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),

            WalletError::ValidationError(msg) => write!(f, "Validation error: {}", msg),

            WalletError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            WalletError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            WalletError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

pub type WalletResult<T> = Result<T, WalletError>;

// Conversion helpers
impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => WalletError::FileNotFound(error.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                WalletError::PermissionDenied(error.to_string())
            }
            _ => WalletError::StorageError(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::ValidationError(format!("JSON error: {}", error))
    }
}

impl From<elements::bitcoin::bip32::Error> for WalletError {
    fn from(error: elements::bitcoin::bip32::Error) -> Self {
        WalletError::DerivationFailure(error.to_string())
    }
}
