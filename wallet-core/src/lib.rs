// lib.rs - Core library structure for the confidential wallet

pub mod account;
pub mod config;
pub mod context;
pub mod crypto;
pub mod errors;
pub mod keys;
pub mod network;
pub mod secret_store;
pub mod storage;
pub mod validation;
pub mod wallet;

// Re-export common types
pub use account::{Account, AccountCreation, AccountKey, AccountRegistry, Chain};
pub use config::{ConfigStore, SessionConfig, WalletConfig, DEFAULT_ROOT_PATH};
pub use context::WalletContext;
pub use crypto::{Argon2AesGcmCipher, KdfParameters, SeedCipher};
pub use errors::{WalletError, WalletResult};
pub use keys::{HdWallet, HARDENED_KEY_START};
pub use network::NetworkName;
pub use secret_store::SecretStore;
pub use storage::{FileWalletRepository, InMemoryWalletRepository, WalletRepository};
pub use validation::InputValidator;
pub use wallet::{AddressInfo, ScriptOwnership, Wallet, WalletCreateParams, WalletData};
