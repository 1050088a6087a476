//! Hierarchical deterministic key tree for a single mnemonic.
//!
//! Spending keys follow BIP32 below a configurable root path, addresses are
//! native segwit (P2WPKH) confidential addresses, and blinding keys follow
//! SLIP-77: they are a function of the seed and the output script only, so
//! anyone holding the master blinding key can recover them from a script
//! without knowing the derivation path.

use std::str::FromStr;

use bip39::Mnemonic;
use elements::bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv, Xpub};
use elements::bitcoin::secp256k1::{self, All, Secp256k1, SecretKey};
use elements::bitcoin::PublicKey;
use elements::{Address, Script};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::errors::{WalletError, WalletResult};
use crate::network::NetworkName;

/// First hardened child index; account indices must stay below it.
pub const HARDENED_KEY_START: u32 = 0x8000_0000;

const SLIP21_SEED_KEY: &[u8] = b"Symmetric key seed";
const SLIP77_LABEL: &[u8] = b"SLIP-0077";

/// A confidential address together with its output script.
#[derive(Debug, Clone)]
pub struct DerivedAddress {
    pub address: Address,
    pub script: Script,
}

pub struct HdWallet {
    secp: Secp256k1<All>,
    master: Xpriv,
    root_path: DerivationPath,
    master_blinding_key: Zeroizing<[u8; 32]>,
    network: NetworkName,
}

impl HdWallet {
    /// Open the key tree of `mnemonic` below `root_path`.
    ///
    /// Fails when the mnemonic is not a valid BIP39 phrase or the root path
    /// cannot be parsed; this doubles as the wallet's seed validation.
    pub fn new(mnemonic: &str, root_path: &str, network: NetworkName) -> WalletResult<Self> {
        let mnemonic = Mnemonic::parse(mnemonic)
            .map_err(|e| WalletError::DerivationFailure(format!("Invalid mnemonic: {e}")))?;
        let root_path = DerivationPath::from_str(root_path)?;

        let seed = Zeroizing::new(mnemonic.to_seed(""));
        let master = Xpriv::new_master(network.network_kind(), &seed[..])?;
        let master_blinding_key = slip77_master_key(&seed[..])?;

        Ok(Self {
            secp: Secp256k1::new(),
            master,
            root_path,
            master_blinding_key,
            network,
        })
    }

    pub fn network(&self) -> NetworkName {
        self.network
    }

    /// Absolute path of the account: root path followed by `account'`.
    pub fn account_path(&self, account: u32) -> WalletResult<DerivationPath> {
        let hardened = ChildNumber::from_hardened_idx(account)?;
        let mut children: Vec<ChildNumber> = self.root_path.as_ref().to_vec();
        children.push(hardened);
        Ok(DerivationPath::from(children))
    }

    pub fn account_xpub(&self, account: u32) -> WalletResult<Xpub> {
        let path = self.account_path(account)?;
        let account_key = self.master.derive_priv(&self.secp, &path)?;
        Ok(Xpub::from_priv(&self.secp, &account_key))
    }

    /// Derive the confidential address at `path`, relative to the root path
    /// (for example `0'/0/3`).
    pub fn derive_confidential_address(&self, path: &str) -> WalletResult<DerivedAddress> {
        let full_path = self.absolute_path(path)?;
        let key = self.master.derive_priv(&self.secp, &full_path)?;
        let public_key = PublicKey::new(Xpub::from_priv(&self.secp, &key).public_key);

        let params = self.network.address_params();
        let unconfidential = Address::p2wpkh(&public_key, None, params);
        let script = unconfidential.script_pubkey();
        let (_, blinding_public_key) = self.blinding_key_pair(&script)?;

        Ok(DerivedAddress {
            address: unconfidential.to_confidential(blinding_public_key),
            script,
        })
    }

    /// SLIP-77 blinding key pair for an output script.
    pub fn blinding_key_pair(
        &self,
        script: &Script,
    ) -> WalletResult<(SecretKey, secp256k1::PublicKey)> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.master_blinding_key[..])
            .map_err(|e| WalletError::DerivationFailure(e.to_string()))?;
        mac.update(script.as_bytes());
        let digest = mac.finalize().into_bytes();

        let secret = SecretKey::from_slice(&digest)
            .map_err(|e| WalletError::DerivationFailure(format!("Invalid blinding key: {e}")))?;
        let public = secp256k1::PublicKey::from_secret_key(&self.secp, &secret);
        Ok((secret, public))
    }

    /// Hex encoded SLIP-77 master blinding key.
    pub fn master_blinding_key(&self) -> String {
        hex::encode(&self.master_blinding_key[..])
    }

    fn absolute_path(&self, relative: &str) -> WalletResult<DerivationPath> {
        let relative = relative.trim_start_matches("m/");
        let suffix = DerivationPath::from_str(&format!("m/{relative}"))?;
        let mut children: Vec<ChildNumber> = self.root_path.as_ref().to_vec();
        children.extend_from_slice(suffix.as_ref());
        Ok(DerivationPath::from(children))
    }
}

/// Render an absolute path as `m/...`; newer bip32 releases omit the `m`.
pub fn format_absolute_path(path: &DerivationPath) -> String {
    let rendered = path.to_string();
    let rendered = rendered.trim_start_matches('m').trim_start_matches('/');
    if rendered.is_empty() {
        "m".to_string()
    } else {
        format!("m/{rendered}")
    }
}

/// SLIP-21 node `m/"SLIP-0077"`: the right half of the node is the key.
fn slip77_master_key(seed: &[u8]) -> WalletResult<Zeroizing<[u8; 32]>> {
    let mut mac = Hmac::<Sha512>::new_from_slice(SLIP21_SEED_KEY)
        .map_err(|e| WalletError::DerivationFailure(e.to_string()))?;
    mac.update(seed);
    let mut root = Zeroizing::new([0u8; 64]);
    root.copy_from_slice(&mac.finalize().into_bytes());

    let mut mac = Hmac::<Sha512>::new_from_slice(&root[..32])
        .map_err(|e| WalletError::DerivationFailure(e.to_string()))?;
    mac.update(&[0u8]);
    mac.update(SLIP77_LABEL);
    let mut node = Zeroizing::new([0u8; 64]);
    node.copy_from_slice(&mac.finalize().into_bytes());

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&node[32..]);
    Ok(key)
}
