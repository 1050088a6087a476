//! Wallet aggregate: encrypted seed, password, account registry and the
//! locked/unlocked state machine.
//!
//! A wallet is born from [`Wallet::create`] (in memory it starts out unlocked,
//! holding the plaintext seed it was created with) or from a persisted
//! [`WalletData`] via [`Wallet::restore`] (starts locked). Every operation
//! takes the wallet's single `RwLock`; the secret store lives under that same
//! lock, so a `lock()` can never interleave with a derivation in progress.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::account::{Account, AccountCreation, AccountKey, AccountRegistry, Chain};
use crate::config::WalletConfig;
use crate::context::WalletContext;
use crate::crypto::{hash_password, verify_password};
use crate::errors::{WalletError, WalletResult};
use crate::keys::{format_absolute_path, HdWallet, HARDENED_KEY_START};
use crate::network::NetworkName;
use crate::secret_store::SecretStore;
use crate::storage::WalletRepository;

/// Everything about a wallet that may be persisted. Never holds the
/// plaintext seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletData {
    pub encrypted_mnemonic: Vec<u8>,
    pub password_hash: Vec<u8>,
    pub birthday_block_height: u32,
    pub root_path: String,
    pub network: NetworkName,
    pub accounts: AccountRegistry,
    pub next_account_index: u32,
}

impl WalletData {
    pub fn is_initialized(&self) -> bool {
        !self.encrypted_mnemonic.is_empty()
    }
}

/// Parameters required to create a new wallet.
pub struct WalletCreateParams<'a> {
    pub mnemonic: &'a [String],
    pub password: &'a SecretString,
    pub root_path: &'a str,
    pub network: &'a str,
    pub birthday_block_height: u32,
    /// Accounts of a previously used wallet being re-imported.
    pub accounts: Vec<Account>,
}

impl<'a> WalletCreateParams<'a> {
    /// Parameters taking the network and root path from `config`.
    pub fn from_config(
        config: &'a WalletConfig,
        mnemonic: &'a [String],
        password: &'a SecretString,
        birthday_block_height: u32,
    ) -> Self {
        Self {
            mnemonic,
            password,
            root_path: &config.root_path,
            network: config.network.as_str(),
            birthday_block_height,
            accounts: Vec::new(),
        }
    }
}

/// Everything needed to receive funds on, and later recognize, one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub account_key: AccountKey,
    pub address: String,
    /// Hex encoded output script.
    pub script: String,
    /// Serialized blinding private key.
    pub blinding_key: Vec<u8>,
    /// Path relative to the wallet root path.
    pub derivation_path: String,
}

/// Owner of a derived output script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOwnership {
    pub script: String,
    pub account_key: AccountKey,
    pub derivation_path: String,
}

struct WalletState {
    data: WalletData,
    secrets: SecretStore,
}

impl WalletState {
    fn is_locked(&self) -> bool {
        !self.data.is_initialized() || !self.secrets.is_set()
    }

    fn mnemonic(&self) -> WalletResult<&str> {
        if !self.data.is_initialized() {
            return Err(WalletError::WalletLocked);
        }
        self.secrets.get().ok_or(WalletError::WalletLocked)
    }

    fn hd_wallet(&self) -> WalletResult<HdWallet> {
        HdWallet::new(self.mnemonic()?, &self.data.root_path, self.data.network)
    }

    fn account(&self, name: &str) -> WalletResult<&Account> {
        if self.is_locked() {
            return Err(WalletError::WalletLocked);
        }
        self.data
            .accounts
            .get_by_name(name)
            .ok_or_else(|| WalletError::AccountNotFound(name.to_string()))
    }
}

pub struct Wallet {
    context: WalletContext,
    state: RwLock<WalletState>,
}

impl Wallet {
    /// Encrypt the mnemonic with the password and build a new wallet around it.
    ///
    /// The returned wallet holds the plaintext mnemonic in memory; call
    /// [`Wallet::lock`] to wipe it.
    pub fn create(context: WalletContext, params: WalletCreateParams<'_>) -> WalletResult<Self> {
        if params.mnemonic.is_empty() {
            return Err(WalletError::MissingSeed);
        }
        if params.password.expose_secret().is_empty() {
            return Err(WalletError::MissingPassword);
        }
        if params.birthday_block_height == 0 {
            return Err(WalletError::MissingBirthday);
        }
        let network: NetworkName = params.network.parse()?;

        context.validator().validate_root_path(params.root_path)?;
        let mnemonic = Zeroizing::new(params.mnemonic.join(" "));
        HdWallet::new(&mnemonic, params.root_path, network)?;

        let accounts = imported_registry(params.accounts)?;
        let next_account_index = match accounts.max_index() {
            Some(index) => index
                .checked_add(1)
                .ok_or(WalletError::MaxAccountsReached)?,
            None => 0,
        };

        let encrypted_mnemonic = context
            .cipher()
            .encrypt(mnemonic.as_bytes(), params.password)?;

        let data = WalletData {
            encrypted_mnemonic,
            password_hash: hash_password(params.password),
            birthday_block_height: params.birthday_block_height,
            root_path: params.root_path.to_string(),
            network,
            accounts,
            next_account_index,
        };

        let mut secrets = context.new_secret_store();
        secrets.set(mnemonic);

        log::info!(
            "Created {} wallet with {} imported account(s)",
            network,
            data.accounts.len()
        );
        Ok(Self {
            context,
            state: RwLock::new(WalletState { data, secrets }),
        })
    }

    /// Rebuild a wallet from persisted data. The wallet starts locked.
    pub fn restore(context: WalletContext, data: WalletData) -> Self {
        let secrets = context.new_secret_store();
        Self {
            context,
            state: RwLock::new(WalletState { data, secrets }),
        }
    }

    /// Load the wallet held by `repository`, if any. The wallet starts locked.
    pub fn load(
        context: WalletContext,
        repository: &dyn WalletRepository,
    ) -> WalletResult<Option<Self>> {
        Ok(repository
            .load()?
            .map(|data| Self::restore(context, data)))
    }

    /// Write the persistable state to `repository`.
    pub fn persist(&self, repository: &dyn WalletRepository) -> WalletResult<()> {
        let snapshot = self.snapshot();
        repository.save(&snapshot)
    }

    pub fn snapshot(&self) -> WalletData {
        self.read().data.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.read().data.is_initialized()
    }

    pub fn is_locked(&self) -> bool {
        self.read().is_locked()
    }

    pub fn network(&self) -> NetworkName {
        self.read().data.network
    }

    pub fn birthday_block_height(&self) -> u32 {
        self.read().data.birthday_block_height
    }

    pub fn root_path(&self) -> String {
        self.read().data.root_path.clone()
    }

    pub fn next_account_index(&self) -> u32 {
        self.read().data.next_account_index
    }

    /// Wipe the plaintext mnemonic. Locking a locked wallet is a no-op.
    pub fn lock(&self) {
        let mut state = self.write();
        if state.is_locked() {
            return;
        }
        state.secrets.unset();
        log::info!("Wallet locked");
    }

    /// Decrypt the mnemonic with `password` and keep it in memory.
    pub fn unlock(&self, password: &SecretString) -> WalletResult<()> {
        let mut state = self.write();
        if !state.is_locked() {
            return Ok(());
        }

        if !verify_password(&state.data.password_hash, password) {
            log::warn!("Unlock rejected: wrong password");
            return Err(WalletError::InvalidPassword);
        }

        let plaintext = self
            .context
            .cipher()
            .decrypt(&state.data.encrypted_mnemonic, password)?;
        let mnemonic = decode_mnemonic(&plaintext)?;

        state.secrets.set(mnemonic);
        log::info!("Wallet unlocked");
        Ok(())
    }

    /// Re-encrypt the mnemonic under a new password.
    ///
    /// Only allowed while the wallet is locked: the mnemonic is decrypted with
    /// the current password for the duration of the call and the wallet stays
    /// locked afterwards.
    pub fn change_password(
        &self,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> WalletResult<()> {
        let mut state = self.write();
        if !state.is_locked() {
            return Err(WalletError::WalletUnlocked);
        }
        if new_password.expose_secret().is_empty() {
            return Err(WalletError::MissingPassword);
        }
        if !verify_password(&state.data.password_hash, current_password) {
            log::warn!("Password change rejected: wrong password");
            return Err(WalletError::InvalidPassword);
        }

        let cipher = self.context.cipher();
        let plaintext = cipher.decrypt(&state.data.encrypted_mnemonic, current_password)?;
        let encrypted_mnemonic = cipher.encrypt(&plaintext, new_password)?;

        state.data.encrypted_mnemonic = encrypted_mnemonic;
        state.data.password_hash = hash_password(new_password);
        log::info!("Wallet password changed");
        Ok(())
    }

    /// The plaintext mnemonic words.
    pub fn mnemonic(&self) -> WalletResult<Zeroizing<Vec<String>>> {
        let state = self.read();
        let mnemonic = state.mnemonic()?;
        Ok(Zeroizing::new(
            mnemonic.split_whitespace().map(str::to_string).collect(),
        ))
    }

    /// Hex encoded SLIP-77 master blinding key.
    pub fn master_blinding_key(&self) -> WalletResult<String> {
        let state = self.read();
        Ok(state.hd_wallet()?.master_blinding_key())
    }

    /// Create the account `name` at the next free index.
    ///
    /// Asking for a name that already exists is not an error: the existing
    /// account key is reported back and nothing changes.
    pub fn create_account(&self, name: &str, birthday_block: u32) -> WalletResult<AccountCreation> {
        let mut state = self.write();
        if state.is_locked() {
            return Err(WalletError::WalletLocked);
        }
        self.context.validator().validate_account_name(name)?;

        if let Some(existing) = state.data.accounts.get_by_name(name) {
            log::debug!("Account {} already exists", existing.key);
            return Ok(AccountCreation::AlreadyExists(existing.key.clone()));
        }

        let index = state.data.next_account_index;
        if index >= HARDENED_KEY_START {
            return Err(WalletError::MaxAccountsReached);
        }

        let hd = state.hd_wallet()?;
        let xpub = hd.account_xpub(index)?;
        let derivation_path = hd.account_path(index)?;

        let account = Account::new(
            AccountKey::new(name, index),
            xpub.to_string(),
            format_absolute_path(&derivation_path),
            birthday_block.max(state.data.birthday_block_height),
        );
        state.data.accounts.insert(account.clone())?;
        state.data.next_account_index = index + 1;
        state.secrets.touch();

        log::info!("Created account {} at {}", account.key, account.derivation_path);
        Ok(AccountCreation::Created(account))
    }

    pub fn get_account(&self, name: &str) -> WalletResult<Account> {
        self.read().account(name).cloned()
    }

    /// Unlocked-only listing of every account, ordered by index.
    pub fn list_accounts(&self) -> WalletResult<Vec<Account>> {
        let state = self.read();
        if state.is_locked() {
            return Err(WalletError::WalletLocked);
        }
        Ok(state.data.accounts.iter().cloned().collect())
    }

    /// Remove an account. Its index is never handed out again.
    pub fn delete_account(&self, name: &str) -> WalletResult<()> {
        let mut state = self.write();
        state.account(name)?;
        if let Some(removed) = state.data.accounts.remove_by_name(name) {
            log::info!("Deleted account {}", removed.key);
        }
        Ok(())
    }

    pub fn derive_next_external_address(&self, account_name: &str) -> WalletResult<AddressInfo> {
        self.derive_next_address(account_name, Chain::External)
    }

    pub fn derive_next_internal_address(&self, account_name: &str) -> WalletResult<AddressInfo> {
        self.derive_next_address(account_name, Chain::Internal)
    }

    /// Derive the next unused address on `chain` and remember its script.
    pub fn derive_next_address(&self, account_name: &str, chain: Chain) -> WalletResult<AddressInfo> {
        let mut state = self.write();
        let (key, path) = {
            let account = state.account(account_name)?;
            let path = account.address_path(chain, account.next_index(chain));
            (account.key.clone(), path)
        };

        let hd = state.hd_wallet()?;
        let info = address_info(&hd, &key, path)?;

        let account = state
            .data
            .accounts
            .get_by_name_mut(account_name)
            .ok_or_else(|| WalletError::AccountNotFound(account_name.to_string()))?;
        account.record_derivation(chain, info.script.clone(), info.derivation_path.clone());
        state.secrets.touch();

        log::debug!("Derived address {} for account {}", info.derivation_path, key);
        Ok(info)
    }

    /// Recompute every address derived so far for the account: external ones
    /// first, then internal ones when requested, each in ascending index order.
    ///
    /// Nothing is read back from the script index; the result is re-derived
    /// from the seed and must match what derivation originally returned.
    pub fn list_derived_addresses(
        &self,
        account_name: &str,
        include_internal: bool,
    ) -> WalletResult<Vec<AddressInfo>> {
        let state = self.read();
        let account = state.account(account_name)?;
        let hd = state.hd_wallet()?;

        let mut chains = vec![(Chain::External, account.next_external_index)];
        if include_internal {
            chains.push((Chain::Internal, account.next_internal_index));
        }

        let capacity = chains.iter().map(|(_, count)| *count as usize).sum();
        let mut addresses = Vec::with_capacity(capacity);
        for (chain, count) in chains {
            for index in 0..count {
                let path = account.address_path(chain, index);
                addresses.push(address_info(&hd, &account.key, path)?);
            }
        }
        Ok(addresses)
    }

    /// Every derived script with its owning account and path. Scripts are
    /// public data, so this does not require the wallet to be unlocked.
    pub fn known_scripts(&self) -> Vec<ScriptOwnership> {
        let state = self.read();
        state
            .data
            .accounts
            .iter()
            .flat_map(|account| {
                account
                    .derivation_path_by_script
                    .iter()
                    .map(move |(script, path)| ScriptOwnership {
                        script: script.clone(),
                        account_key: account.key.clone(),
                        derivation_path: path.clone(),
                    })
            })
            .collect()
    }

    /// Owner of a hex encoded script, if this wallet derived it.
    pub fn script_owner(&self, script: &str) -> Option<ScriptOwnership> {
        let script = script.to_ascii_lowercase();
        let state = self.read();
        let owner = state.data.accounts.iter().find_map(|account| {
            account
                .derivation_path_for_script(&script)
                .map(|path| ScriptOwnership {
                    script: script.clone(),
                    account_key: account.key.clone(),
                    derivation_path: path.to_string(),
                })
        });
        owner
    }

    fn read(&self) -> RwLockReadGuard<'_, WalletState> {
        self.state.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, WalletState> {
        let mut state = self.state.write();
        if state.secrets.purge_expired() {
            log::info!("Wallet auto-locked after inactivity");
        }
        state
    }
}

/// Registry of re-imported accounts. Every index must sit below the hardened
/// boundary and no two accounts may share a name or an index.
fn imported_registry(accounts: Vec<Account>) -> WalletResult<AccountRegistry> {
    let mut registry = AccountRegistry::new();
    for account in accounts {
        if account.key.index >= HARDENED_KEY_START {
            return Err(WalletError::ValidationError(format!(
                "Imported account {} is beyond the hardened index range",
                account.key
            )));
        }
        registry.insert(account)?;
    }
    Ok(registry)
}

fn address_info(
    hd: &HdWallet,
    key: &AccountKey,
    derivation_path: String,
) -> WalletResult<AddressInfo> {
    let derived = hd.derive_confidential_address(&derivation_path)?;
    let (blinding_key, _) = hd.blinding_key_pair(&derived.script)?;

    Ok(AddressInfo {
        account_key: key.clone(),
        address: derived.address.to_string(),
        script: hex::encode(derived.script.as_bytes()),
        blinding_key: blinding_key.secret_bytes().to_vec(),
        derivation_path,
    })
}

fn decode_mnemonic(plaintext: &[u8]) -> WalletResult<Zeroizing<String>> {
    let mnemonic = std::str::from_utf8(plaintext)
        .map_err(|_| WalletError::CryptoError("Decrypted mnemonic is not valid UTF-8".to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}
