use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{WalletError, WalletResult};

/// Address chain below an account: receiving or change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    External,
    Internal,
}

impl Chain {
    pub fn index(&self) -> u32 {
        match self {
            Chain::External => 0,
            Chain::Internal => 1,
        }
    }
}

/// Immutable identity of an account: unique name and unique index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub name: String,
    pub index: u32,
}

impl AccountKey {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub key: AccountKey,
    /// Account level extended public key.
    pub xpub: String,
    /// Absolute base path of the account, e.g. `m/84'/1776'/0'`.
    pub derivation_path: String,
    pub next_external_index: u32,
    pub next_internal_index: u32,
    /// Hex output script -> derivation path relative to the root path.
    pub derivation_path_by_script: BTreeMap<String, String>,
    pub birthday_block: u32,
}

impl Account {
    pub fn new(
        key: AccountKey,
        xpub: impl Into<String>,
        derivation_path: impl Into<String>,
        birthday_block: u32,
    ) -> Self {
        Self {
            key,
            xpub: xpub.into(),
            derivation_path: derivation_path.into(),
            next_external_index: 0,
            next_internal_index: 0,
            derivation_path_by_script: BTreeMap::new(),
            birthday_block,
        }
    }

    pub fn next_index(&self, chain: Chain) -> u32 {
        match chain {
            Chain::External => self.next_external_index,
            Chain::Internal => self.next_internal_index,
        }
    }

    /// Relative derivation path `<account>'/<chain>/<index>`.
    pub fn address_path(&self, chain: Chain, index: u32) -> String {
        format!("{}'/{}/{}", self.key.index, chain.index(), index)
    }

    pub fn derivation_path_for_script(&self, script: &str) -> Option<&str> {
        self.derivation_path_by_script
            .get(script)
            .map(|path| path.as_str())
    }

    /// Record a freshly derived script and advance the chain counter.
    pub(crate) fn record_derivation(&mut self, chain: Chain, script: String, path: String) {
        self.derivation_path_by_script.insert(script, path);
        match chain {
            Chain::External => self.next_external_index += 1,
            Chain::Internal => self.next_internal_index += 1,
        }
    }
}

/// Outcome of asking the wallet to create an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCreation {
    Created(Account),
    /// An account with the requested name already exists; nothing changed.
    AlreadyExists(AccountKey),
}

impl AccountCreation {
    pub fn created(self) -> Option<Account> {
        match self {
            AccountCreation::Created(account) => Some(account),
            AccountCreation::AlreadyExists(_) => None,
        }
    }
}

/// Every account of a wallet, owned in one table keyed by account index.
///
/// The name lookup is derived from the table and maintained in the same call
/// that mutates it, so lookups by index and by name always agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Account>", into = "Vec<Account>")]
pub struct AccountRegistry {
    accounts: BTreeMap<u32, Account>,
    index_by_name: HashMap<String, u32>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn insert(&mut self, account: Account) -> WalletResult<()> {
        if self.accounts.contains_key(&account.key.index) {
            return Err(WalletError::ValidationError(format!(
                "Account index {} already in use",
                account.key.index
            )));
        }
        if self.index_by_name.contains_key(&account.key.name) {
            return Err(WalletError::ValidationError(format!(
                "Account name '{}' already in use",
                account.key.name
            )));
        }

        self.index_by_name
            .insert(account.key.name.clone(), account.key.index);
        self.accounts.insert(account.key.index, account);
        Ok(())
    }

    pub fn remove_by_name(&mut self, name: &str) -> Option<Account> {
        let index = self.index_by_name.remove(name)?;
        self.accounts.remove(&index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Account> {
        self.index_by_name
            .get(name)
            .and_then(|index| self.accounts.get(index))
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Account> {
        let index = *self.index_by_name.get(name)?;
        self.accounts.get_mut(&index)
    }

    /// Accounts in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Highest index ever assigned among the held accounts.
    pub fn max_index(&self) -> Option<u32> {
        self.accounts.keys().next_back().copied()
    }
}

impl From<Vec<Account>> for AccountRegistry {
    fn from(accounts: Vec<Account>) -> Self {
        let mut registry = AccountRegistry::new();
        for account in accounts {
            // a later entry replaces any earlier one holding the same index or name
            if let Some(previous) = registry.accounts.remove(&account.key.index) {
                registry.index_by_name.remove(&previous.key.name);
            }
            if let Some(index) = registry.index_by_name.remove(&account.key.name) {
                registry.accounts.remove(&index);
            }
            registry
                .index_by_name
                .insert(account.key.name.clone(), account.key.index);
            registry.accounts.insert(account.key.index, account);
        }
        registry
    }
}

impl From<AccountRegistry> for Vec<Account> {
    fn from(registry: AccountRegistry) -> Self {
        registry.accounts.into_values().collect()
    }
}
