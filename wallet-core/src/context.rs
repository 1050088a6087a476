use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::WalletConfig;
use crate::crypto::{Argon2AesGcmCipher, SeedCipher};
use crate::errors::WalletResult;
use crate::secret_store::SecretStore;
use crate::validation::InputValidator;

/// Services shared by every wallet built from the same configuration.
#[derive(Clone)]
pub struct WalletContext {
    cipher: Arc<dyn SeedCipher>,
    validator: InputValidator,
    auto_lock: Option<Duration>,
}

impl WalletContext {
    pub fn new(cipher: Arc<dyn SeedCipher>) -> WalletResult<Self> {
        Ok(Self {
            cipher,
            validator: InputValidator::new()?,
            auto_lock: None,
        })
    }

    pub fn from_config(config: &WalletConfig) -> WalletResult<Self> {
        let cipher = Argon2AesGcmCipher::new(config.cipher)?;
        Ok(Self::new(Arc::new(cipher))?
            .with_auto_lock(duration_from_minutes(config.session.auto_lock_minutes)))
    }

    pub fn with_auto_lock(mut self, auto_lock: Option<Duration>) -> Self {
        self.auto_lock = auto_lock;
        self
    }

    pub fn cipher(&self) -> &dyn SeedCipher {
        self.cipher.as_ref()
    }

    pub fn validator(&self) -> &InputValidator {
        &self.validator
    }

    pub fn auto_lock(&self) -> Option<Duration> {
        self.auto_lock
    }

    pub(crate) fn new_secret_store(&self) -> SecretStore {
        SecretStore::new(self.auto_lock)
    }
}

impl fmt::Debug for WalletContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletContext")
            .field("auto_lock", &self.auto_lock)
            .finish_non_exhaustive()
    }
}

fn duration_from_minutes(minutes: u32) -> Option<Duration> {
    if minutes == 0 {
        return None;
    }
    Some(Duration::from_secs(u64::from(minutes).saturating_mul(60)))
}
