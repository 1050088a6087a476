use std::fmt;
use std::time::{Duration, Instant};

use zeroize::Zeroizing;

/// Holds the plaintext mnemonic while the wallet is unlocked.
///
/// The store itself is not synchronized; it lives inside the wallet's lock so
/// that setting and wiping it are serialized with every other state change.
/// The buffer is zeroized on `unset`, on replacement and on drop.
pub struct SecretStore {
    mnemonic: Option<Zeroizing<String>>,
    idle_timeout: Option<Duration>,
    expires_at: Option<Instant>,
}

impl SecretStore {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            mnemonic: None,
            idle_timeout,
            expires_at: None,
        }
    }

    pub fn set(&mut self, mnemonic: Zeroizing<String>) {
        self.mnemonic = Some(mnemonic);
        self.touch();
    }

    /// Wipe the plaintext mnemonic.
    pub fn unset(&mut self) {
        self.mnemonic = None;
        self.expires_at = None;
    }

    /// Whether a non-expired mnemonic is held.
    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    pub fn get(&self) -> Option<&str> {
        if self.is_expired() {
            return None;
        }
        self.mnemonic.as_ref().map(|mnemonic| mnemonic.as_str())
    }

    /// Push the idle deadline forward after a successful operation.
    pub fn touch(&mut self) {
        self.expires_at = self.idle_timeout.map(|timeout| Instant::now() + timeout);
    }

    /// Wipe the mnemonic if its idle deadline has passed. Returns whether
    /// anything was wiped.
    pub fn purge_expired(&mut self) -> bool {
        if self.mnemonic.is_some() && self.is_expired() {
            self.unset();
            return true;
        }
        false
    }

    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(deadline) if Instant::now() >= deadline)
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("is_set", &self.is_set())
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mnemonic() -> Zeroizing<String> {
        Zeroizing::new("abandon abandon about".to_string())
    }

    #[test]
    fn set_and_unset_cycle() {
        let mut store = SecretStore::new(None);
        assert!(!store.is_set());

        store.set(mnemonic());
        assert!(store.is_set());
        assert_eq!(store.get(), Some("abandon abandon about"));

        store.unset();
        assert!(!store.is_set());
        assert_eq!(store.get(), None);
    }

    #[test]
    fn idle_timeout_expires_secret() {
        let mut store = SecretStore::new(Some(Duration::from_millis(10)));
        store.set(mnemonic());
        assert!(store.is_set());

        std::thread::sleep(Duration::from_millis(30));
        assert!(!store.is_set());
        assert!(store.purge_expired());
        assert!(!store.purge_expired());
    }

    #[test]
    fn touch_extends_deadline() {
        let mut store = SecretStore::new(Some(Duration::from_millis(60)));
        store.set(mnemonic());
        std::thread::sleep(Duration::from_millis(40));
        store.touch();
        std::thread::sleep(Duration::from_millis(40));
        assert!(store.is_set());
    }

    #[test]
    fn debug_output_hides_secret() {
        let mut store = SecretStore::new(None);
        store.set(mnemonic());
        let rendered = format!("{:?}", store);
        assert!(!rendered.contains("abandon"));
    }
}
