use parking_lot::Mutex;

use crate::errors::WalletResult;
use crate::wallet::WalletData;

/// Persistence contract for a single wallet.
pub trait WalletRepository: Send + Sync {
    /// The stored wallet, or `None` when nothing was saved yet.
    fn load(&self) -> WalletResult<Option<WalletData>>;

    /// Replace the stored wallet with `data`.
    fn save(&self, data: &WalletData) -> WalletResult<()>;
}

/// Keeps the wallet in process memory.
#[derive(Debug, Default)]
pub struct InMemoryWalletRepository {
    slot: Mutex<Option<WalletData>>,
}

impl InMemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletRepository for InMemoryWalletRepository {
    fn load(&self) -> WalletResult<Option<WalletData>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, data: &WalletData) -> WalletResult<()> {
        *self.slot.lock() = Some(data.clone());
        Ok(())
    }
}
