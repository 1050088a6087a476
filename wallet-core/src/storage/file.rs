use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use blake3::Hasher as Blake3;
use serde::{Deserialize, Serialize};

use super::WalletRepository;
use crate::errors::{WalletError, WalletResult};
use crate::wallet::WalletData;

const WALLET_MAGIC: &[u8; 8] = b"CNFDWLLT";
const WALLET_FILE_VERSION: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WalletFile {
    magic: [u8; 8],
    version: u16,
    checksum: [u8; 32],
    payload: WalletData,
}

/// Stores the wallet as a JSON document with an integrity checksum.
///
/// Writes go to a sibling `.new` file that is renamed over the previous one,
/// so a crash mid-write leaves the old state in place.
#[derive(Debug, Clone)]
pub struct FileWalletRepository {
    path: PathBuf,
}

impl FileWalletRepository {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_wallet_file(&self) -> WalletResult<WalletFile> {
        let bytes = fs::read(&self.path)?;
        let wallet_file: WalletFile = serde_json::from_slice(&bytes)?;

        if &wallet_file.magic != WALLET_MAGIC {
            return Err(WalletError::ValidationError(
                "Invalid wallet file magic marker".to_string(),
            ));
        }

        if wallet_file.version != WALLET_FILE_VERSION {
            return Err(WalletError::ValidationError(format!(
                "Unsupported wallet file version: {}",
                wallet_file.version
            )));
        }

        if checksum(&wallet_file.payload)? != wallet_file.checksum {
            return Err(WalletError::ValidationError(
                "Wallet file integrity verification failed".to_string(),
            ));
        }

        Ok(wallet_file)
    }
}

impl WalletRepository for FileWalletRepository {
    fn load(&self) -> WalletResult<Option<WalletData>> {
        if !self.exists() {
            return Ok(None);
        }
        Ok(Some(self.read_wallet_file()?.payload))
    }

    fn save(&self, data: &WalletData) -> WalletResult<()> {
        let wallet_file = WalletFile {
            magic: *WALLET_MAGIC,
            version: WALLET_FILE_VERSION,
            checksum: checksum(data)?,
            payload: data.clone(),
        };
        let serialized = serde_json::to_vec(&wallet_file)?;

        let mut file = create_atomic_file(&self.path)?;
        file.write_all(&serialized)?;
        file.sync_all()?;
        finalize_atomic_file(file, &self.path)?;
        log::debug!("Saved wallet to {}", self.path.display());
        Ok(())
    }
}

fn checksum(data: &WalletData) -> WalletResult<[u8; 32]> {
    let encoded = serde_json::to_vec(data)?;
    let mut hasher = Blake3::new();
    hasher.update(&encoded);
    let mut output = [0u8; 32];
    output.copy_from_slice(hasher.finalize().as_bytes());
    Ok(output)
}

fn create_atomic_file(path: &Path) -> WalletResult<File> {
    let dir = path
        .parent()
        .ok_or_else(|| WalletError::StorageError("Invalid wallet path".to_string()))?;
    fs::create_dir_all(dir)?;
    let tmp_path = path.with_extension("new");
    Ok(File::create(&tmp_path)?)
}

fn finalize_atomic_file(mut file: File, final_path: &Path) -> WalletResult<()> {
    file.flush()?;
    drop(file);
    let tmp_path = final_path.with_extension("new");
    fs::rename(tmp_path, final_path)?;
    Ok(())
}
