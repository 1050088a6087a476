pub mod file;
pub mod repository;

pub use file::FileWalletRepository;
pub use repository::{InMemoryWalletRepository, WalletRepository};
