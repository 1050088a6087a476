#![allow(dead_code)]

use std::sync::Arc;

use confidential_wallet_lib::{
    Argon2AesGcmCipher, KdfParameters, Wallet, WalletContext, WalletCreateParams, WalletResult,
};
use secrecy::SecretString;

pub const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
pub const ROOT_PATH: &str = "m/84'/1776'";

/// Context with Argon2 costs low enough for tests.
pub fn test_context() -> WalletContext {
    let cipher = Argon2AesGcmCipher::new(KdfParameters {
        m_cost_kib: 256,
        t_cost: 1,
        p_cost: 1,
    })
    .expect("cheap kdf params");
    WalletContext::new(Arc::new(cipher)).expect("context")
}

pub fn words() -> Vec<String> {
    MNEMONIC.split(' ').map(str::to_string).collect()
}

pub fn password(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

pub fn create_wallet(network: &str, pass: &str) -> WalletResult<Wallet> {
    let words = words();
    let pass = password(pass);
    Wallet::create(
        test_context(),
        WalletCreateParams {
            mnemonic: &words,
            password: &pass,
            root_path: ROOT_PATH,
            network,
            birthday_block_height: 100,
            accounts: Vec::new(),
        },
    )
}
