mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use common::{create_wallet, password, test_context, words, MNEMONIC, ROOT_PATH};
use confidential_wallet_lib::{
    AccountCreation, Chain, HdWallet, NetworkName, Wallet, WalletCreateParams, WalletError,
    WalletResult, HARDENED_KEY_START,
};

#[test]
fn wallet_create_lock_unlock_flow() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;
    assert!(wallet.is_initialized());
    assert!(!wallet.is_locked());
    assert_eq!(wallet.network(), NetworkName::Liquid);
    assert_eq!(wallet.birthday_block_height(), 100);
    assert_eq!(wallet.root_path(), ROOT_PATH);

    wallet.lock();
    assert!(wallet.is_locked());
    assert_eq!(wallet.mnemonic().unwrap_err(), WalletError::WalletLocked);

    // Locking twice is harmless
    wallet.lock();

    wallet.unlock(&password("p1"))?;
    assert!(!wallet.is_locked());
    assert_eq!(*wallet.mnemonic()?, words());

    // Unlocking an unlocked wallet is a no-op, whatever the password
    wallet.unlock(&password("anything"))?;
    assert!(!wallet.is_locked());
    Ok(())
}

#[test]
fn wrong_password_keeps_wallet_locked() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;
    wallet.lock();

    let err = wallet
        .unlock(&password("nope"))
        .expect_err("expected unlock failure");
    assert_eq!(err, WalletError::InvalidPassword);
    assert!(wallet.is_locked());
    assert_eq!(
        wallet.create_account("acct0", 0).unwrap_err(),
        WalletError::WalletLocked
    );
    Ok(())
}

fn create_error(mnemonic: &[String], pass: &str, root_path: &str, network: &str, birthday: u32) -> WalletError {
    let pass = password(pass);
    let params = WalletCreateParams {
        mnemonic,
        password: &pass,
        root_path,
        network,
        birthday_block_height: birthday,
        accounts: Vec::new(),
    };
    match Wallet::create(test_context(), params) {
        Ok(_) => panic!("expected wallet creation to fail"),
        Err(err) => err,
    }
}

#[test]
fn create_validates_inputs_in_order() {
    let words = words();

    assert_eq!(create_error(&[], "", "", "", 0), WalletError::MissingSeed);
    assert_eq!(create_error(&words, "", "", "", 0), WalletError::MissingPassword);
    assert_eq!(create_error(&words, "p1", "", "", 0), WalletError::MissingBirthday);
    assert_eq!(
        create_error(&words, "p1", ROOT_PATH, "", 1),
        WalletError::MissingNetwork
    );
    assert_eq!(
        create_error(&words, "p1", ROOT_PATH, "mainnet", 1),
        WalletError::InvalidNetwork("mainnet".to_string())
    );
    assert!(matches!(
        create_error(&words, "p1", "84'/1776'", "liquid", 1),
        WalletError::ValidationError(_)
    ));

    let bad_words: Vec<String> = ["not", "a", "seed"].iter().map(|w| w.to_string()).collect();
    assert!(matches!(
        create_error(&bad_words, "p1", ROOT_PATH, "liquid", 1),
        WalletError::DerivationFailure(_)
    ));
}

#[test]
fn first_account_scenario() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;

    let account = wallet
        .create_account("acct0", 0)?
        .created()
        .expect("new account");
    assert_eq!(account.key.name, "acct0");
    assert_eq!(account.key.index, 0);
    assert_eq!(account.derivation_path, "m/84'/1776'/0'");
    assert!(account.xpub.starts_with("xpub"));
    assert_eq!(wallet.next_account_index(), 1);

    let first = wallet.derive_next_external_address("acct0")?;
    let second = wallet.derive_next_external_address("acct0")?;
    assert_eq!(first.derivation_path, "0'/0/0");
    assert_eq!(second.derivation_path, "0'/0/1");
    assert_ne!(first.script, second.script);
    assert_ne!(first.address, second.address);
    assert!(first.address.starts_with("lq1"));
    assert_eq!(first.blinding_key.len(), 32);

    let account = wallet.get_account("acct0")?;
    assert_eq!(account.next_external_index, 2);
    assert_eq!(account.next_internal_index, 0);
    assert_eq!(account.derivation_path_by_script.len(), 2);
    Ok(())
}

#[test]
fn derivations_never_repeat() -> WalletResult<()> {
    let wallet = create_wallet("testnet", "p1")?;
    wallet.create_account("main", 0)?;

    let mut paths = HashSet::new();
    let mut scripts = HashSet::new();
    for step in 0..4u32 {
        let chain = if step % 2 == 0 {
            Chain::External
        } else {
            Chain::Internal
        };
        let before = wallet.get_account("main")?.next_index(chain);
        let info = wallet.derive_next_address("main", chain)?;
        let after = wallet.get_account("main")?.next_index(chain);

        assert_eq!(after, before + 1);
        assert!(info.address.starts_with("tlq1"));
        assert!(paths.insert(info.derivation_path));
        assert!(scripts.insert(info.script));
    }
    Ok(())
}

#[test]
fn listing_reproduces_derivations() -> WalletResult<()> {
    let wallet = create_wallet("regtest", "p1")?;
    wallet.create_account("main", 0)?;

    let mut external = Vec::new();
    let mut internal = Vec::new();
    for _ in 0..3 {
        external.push(wallet.derive_next_external_address("main")?);
    }
    for _ in 0..2 {
        internal.push(wallet.derive_next_internal_address("main")?);
    }

    assert_eq!(wallet.list_derived_addresses("main", false)?, external);

    let mut expected = external.clone();
    expected.extend(internal);
    let listed = wallet.list_derived_addresses("main", true)?;
    assert_eq!(listed.len(), 5);
    assert_eq!(listed, expected);
    assert!(listed.iter().all(|info| info.address.starts_with("el1")));
    Ok(())
}

#[test]
fn duplicate_account_is_benign() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;
    wallet.create_account("acct0", 0)?;
    wallet.create_account("acct1", 0)?;

    let outcome = wallet.create_account("acct0", 500)?;
    match outcome {
        AccountCreation::AlreadyExists(key) => {
            assert_eq!(key.name, "acct0");
            assert_eq!(key.index, 0);
        }
        other => panic!("expected existing account, got {other:?}"),
    }
    assert_eq!(wallet.list_accounts()?.len(), 2);
    assert_eq!(wallet.next_account_index(), 2);
    assert_eq!(wallet.get_account("acct0")?.birthday_block, 100);
    Ok(())
}

#[test]
fn account_operations_require_unlocked_wallet() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;
    wallet.create_account("acct0", 0)?;
    wallet.lock();

    assert_eq!(
        wallet.get_account("acct0").unwrap_err(),
        WalletError::WalletLocked
    );
    assert_eq!(wallet.list_accounts().unwrap_err(), WalletError::WalletLocked);
    assert_eq!(
        wallet.derive_next_external_address("acct0").unwrap_err(),
        WalletError::WalletLocked
    );
    assert_eq!(
        wallet.list_derived_addresses("acct0", true).unwrap_err(),
        WalletError::WalletLocked
    );
    assert_eq!(
        wallet.master_blinding_key().unwrap_err(),
        WalletError::WalletLocked
    );
    assert_eq!(
        wallet.delete_account("acct0").unwrap_err(),
        WalletError::WalletLocked
    );

    wallet.unlock(&password("p1"))?;
    assert_eq!(
        wallet.derive_next_external_address("missing").unwrap_err(),
        WalletError::AccountNotFound("missing".to_string())
    );
    assert_eq!(
        wallet.delete_account("missing").unwrap_err(),
        WalletError::AccountNotFound("missing".to_string())
    );
    // the failed delete while locked left the account in place
    assert_eq!(wallet.get_account("acct0")?.key.index, 0);
    Ok(())
}

#[test]
fn deleted_account_index_is_not_reused() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;
    wallet.create_account("acct0", 0)?;
    wallet.delete_account("acct0")?;

    assert_eq!(
        wallet.get_account("acct0").unwrap_err(),
        WalletError::AccountNotFound("acct0".to_string())
    );
    let account = wallet
        .create_account("acct0", 0)?
        .created()
        .expect("recreated");
    assert_eq!(account.key.index, 1);
    Ok(())
}

#[test]
fn account_limit_is_enforced() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;
    let mut data = wallet.snapshot();
    data.next_account_index = HARDENED_KEY_START;

    let wallet = Wallet::restore(test_context(), data);
    wallet.unlock(&password("p1"))?;
    assert_eq!(
        wallet.create_account("acct0", 0).unwrap_err(),
        WalletError::MaxAccountsReached
    );
    Ok(())
}

#[test]
fn change_password_flow() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;

    assert_eq!(
        wallet
            .change_password(&password("p1"), &password("p2"))
            .unwrap_err(),
        WalletError::WalletUnlocked
    );

    wallet.lock();
    assert_eq!(
        wallet
            .change_password(&password("wrong"), &password("p2"))
            .unwrap_err(),
        WalletError::InvalidPassword
    );
    assert_eq!(
        wallet
            .change_password(&password("p1"), &password(""))
            .unwrap_err(),
        WalletError::MissingPassword
    );

    wallet.change_password(&password("p1"), &password("p2"))?;
    assert!(wallet.is_locked());

    assert_eq!(
        wallet.unlock(&password("p1")).unwrap_err(),
        WalletError::InvalidPassword
    );
    wallet.unlock(&password("p2"))?;
    assert_eq!(*wallet.mnemonic()?, words());
    Ok(())
}

#[test]
fn tampered_ciphertext_fails_unlock() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;
    let mut data = wallet.snapshot();
    if let Some(last) = data.encrypted_mnemonic.last_mut() {
        *last ^= 0x01;
    }

    let wallet = Wallet::restore(test_context(), data);
    let err = wallet.unlock(&password("p1")).unwrap_err();
    assert!(matches!(err, WalletError::CryptoError(_)));
    assert!(wallet.is_locked());
    Ok(())
}

#[test]
fn blinding_key_is_recoverable_from_script() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;
    wallet.create_account("acct0", 0)?;
    let info = wallet.derive_next_external_address("acct0")?;

    let hd = HdWallet::new(MNEMONIC, ROOT_PATH, NetworkName::Liquid)?;
    let script_bytes = hex::decode(&info.script).expect("hex script");
    let script = elements::Script::from(script_bytes);
    let (secret, _) = hd.blinding_key_pair(&script)?;
    assert_eq!(secret.secret_bytes().to_vec(), info.blinding_key);
    assert_eq!(hd.master_blinding_key(), wallet.master_blinding_key()?);
    Ok(())
}

#[test]
fn script_lookup_works_while_locked() -> WalletResult<()> {
    let wallet = create_wallet("liquid", "p1")?;
    wallet.create_account("acct0", 0)?;
    let external = wallet.derive_next_external_address("acct0")?;
    let internal = wallet.derive_next_internal_address("acct0")?;
    wallet.lock();

    let known = wallet.known_scripts();
    assert_eq!(known.len(), 2);

    let owner = wallet
        .script_owner(&external.script)
        .expect("external script is known");
    assert_eq!(owner.derivation_path, "0'/0/0");
    let owner = wallet
        .script_owner(&internal.script)
        .expect("internal script is known");
    assert_eq!(owner.derivation_path, "0'/1/0");
    assert_eq!(owner.account_key.name, "acct0");
    Ok(())
}

#[test]
fn concurrent_derivations_hand_out_distinct_paths() -> WalletResult<()> {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 5;

    let wallet = Arc::new(create_wallet("liquid", "p1")?);
    wallet.create_account("shared", 0)?;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let wallet = Arc::clone(&wallet);
            thread::spawn(move || -> WalletResult<Vec<String>> {
                (0..PER_THREAD)
                    .map(|_| {
                        wallet
                            .derive_next_external_address("shared")
                            .map(|info| info.derivation_path)
                    })
                    .collect()
            })
        })
        .collect();

    let mut paths = HashSet::new();
    for handle in handles {
        let derived = handle.join().expect("derivation thread panicked")?;
        paths.extend(derived);
    }

    let total = THREADS * PER_THREAD;
    assert_eq!(paths.len(), total);
    let account = wallet.get_account("shared")?;
    assert_eq!(account.next_external_index as usize, total);
    assert_eq!(account.derivation_path_by_script.len(), total);
    Ok(())
}
