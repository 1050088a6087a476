//! Seed cipher and password digest.
//!
//! The encrypted mnemonic is a self-describing envelope:
//!
//! ```text
//! version (1) | m_cost_kib (4, LE) | t_cost (4, LE) | p_cost (4, LE) | salt (16) | nonce (12) | ciphertext + tag
//! ```
//!
//! The header is authenticated as AEAD associated data, so a changed KDF
//! parameter is detected just like a changed ciphertext byte.

use argon2::{Algorithm, Argon2, Params, Version};
use elements::bitcoin::hashes::{hash160, Hash};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{WalletError, WalletResult};

const CIPHER_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = 1 + 4 * 3 + SALT_LEN + NONCE_LEN;

// Upper bounds on costs read back from an envelope header, which is
// untrusted until the tag has been checked.
const MAX_M_COST_KIB: u32 = 1024 * 1024; // 1 GiB
const MAX_T_COST: u32 = 16;
const MAX_P_COST: u32 = 16;

/// Symmetric encryption of the seed phrase under a user password.
///
/// Implementations must fail closed: a wrong password or a modified
/// ciphertext yields an error, never garbage plaintext.
pub trait SeedCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], password: &SecretString) -> WalletResult<Vec<u8>>;

    fn decrypt(
        &self,
        ciphertext: &[u8],
        password: &SecretString,
    ) -> WalletResult<Zeroizing<Vec<u8>>>;
}

/// Argon2id cost parameters used when sealing a new envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParameters {
    pub m_cost_kib: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParameters {
    fn default() -> Self {
        Self {
            m_cost_kib: 64 * 1024, // 64 MiB
            t_cost: 3,
            p_cost: 1,
        }
    }
}

/// Argon2id key derivation followed by AES-256-GCM.
#[derive(Debug, Clone, Default)]
pub struct Argon2AesGcmCipher {
    params: KdfParameters,
}

impl Argon2AesGcmCipher {
    pub fn new(params: KdfParameters) -> WalletResult<Self> {
        argon_params(&params)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &KdfParameters {
        &self.params
    }
}

impl SeedCipher for Argon2AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8], password: &SecretString) -> WalletResult<Vec<u8>> {
        let mut rng = OsRng;
        let mut salt = [0u8; SALT_LEN];
        rng.fill_bytes(&mut salt);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce_bytes);

        let header = encode_header(&self.params, &salt, &nonce_bytes);
        let key = derive_key(password, &self.params, &salt)?;

        let mut in_out = Zeroizing::new(plaintext.to_vec());
        seal_aes_gcm(&key, nonce_bytes, &header, &mut in_out)?;

        let mut envelope = Vec::with_capacity(HEADER_LEN + in_out.len());
        envelope.extend_from_slice(&header);
        envelope.extend_from_slice(&in_out);
        Ok(envelope)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        password: &SecretString,
    ) -> WalletResult<Zeroizing<Vec<u8>>> {
        if ciphertext.len() < HEADER_LEN + aead::AES_256_GCM.tag_len() {
            return Err(WalletError::CryptoError(
                "Ciphertext shorter than header and authentication tag".to_string(),
            ));
        }

        let (header, sealed) = ciphertext.split_at(HEADER_LEN);
        let (params, salt, nonce_bytes) = decode_header(header)?;
        let key = derive_key(password, &params, &salt)?;
        open_aes_gcm(&key, nonce_bytes, header, sealed)
    }
}

/// One-way digest of a password, used only for equality checks.
pub fn hash_password(password: &SecretString) -> Vec<u8> {
    hash160::Hash::hash(password.expose_secret().as_bytes())
        .to_byte_array()
        .to_vec()
}

pub fn verify_password(expected_hash: &[u8], password: &SecretString) -> bool {
    hash_password(password).as_slice() == expected_hash
}

fn encode_header(
    params: &KdfParameters,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0] = CIPHER_VERSION;
    header[1..5].copy_from_slice(&params.m_cost_kib.to_le_bytes());
    header[5..9].copy_from_slice(&params.t_cost.to_le_bytes());
    header[9..13].copy_from_slice(&params.p_cost.to_le_bytes());
    header[13..13 + SALT_LEN].copy_from_slice(salt);
    header[13 + SALT_LEN..].copy_from_slice(nonce);
    header
}

fn decode_header(
    header: &[u8],
) -> WalletResult<(KdfParameters, [u8; SALT_LEN], [u8; NONCE_LEN])> {
    if header[0] != CIPHER_VERSION {
        return Err(WalletError::CryptoError(format!(
            "Unsupported cipher version: {}",
            header[0]
        )));
    }

    let read_u32 = |offset: usize| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&header[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    };
    let params = KdfParameters {
        m_cost_kib: read_u32(1),
        t_cost: read_u32(5),
        p_cost: read_u32(9),
    };

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&header[13..13 + SALT_LEN]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&header[13 + SALT_LEN..HEADER_LEN]);
    Ok((params, salt, nonce))
}

fn argon_params(params: &KdfParameters) -> WalletResult<Params> {
    if params.m_cost_kib > MAX_M_COST_KIB
        || params.t_cost > MAX_T_COST
        || params.p_cost > MAX_P_COST
    {
        return Err(WalletError::CryptoError(format!(
            "Argon2 costs exceed limits: m={} KiB, t={}, p={}",
            params.m_cost_kib, params.t_cost, params.p_cost
        )));
    }

    Params::new(
        params.m_cost_kib,
        params.t_cost,
        params.p_cost,
        Some(KEY_LEN),
    )
    .map_err(|e| WalletError::CryptoError(format!("Invalid Argon2 params: {e}")))
}

fn derive_key(
    password: &SecretString,
    params: &KdfParameters,
    salt: &[u8; SALT_LEN],
) -> WalletResult<Zeroizing<[u8; KEY_LEN]>> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params(params)?);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key[..])
        .map_err(|e| WalletError::CryptoError(format!("KDF failed: {e}")))?;
    Ok(key)
}

fn seal_aes_gcm(
    key: &Zeroizing<[u8; KEY_LEN]>,
    nonce: [u8; NONCE_LEN],
    header: &[u8],
    in_out: &mut Zeroizing<Vec<u8>>,
) -> WalletResult<()> {
    let unbound_key = UnboundKey::new(&aead::AES_256_GCM, &key[..])
        .map_err(|e| WalletError::CryptoError(format!("Invalid encryption key: {e}")))?;
    let key = LessSafeKey::new(unbound_key);

    let buffer: &mut Vec<u8> = in_out;
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce),
        Aad::from(header),
        buffer,
    )
    .map_err(|_| WalletError::CryptoError("Encryption failure".to_string()))
}

fn open_aes_gcm(
    key: &Zeroizing<[u8; KEY_LEN]>,
    nonce: [u8; NONCE_LEN],
    header: &[u8],
    sealed: &[u8],
) -> WalletResult<Zeroizing<Vec<u8>>> {
    let unbound_key = UnboundKey::new(&aead::AES_256_GCM, &key[..])
        .map_err(|e| WalletError::CryptoError(format!("Invalid encryption key: {e}")))?;
    let key = LessSafeKey::new(unbound_key);

    let mut in_out = Zeroizing::new(sealed.to_vec());
    let plaintext_len = key
        .open_in_place(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(header),
            in_out.as_mut_slice(),
        )
        .map_err(|_| WalletError::CryptoError("Decryption failure".to_string()))?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}
