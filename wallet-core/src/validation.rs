use crate::errors::{WalletError, WalletResult};
use regex::Regex;

const MAX_ACCOUNT_NAME_LEN: usize = 128;

/// Input validation utilities for the wallet
#[derive(Debug, Clone)]
pub struct InputValidator {
    // Compiled regex patterns for performance
    root_path_pattern: Regex,
    control_pattern: Regex,
}

impl InputValidator {
    pub fn new() -> WalletResult<Self> {
        let root_path_pattern = Regex::new(r"^m(/[0-9]+['hH]?)*$")
            .map_err(|e| WalletError::ValidationError(format!("Invalid path regex: {}", e)))?;

        let control_pattern = Regex::new(r"\p{Cc}").map_err(|e| {
            WalletError::ValidationError(format!("Invalid control char regex: {}", e))
        })?;

        Ok(InputValidator {
            root_path_pattern,
            control_pattern,
        })
    }

    /// Validate the shape of an absolute BIP32 path such as `m/84'/1776'`.
    pub fn validate_root_path(&self, path: &str) -> WalletResult<()> {
        if path.is_empty() {
            return Err(WalletError::ValidationError(
                "Root path cannot be empty".to_string(),
            ));
        }

        if !self.root_path_pattern.is_match(path) {
            return Err(WalletError::ValidationError(format!(
                "Root path '{}' is not a valid derivation path",
                path
            )));
        }

        Ok(())
    }

    /// Validate a human readable account name
    pub fn validate_account_name(&self, name: &str) -> WalletResult<()> {
        if name.trim().is_empty() {
            return Err(WalletError::ValidationError(
                "Account name cannot be empty".to_string(),
            ));
        }

        if name.chars().count() > MAX_ACCOUNT_NAME_LEN {
            return Err(WalletError::ValidationError(format!(
                "Account name longer than {} characters",
                MAX_ACCOUNT_NAME_LEN
            )));
        }

        if self.control_pattern.is_match(name) {
            return Err(WalletError::ValidationError(
                "Account name contains control characters".to_string(),
            ));
        }

        Ok(())
    }
}
