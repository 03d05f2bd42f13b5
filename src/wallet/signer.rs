//! Secure wallet implementation
//!
//! SECURITY: This is the ONLY place where private keys exist.
//! - Keys are held in alloy's PrivateKeySigner which handles crypto securely
//! - Keys are never serialized to JSON
//! - Keys are never logged

use crate::config::{expand_home, KeySource};
use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;

/// Secure wallet that protects the signing key
///
/// The private key is:
/// - Stored in alloy's PrivateKeySigner (handles crypto securely)
/// - Never serialized (no Serialize impl)
/// - Only accessible via signing operations on the provider
pub struct SecureWallet {
    /// Public address (safe to expose)
    address: Address,
    /// Ethereum wallet for alloy providers
    wallet: EthereumWallet,
}

impl SecureWallet {
    /// Load the key from the configured source
    pub fn load(source: &KeySource) -> Result<Self> {
        match source {
            KeySource::Env { var } => Self::from_env(var),
            KeySource::File { path } => Self::from_key_file(path),
        }
    }

    /// Create a wallet from an environment variable holding a hex key
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key_hex = std::env::var(var_name).map_err(|_| {
            Error::Wallet(format!(
                "environment variable {} not set, required for signing",
                var_name
            ))
        })?;
        Self::from_hex(&key_hex)
    }

    /// Create a wallet from a key file (one hex key, optional 0x prefix)
    pub fn from_key_file(path: &str) -> Result<Self> {
        let path = expand_home(path);
        let key_hex = std::fs::read_to_string(&path)
            .map_err(|e| Error::Wallet(format!("failed to read key file {}: {}", path.display(), e)))?;
        Self::from_hex(key_hex.trim())
    }

    /// Create a wallet from a hex-encoded private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("invalid private key: {}", e)))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        Ok(Self { address, wallet })
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Build a signing provider for the given RPC endpoint.
    ///
    /// All transaction submission goes through this provider; the key never
    /// leaves the wallet layer.
    pub fn provider(&self, rpc_url: &str) -> Result<DynProvider> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid RPC URL {}: {}", rpc_url, e)))?;

        Ok(ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .connect_http(url)
            .erased())
    }
}

// Implement Debug manually to avoid exposing key material
impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Test private key (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_wallet_from_hex() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        assert_eq!(format!("{}", wallet.address()).to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_wallet_from_hex_without_prefix() {
        let wallet = SecureWallet::from_hex(TEST_KEY.strip_prefix("0x").unwrap()).unwrap();
        assert_eq!(format!("{}", wallet.address()).to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_wallet_from_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", TEST_KEY).unwrap();

        let wallet = SecureWallet::from_key_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(format!("{}", wallet.address()).to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_missing_env_var_is_an_error() {
        let result = SecureWallet::from_env("COMPOUNDER_TEST_KEY_THAT_IS_NOT_SET");
        assert!(matches!(result, Err(Error::Wallet(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", wallet);

        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
