//! Wallet module
//!
//! Private keys are confined to this module: they load into alloy's signer,
//! are never serialized, and never appear in logs.

mod signer;

pub use signer::SecureWallet;
