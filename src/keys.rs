// src/keys.rs
//! Derivation of per-chain signing keys from the single BIP-39 secret.

use alloy::primitives::Address;
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};

use crate::error::KeyError;

pub const ETH_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";
pub const TRON_DERIVATION_PATH: &str = "m/44'/195'/0'/0/0";

/// Version byte of Tron mainnet addresses
const TRON_ADDRESS_PREFIX: u8 = 0x41;

pub fn derive_signer(phrase: &str, path: &str) -> Result<PrivateKeySigner, KeyError> {
    let signer = MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .derivation_path(path)?
        .build()?;
    Ok(signer)
}

pub fn ethereum_signer(phrase: &str) -> Result<PrivateKeySigner, KeyError> {
    derive_signer(phrase, ETH_DERIVATION_PATH)
}

pub fn tron_signer(phrase: &str) -> Result<PrivateKeySigner, KeyError> {
    derive_signer(phrase, TRON_DERIVATION_PATH)
}

/// base58check(0x41 || keccak address)
pub fn tron_address(address: &Address) -> String {
    let mut raw = Vec::with_capacity(21);
    raw.push(TRON_ADDRESS_PREFIX);
    raw.extend_from_slice(address.as_slice());
    bs58::encode(raw).with_check().into_string()
}

/// Validate a base58check Tron address and return its 20-byte body.
pub fn parse_tron_address(s: &str) -> Result<Address, KeyError> {
    let raw = bs58::decode(s.trim())
        .with_check(None)
        .into_vec()
        .map_err(|_| KeyError::InvalidAddress(s.to_string()))?;

    if raw.len() != 21 || raw[0] != TRON_ADDRESS_PREFIX {
        return Err(KeyError::InvalidAddress(s.to_string()));
    }
    Ok(Address::from_slice(&raw[1..]))
}
