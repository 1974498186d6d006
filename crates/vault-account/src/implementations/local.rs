//! Local private-key account.
//!
//! Holds a secp256k1 key in memory and signs prehashed digests the way an
//! Ethereum wallet does for `eth_signTypedData_v4`: a recoverable ECDSA
//! signature with low `s` and `v = 27 + recovery_id`.

use crate::{AccountError, AccountFactory, AccountInterface, AccountRegistry};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use vault_types::{
	without_0x_prefix, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema,
	SecretString, ValidationError,
};

/// Account backed by a private key held in process memory.
pub struct LocalAccount {
	signing_key: SigningKey,
	address: Address,
}

impl LocalAccount {
	/// Builds an account from raw 32-byte key material.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, AccountError> {
		let signing_key =
			SigningKey::from_slice(bytes).map_err(|e| AccountError::InvalidKey(e.to_string()))?;
		let address = Address::from_public_key(signing_key.verifying_key());
		Ok(Self {
			signing_key,
			address,
		})
	}

	/// Builds an account from a hex private key, with or without `0x`.
	pub fn from_hex(private_key: &str) -> Result<Self, AccountError> {
		let bytes = hex::decode(without_0x_prefix(private_key.trim()))
			.map_err(|e| AccountError::InvalidKey(format!("Invalid hex: {}", e)))?;
		if bytes.len() != 32 {
			return Err(AccountError::InvalidKey(format!(
				"Expected 32-byte key, got {} bytes",
				bytes.len()
			)));
		}
		Self::from_bytes(&bytes)
	}

	/// Address controlled by this key.
	pub fn address(&self) -> Address {
		self.address
	}

	/// Signs `hash` synchronously.
	pub fn sign_hash_sync(&self, hash: &B256) -> Result<Bytes, AccountError> {
		let (signature, recovery_id) = self
			.signing_key
			.sign_prehash_recoverable(hash.as_slice())
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;

		let mut out = Vec::with_capacity(65);
		out.extend_from_slice(&signature.to_bytes());
		out.push(27 + recovery_id.to_byte());
		Ok(Bytes::from(out))
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalAccountSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.address)
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Bytes, AccountError> {
		self.sign_hash_sync(hash)
	}
}

/// Configuration schema for LocalAccount.
pub struct LocalAccountSchema;

impl ConfigSchema for LocalAccountSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|value| {
				let key = value.as_str().unwrap_or_default();
				let hex_part = without_0x_prefix(key);
				if hex_part.len() != 64 {
					return Err("Private key must be 64 hex characters (32 bytes)".to_string());
				}
				if hex::decode(hex_part).is_err() {
					return Err("Private key must be valid hexadecimal".to_string());
				}
				Ok(())
			})],
			vec![],
		);
		schema.validate(config)
	}
}

/// Factory function to create a local account from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 key (usually `${ENV_VAR}`)
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalAccountSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".into()))?;

	let account = private_key.with_exposed(LocalAccount::from_hex)?;
	Ok(Box::new(account))
}

/// Registry for the local account implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl AccountRegistry for Registry {}
