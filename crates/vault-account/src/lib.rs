//! Account management for the gasless vault.
//!
//! Defines the signer abstraction used wherever the vault acts as a wallet:
//! signing withdrawal authorizations in tests and tooling, or holding the
//! relayer key. Production owners sign with their own wallets; this crate
//! reproduces exactly what such a wallet does with a [`SigningRequest`].

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::{sol, SolStruct};
use async_trait::async_trait;
use std::borrow::Cow;
use thiserror::Error;
use vault_types::{
	ConfigSchema, ImplementationRegistry, SigningRequest, U256, WITHDRAW_FIELDS,
	WITHDRAW_PRIMARY_TYPE,
};

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

sol! {
	/// Wallet-side view of the withdrawal struct.
	struct Withdraw {
		address recipient;
		uint256 amount;
		uint256 nonce;
		uint256 deadline;
	}
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The typed data does not describe a vault withdrawal.
	#[error("Unsupported typed data: {0}")]
	UnsupportedTypedData(String),
	/// The digest attached to a signing request differs from the one the
	/// signer computed from the typed data itself.
	#[error("Digest mismatch: request carries {claimed}, typed data hashes to {computed}")]
	DigestMismatch { claimed: B256, computed: B256 },
}

/// Interface every signer implementation provides.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the configuration schema for this account implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address controlled by this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a 32-byte prehash, returning `r || s || v` with `v ∈ {27, 28}`.
	async fn sign_hash(&self, hash: &B256) -> Result<Bytes, AccountError>;
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry trait for account implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered account implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Computes the EIP-712 digest of a signing request from its typed data,
/// the way a wallet does, ignoring the request's own `digest` field.
pub fn typed_data_digest(request: &SigningRequest) -> Result<B256, AccountError> {
	if request.primary_type != WITHDRAW_PRIMARY_TYPE {
		return Err(AccountError::UnsupportedTypedData(format!(
			"primary type '{}'",
			request.primary_type
		)));
	}

	let fields = request.types.get(WITHDRAW_PRIMARY_TYPE).ok_or_else(|| {
		AccountError::UnsupportedTypedData("missing Withdraw type definition".into())
	})?;
	let matches_schema = fields.len() == WITHDRAW_FIELDS.len()
		&& fields
			.iter()
			.zip(WITHDRAW_FIELDS.iter())
			.all(|(field, (name, kind))| field.name == *name && field.kind == *kind);
	if !matches_schema {
		return Err(AccountError::UnsupportedTypedData(
			"Withdraw type definition does not match the vault schema".into(),
		));
	}

	let domain = alloy_sol_types::Eip712Domain::new(
		Some(Cow::Owned(request.domain.name.clone())),
		Some(Cow::Owned(request.domain.version.clone())),
		Some(U256::from(request.domain.chain_id)),
		Some(request.domain.verifying_contract),
		None,
	);
	let message = Withdraw {
		recipient: request.message.recipient,
		amount: request.message.amount,
		nonce: request.message.nonce,
		deadline: request.message.deadline,
	};

	Ok(message.eip712_signing_hash(&domain))
}

/// Service that manages account operations.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the address associated with the managed account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a withdrawal signing request.
	///
	/// The digest is recomputed from the typed data and must equal the one
	/// the issuer attached; a mismatch means the two sides disagree on the
	/// encoding and any signature would be unusable.
	pub async fn sign_withdrawal(&self, request: &SigningRequest) -> Result<Bytes, AccountError> {
		let computed = typed_data_digest(request)?;
		if computed != request.digest {
			tracing::warn!(
				claimed = %request.digest,
				computed = %computed,
				"Refusing to sign withdrawal with mismatched digest"
			);
			return Err(AccountError::DigestMismatch {
				claimed: request.digest,
				computed,
			});
		}
		self.implementation.sign_hash(&computed).await
	}
}
