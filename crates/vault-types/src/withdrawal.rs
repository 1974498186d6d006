//! Withdrawal authorization types.
//!
//! Three shapes cross process boundaries:
//! - [`WithdrawalMessage`]: the signed payload, derived and hashed, never stored
//! - [`SigningRequest`]: what the issuer hands to a wallet for signing
//! - [`WithdrawalRequest`]: what the relayer hands to the verifier for redemption
//!
//! Field order in [`WithdrawalMessage`] mirrors [`WITHDRAW_FIELDS`] and must not
//! change: it is part of every digest ever signed.

use crate::{utils::u256_serde, Eip712Domain};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// EIP-712 primary type name of the withdrawal struct.
pub const WITHDRAW_PRIMARY_TYPE: &str = "Withdraw";

/// `(name, solidity type)` of each withdrawal field, in encoding order.
pub const WITHDRAW_FIELDS: [(&str, &str); 4] = [
	("recipient", "address"),
	("amount", "uint256"),
	("nonce", "uint256"),
	("deadline", "uint256"),
];

/// `(name, solidity type)` of each domain field, in encoding order.
pub const DOMAIN_FIELDS: [(&str, &str); 4] = [
	("name", "string"),
	("version", "string"),
	("chainId", "uint256"),
	("verifyingContract", "address"),
];

/// The payload a recipient signs to authorize one withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalMessage {
	/// Account that receives the funds and must be the signer.
	pub recipient: Address,
	/// Amount in token base units.
	#[serde(with = "u256_serde")]
	pub amount: U256,
	/// The recipient's nonce at the time of signing.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	/// Unix timestamp (seconds) after which the authorization is void.
	#[serde(with = "u256_serde")]
	pub deadline: U256,
}

/// A single `{name, type}` entry of an EIP-712 type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: String,
}

impl TypedField {
	fn list(fields: &[(&str, &str)]) -> Vec<Self> {
		fields
			.iter()
			.map(|(name, kind)| Self {
				name: (*name).to_string(),
				kind: (*kind).to_string(),
			})
			.collect()
	}
}

/// Typed-data payload handed to a wallet (`eth_signTypedData_v4` shape).
///
/// `digest` is informational: it is the hash a correct signer produces for
/// this payload, so clients can cross-check their own hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningRequest {
	pub domain: Eip712Domain,
	pub types: BTreeMap<String, Vec<TypedField>>,
	pub primary_type: String,
	pub message: WithdrawalMessage,
	pub digest: B256,
}

impl SigningRequest {
	/// Assembles a signing request for `message` under `domain`.
	pub fn new(domain: Eip712Domain, message: WithdrawalMessage, digest: B256) -> Self {
		let mut types = BTreeMap::new();
		types.insert("EIP712Domain".to_string(), TypedField::list(&DOMAIN_FIELDS));
		types.insert(
			WITHDRAW_PRIMARY_TYPE.to_string(),
			TypedField::list(&WITHDRAW_FIELDS),
		);
		Self {
			domain,
			types,
			primary_type: WITHDRAW_PRIMARY_TYPE.to_string(),
			message,
			digest,
		}
	}
}

/// Redemption request submitted to the verifier.
///
/// Carries no nonce; the verifier always re-derives it from its own state.
/// Unknown fields (including a stray `nonce`) are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WithdrawalRequest {
	pub recipient: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	#[serde(with = "u256_serde")]
	pub deadline: U256,
	/// 65-byte `r || s || v` signature.
	pub signature: Bytes,
}

/// Result of a successful redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalReceipt {
	pub recipient: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	/// Nonce the authorization consumed.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	/// Digest that was verified.
	pub digest: B256,
}
