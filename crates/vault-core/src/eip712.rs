//! EIP-712 domain separation and withdrawal hashing.
//!
//! The digest produced here is the exact value a wallet signs for a
//! [`SigningRequest`](vault_types::SigningRequest) and the exact value the
//! verifier recovers against. Field order and field widths come from
//! [`WITHDRAW_TYPE`]; nothing else may influence the encoding.

use alloy_primitives::{keccak256, B256};
use std::sync::LazyLock;
use vault_types::{
	utils::{compute_final_digest, Eip712AbiEncoder, DOMAIN_TYPE, WITHDRAW_TYPE},
	Eip712Domain, WithdrawalMessage,
};

static DOMAIN_TYPE_HASH: LazyLock<B256> = LazyLock::new(|| keccak256(DOMAIN_TYPE.as_bytes()));
static WITHDRAW_TYPE_HASH: LazyLock<B256> =
	LazyLock::new(|| keccak256(WITHDRAW_TYPE.as_bytes()));

/// A struct that can be hashed per EIP-712 `hashStruct`.
pub trait Eip712Struct {
	/// keccak256 of the struct's canonical type string.
	fn type_hash() -> B256;

	/// keccak256(typeHash || encodeData(self)).
	fn struct_hash(&self) -> B256;
}

impl Eip712Struct for WithdrawalMessage {
	fn type_hash() -> B256 {
		*WITHDRAW_TYPE_HASH
	}

	fn struct_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&Self::type_hash());
		enc.push_address(&self.recipient);
		enc.push_u256(self.amount);
		enc.push_u256(self.nonce);
		enc.push_u256(self.deadline);
		enc.hash()
	}
}

impl Eip712Struct for Eip712Domain {
	fn type_hash() -> B256 {
		*DOMAIN_TYPE_HASH
	}

	fn struct_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&Self::type_hash());
		enc.push_string(&self.name);
		enc.push_string(&self.version);
		enc.push_u64(self.chain_id);
		enc.push_address(&self.verifying_contract);
		enc.hash()
	}
}

/// Final digest for `message` under the domain whose separator is `domain_hash`.
pub fn digest(domain_hash: &B256, message: &WithdrawalMessage) -> B256 {
	compute_final_digest(domain_hash, &message.struct_hash())
}

/// Domain descriptor together with its separator, hashed once.
#[derive(Debug, Clone)]
pub struct DomainSeparator {
	domain: Eip712Domain,
	hash: B256,
}

impl DomainSeparator {
	pub fn new(domain: Eip712Domain) -> Self {
		let hash = domain.struct_hash();
		Self { domain, hash }
	}

	/// The domain separator. Constant for the life of the deployment.
	pub fn domain_hash(&self) -> B256 {
		self.hash
	}

	pub fn domain(&self) -> &Eip712Domain {
		&self.domain
	}

	/// Digest of `message` under this domain.
	pub fn digest(&self, message: &WithdrawalMessage) -> B256 {
		digest(&self.hash, message)
	}
}
