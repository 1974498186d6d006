//! Generic EIP-712 utilities shared by the issuer and the verifier.
//!
//! These helpers provide:
//! - The canonical type strings of the vault's domain and withdrawal struct
//! - A minimal ABI encoder for the static field types used by those structs
//! - Final digest computation (0x1901 || domainHash || structHash)

use alloy_primitives::{keccak256, Address, B256, U256};

/// EIP-712 domain type string, fields in canonical order.
pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Withdrawal struct type string. Changing it invalidates every signature.
pub const WITHDRAW_TYPE: &str =
	"Withdraw(address recipient,uint256 amount,uint256 nonce,uint256 deadline)";

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Minimal ABI encoder for EIP-712 `encodeData`.
///
/// Every value occupies exactly one 32-byte word. Dynamic `string` values are
/// encoded as the keccak256 of their UTF-8 bytes.
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Default for Eip712AbiEncoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self {
			buf: Vec::with_capacity(32 * 5),
		}
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	/// Left-pads the 20 address bytes into a word.
	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u64(&mut self, v: u64) {
		self.push_u256(U256::from(v));
	}

	pub fn push_string(&mut self, s: &str) {
		self.push_b256(&keccak256(s.as_bytes()));
	}

	/// Hashes the encoded words.
	pub fn hash(self) -> B256 {
		keccak256(self.buf)
	}
}
