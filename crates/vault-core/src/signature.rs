//! Signer recovery from a digest and a 65-byte ECDSA signature.

use alloy_primitives::{Address, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Errors that can occur while recovering a signer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
	/// The bytes are not a structurally valid recoverable signature.
	#[error("Malformed signature: {0}")]
	Malformed(String),
	/// Recovery succeeded but produced the zero address.
	#[error("Signature recovers to the zero address")]
	ZeroAddress,
}

/// A structurally valid signature, ready for recovery.
#[derive(Debug, Clone)]
pub struct ParsedSignature {
	signature: Signature,
	recovery_id: RecoveryId,
}

/// Checks the shape of `r || s || v` without touching any digest.
///
/// Accepts `v` as `0`/`1` or `27`/`28`. Signatures with a high `s` value are
/// rejected as malformed (EIP-2), so each authorization has exactly one
/// valid encoding.
pub fn parse(signature: &[u8]) -> Result<ParsedSignature, RecoveryError> {
	if signature.len() != SIGNATURE_LENGTH {
		return Err(RecoveryError::Malformed(format!(
			"expected {} bytes, got {}",
			SIGNATURE_LENGTH,
			signature.len()
		)));
	}

	let v = signature[64];
	let parity = match v {
		0 | 1 => v,
		27 | 28 => v - 27,
		_ => {
			return Err(RecoveryError::Malformed(format!(
				"invalid recovery parameter v={}",
				v
			)))
		},
	};
	let recovery_id = RecoveryId::from_byte(parity)
		.ok_or_else(|| RecoveryError::Malformed(format!("invalid recovery id {}", parity)))?;

	let signature = Signature::from_slice(&signature[..64])
		.map_err(|_| RecoveryError::Malformed("r or s is zero or out of range".into()))?;
	if signature.normalize_s().is_some() {
		return Err(RecoveryError::Malformed("s is in the upper half order".into()));
	}

	Ok(ParsedSignature {
		signature,
		recovery_id,
	})
}

impl ParsedSignature {
	/// Recovers the address that signed `digest`.
	pub fn recover(&self, digest: &B256) -> Result<Address, RecoveryError> {
		let key =
			VerifyingKey::recover_from_prehash(digest.as_slice(), &self.signature, self.recovery_id)
				.map_err(|_| RecoveryError::Malformed("no curve point recoverable".into()))?;

		let address = Address::from_public_key(&key);
		if address == Address::ZERO {
			return Err(RecoveryError::ZeroAddress);
		}
		Ok(address)
	}
}

/// Recovers the address that signed `digest`.
pub fn recover(digest: &B256, signature: &[u8]) -> Result<Address, RecoveryError> {
	parse(signature)?.recover(digest)
}
