//! EIP-712 domain descriptor for the vault.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Signing context a withdrawal authorization is bound to.
///
/// Every field takes part in the domain separator, so two descriptors that
/// differ anywhere yield signatures that are not interchangeable. The
/// descriptor is built once from configuration and never changes for the
/// lifetime of a vault deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
	/// Human-readable protocol name.
	pub name: String,
	/// Protocol version string.
	pub version: String,
	/// Chain the vault is deployed on.
	pub chain_id: u64,
	/// Address of the vault contract instance.
	pub verifying_contract: Address,
}

impl Eip712Domain {
	pub fn new(
		name: impl Into<String>,
		version: impl Into<String>,
		chain_id: u64,
		verifying_contract: Address,
	) -> Self {
		Self {
			name: name.into(),
			version: version.into(),
			chain_id,
			verifying_contract,
		}
	}
}
