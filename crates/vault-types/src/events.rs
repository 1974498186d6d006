//! Event types published by the vault.
//!
//! Events flow through the vault's event bus so that the relayer, audit
//! sinks and tests can observe issuance and redemption without polling.

use crate::utils::u256_serde;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all vault events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
	/// A signing request was handed out for `recipient` at `nonce`.
	AuthorizationIssued {
		recipient: Address,
		#[serde(with = "u256_serde")]
		amount: U256,
		#[serde(with = "u256_serde")]
		nonce: U256,
		#[serde(with = "u256_serde")]
		deadline: U256,
	},
	/// Audit record of a successful redemption.
	Withdrawn {
		recipient: Address,
		#[serde(with = "u256_serde")]
		amount: U256,
		#[serde(with = "u256_serde")]
		nonce: U256,
	},
	/// Custody was topped up.
	Deposited {
		from: Address,
		#[serde(with = "u256_serde")]
		amount: U256,
	},
}
