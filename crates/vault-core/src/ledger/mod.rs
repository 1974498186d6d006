//! Custody and nonce ledger.
//!
//! The ledger owns the two pieces of state a redemption mutates: the
//! per-account withdrawal nonce and the token balances, including the
//! vault's custody balance. A redemption is one unit of work. It either
//! bumps the nonce and moves the funds, or it changes nothing.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod storage;

pub use storage::StorageLedger;

/// Errors that can occur while reading or mutating the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
	/// The account's nonce moved since the redemption was validated.
	#[error("Stale nonce for {account}: expected {expected}, current {current}")]
	StaleNonce {
		account: Address,
		expected: U256,
		current: U256,
	},
	/// Custody cannot cover the requested amount.
	#[error("Insufficient custody: available {available}, requested {requested}")]
	InsufficientCustody { available: U256, requested: U256 },
	/// A nonce or balance would exceed 2^256 - 1.
	#[error("Arithmetic overflow updating {0}")]
	Overflow(Address),
	/// The persistence layer failed.
	#[error("Ledger backend error: {0}")]
	Backend(String),
}

/// A validated redemption waiting to be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redemption {
	pub recipient: Address,
	pub amount: U256,
	/// Nonce the signature was checked against. The commit fails if the
	/// stored nonce differs.
	pub expected_nonce: U256,
}

/// Complete ledger state, persisted as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
	/// Withdrawal nonce per account. Absent means zero.
	#[serde(default)]
	pub nonces: BTreeMap<Address, U256>,
	/// Token balance per address, custody included. Absent means zero.
	#[serde(default)]
	pub balances: BTreeMap<Address, U256>,
}

impl LedgerSnapshot {
	pub fn nonce_of(&self, account: &Address) -> U256 {
		self.nonces.get(account).copied().unwrap_or_default()
	}

	pub fn balance_of(&self, account: &Address) -> U256 {
		self.balances.get(account).copied().unwrap_or_default()
	}

	/// Credits `amount` to `account`.
	pub fn credit(&mut self, account: Address, amount: U256) -> Result<U256, LedgerError> {
		let balance = self
			.balance_of(&account)
			.checked_add(amount)
			.ok_or(LedgerError::Overflow(account))?;
		self.balances.insert(account, balance);
		Ok(balance)
	}

	/// Applies a redemption against `custody`, returning the recipient's new nonce.
	///
	/// Every check runs before the first write, so an `Err` leaves the
	/// snapshot exactly as it was.
	pub fn apply_redemption(
		&mut self,
		custody: Address,
		redemption: &Redemption,
	) -> Result<U256, LedgerError> {
		let recipient = redemption.recipient;
		let current = self.nonce_of(&recipient);
		if current != redemption.expected_nonce {
			return Err(LedgerError::StaleNonce {
				account: recipient,
				expected: redemption.expected_nonce,
				current,
			});
		}
		let next_nonce = current
			.checked_add(U256::from(1))
			.ok_or(LedgerError::Overflow(recipient))?;

		let available = self.balance_of(&custody);
		let remaining = available.checked_sub(redemption.amount).ok_or(
			LedgerError::InsufficientCustody {
				available,
				requested: redemption.amount,
			},
		)?;

		// Custody paying itself is a no-op transfer.
		if recipient != custody {
			let credited = self
				.balance_of(&recipient)
				.checked_add(redemption.amount)
				.ok_or(LedgerError::Overflow(recipient))?;
			self.balances.insert(custody, remaining);
			self.balances.insert(recipient, credited);
		}
		self.nonces.insert(recipient, next_nonce);

		Ok(next_nonce)
	}
}

/// Ledger backing a vault deployment.
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Address holding the vault's funds.
	fn custody(&self) -> Address;

	/// Current withdrawal nonce of `account`; zero if it never withdrew.
	async fn nonce_of(&self, account: Address) -> Result<U256, LedgerError>;

	/// Token balance of `account`.
	async fn balance_of(&self, account: Address) -> Result<U256, LedgerError>;

	/// Balance of the custody address.
	async fn custody_balance(&self) -> Result<U256, LedgerError> {
		self.balance_of(self.custody()).await
	}

	/// Adds `amount` to custody, returning the new custody balance.
	async fn deposit(&self, amount: U256) -> Result<U256, LedgerError>;

	/// Atomically consumes `expected_nonce` and moves `amount` from custody
	/// to the recipient. Returns the recipient's new nonce.
	async fn redeem(&self, redemption: &Redemption) -> Result<U256, LedgerError>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	const CUSTODY: Address = address!("cccccccccccccccccccccccccccccccccccccccc");
	const ALICE: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

	fn funded(amount: u64) -> LedgerSnapshot {
		let mut snapshot = LedgerSnapshot::default();
		snapshot.credit(CUSTODY, U256::from(amount)).unwrap();
		snapshot
	}

	fn redemption(amount: u64, nonce: u64) -> Redemption {
		Redemption {
			recipient: ALICE,
			amount: U256::from(amount),
			expected_nonce: U256::from(nonce),
		}
	}

	#[test]
	fn test_redemption_moves_funds_and_bumps_nonce() {
		let mut snapshot = funded(5000);
		let nonce = snapshot
			.apply_redemption(CUSTODY, &redemption(1000, 0))
			.unwrap();

		assert_eq!(nonce, U256::from(1));
		assert_eq!(snapshot.nonce_of(&ALICE), U256::from(1));
		assert_eq!(snapshot.balance_of(&ALICE), U256::from(1000));
		assert_eq!(snapshot.balance_of(&CUSTODY), U256::from(4000));
	}

	#[test]
	fn test_insufficient_custody_changes_nothing() {
		let mut snapshot = funded(500);
		let before = snapshot.clone();

		let err = snapshot
			.apply_redemption(CUSTODY, &redemption(1000, 0))
			.unwrap_err();
		assert_eq!(
			err,
			LedgerError::InsufficientCustody {
				available: U256::from(500),
				requested: U256::from(1000),
			}
		);
		assert_eq!(snapshot, before);
	}

	#[test]
	fn test_stale_nonce_changes_nothing() {
		let mut snapshot = funded(5000);
		snapshot
			.apply_redemption(CUSTODY, &redemption(1000, 0))
			.unwrap();
		let before = snapshot.clone();

		let err = snapshot
			.apply_redemption(CUSTODY, &redemption(1000, 0))
			.unwrap_err();
		assert!(matches!(err, LedgerError::StaleNonce { current, .. } if current == U256::from(1)));
		assert_eq!(snapshot, before);
	}

	#[test]
	fn test_nonce_overflow_rejected() {
		let mut snapshot = funded(5000);
		snapshot.nonces.insert(ALICE, U256::MAX);
		let before = snapshot.clone();

		let err = snapshot
			.apply_redemption(
				CUSTODY,
				&Redemption {
					recipient: ALICE,
					amount: U256::from(1),
					expected_nonce: U256::MAX,
				},
			)
			.unwrap_err();
		assert_eq!(err, LedgerError::Overflow(ALICE));
		assert_eq!(snapshot, before);
	}

	#[test]
	fn test_custody_redeeming_to_itself() {
		let mut snapshot = funded(5000);
		let r = Redemption {
			recipient: CUSTODY,
			amount: U256::from(1000),
			expected_nonce: U256::ZERO,
		};
		snapshot.apply_redemption(CUSTODY, &r).unwrap();

		assert_eq!(snapshot.balance_of(&CUSTODY), U256::from(5000));
		assert_eq!(snapshot.nonce_of(&CUSTODY), U256::from(1));
	}

	#[test]
	fn test_snapshot_serde() {
		let mut snapshot = funded(42);
		snapshot.nonces.insert(ALICE, U256::from(3));

		let json = serde_json::to_string(&snapshot).unwrap();
		let parsed: LedgerSnapshot = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed, snapshot);

		let empty: LedgerSnapshot = serde_json::from_str("{}").unwrap();
		assert_eq!(empty, LedgerSnapshot::default());
	}
}
