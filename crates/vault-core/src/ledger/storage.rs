//! Ledger persisted through the storage service.
//!
//! The whole snapshot lives under one key, so a redemption is a single
//! read-modify-write. Writers are serialized by an in-process mutex; the
//! storage backends themselves replace values atomically.

use super::{LedgerError, LedgerInterface, LedgerSnapshot, Redemption};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use vault_storage::{StorageError, StorageService};
use vault_types::StorageKey;

impl From<StorageError> for LedgerError {
	fn from(err: StorageError) -> Self {
		LedgerError::Backend(err.to_string())
	}
}

/// Ledger stored as one JSON snapshot per vault.
pub struct StorageLedger {
	storage: Arc<StorageService>,
	/// Vault id, used as the snapshot key within the ledger namespace.
	id: String,
	custody: Address,
	write_lock: Mutex<()>,
}

impl StorageLedger {
	/// Opens the ledger for vault `id`.
	///
	/// When no snapshot exists yet, one is created with `initial_custody`
	/// credited to the custody address. An existing snapshot is left as is.
	pub async fn open(
		storage: Arc<StorageService>,
		id: impl Into<String>,
		custody: Address,
		initial_custody: U256,
	) -> Result<Self, LedgerError> {
		let ledger = Self {
			storage,
			id: id.into(),
			custody,
			write_lock: Mutex::new(()),
		};

		let existing: Option<LedgerSnapshot> = ledger
			.storage
			.retrieve_optional(StorageKey::Ledger.as_str(), &ledger.id)
			.await?;
		if existing.is_none() {
			let mut snapshot = LedgerSnapshot::default();
			snapshot.credit(custody, initial_custody)?;
			ledger.save(&snapshot).await?;
			tracing::info!(
				vault = %ledger.id,
				custody = %custody,
				balance = %initial_custody,
				"Initialized ledger"
			);
		}

		Ok(ledger)
	}

	async fn load(&self) -> Result<LedgerSnapshot, LedgerError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::Ledger.as_str(), &self.id)
			.await?
			.unwrap_or_default())
	}

	async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError> {
		self.storage
			.store(StorageKey::Ledger.as_str(), &self.id, snapshot)
			.await?;
		Ok(())
	}
}

#[async_trait]
impl LedgerInterface for StorageLedger {
	fn custody(&self) -> Address {
		self.custody
	}

	async fn nonce_of(&self, account: Address) -> Result<U256, LedgerError> {
		Ok(self.load().await?.nonce_of(&account))
	}

	async fn balance_of(&self, account: Address) -> Result<U256, LedgerError> {
		Ok(self.load().await?.balance_of(&account))
	}

	async fn deposit(&self, amount: U256) -> Result<U256, LedgerError> {
		let _guard = self.write_lock.lock().await;
		let mut snapshot = self.load().await?;
		let balance = snapshot.credit(self.custody, amount)?;
		self.save(&snapshot).await?;
		Ok(balance)
	}

	async fn redeem(&self, redemption: &Redemption) -> Result<U256, LedgerError> {
		let _guard = self.write_lock.lock().await;
		let mut snapshot = self.load().await?;
		let nonce = snapshot.apply_redemption(self.custody, redemption)?;
		self.save(&snapshot).await?;
		Ok(nonce)
	}
}
