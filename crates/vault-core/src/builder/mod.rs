//! Builder for vault engines.
//!
//! Storage is pluggable: the builder receives a factory per backend name
//! and instantiates the one `[storage] primary` selects.

use crate::clock::{Clock, SystemClock};
use crate::eip712::DomainSeparator;
use crate::event_bus::EventBus;
use crate::issuer::AuthorizationIssuer;
use crate::ledger::{LedgerInterface, StorageLedger};
use crate::verifier::WithdrawalVerifier;
use crate::Vault;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use vault_config::Config;
use vault_storage::{StorageError, StorageInterface, StorageService};

/// Errors that can occur during vault construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions the builder can draw on, keyed by implementation name.
pub struct VaultFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

impl VaultFactories<vault_storage::StorageFactory> {
	/// Every storage backend shipped with the workspace.
	pub fn with_builtin_storage() -> Self {
		Self {
			storage_factories: vault_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}
}

/// Builder for constructing a [`Vault`].
pub struct VaultBuilder {
	config: Config,
	clock: Arc<dyn Clock>,
	event_capacity: usize,
}

impl VaultBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			clock: Arc::new(SystemClock),
			event_capacity: 1000,
		}
	}

	/// Replaces the wall clock, e.g. with a [`ManualClock`](crate::ManualClock).
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity.max(1);
		self
	}

	pub async fn build<SF>(self, factories: VaultFactories<SF>) -> Result<Vault, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let primary = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(primary)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration",
					primary
				))
			})?;
		let factory = factories.storage_factories.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("storage implementation '{}'", primary))
		})?;

		let backend = match factory(storage_config) {
			Ok(backend) => backend,
			Err(e) => {
				tracing::error!(
					component = "storage",
					implementation = %primary,
					error = %e,
					"Failed to create storage implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create storage implementation '{}': {}",
					primary, e
				)));
			},
		};
		tracing::info!(component = "storage", implementation = %primary, "Loaded");

		let storage = Arc::new(StorageService::new(backend));
		let ledger: Arc<dyn LedgerInterface> = Arc::new(
			StorageLedger::open(
				storage,
				self.config.vault.id.clone(),
				self.config.custody_address(),
				self.config.vault.initial_custody,
			)
			.await
			.map_err(|e| BuilderError::Config(format!("Failed to open ledger: {}", e)))?,
		);

		let separator = DomainSeparator::new(self.config.domain.to_domain());
		tracing::info!(
			component = "domain",
			name = %separator.domain().name,
			version = %separator.domain().version,
			chain_id = separator.domain().chain_id,
			verifying_contract = %separator.domain().verifying_contract,
			separator = %separator.domain_hash(),
			"Loaded"
		);

		let event_bus = EventBus::new(self.event_capacity);
		let issuer = Arc::new(AuthorizationIssuer::new(
			separator.clone(),
			ledger.clone(),
			self.clock.clone(),
			self.config.issuer.authorization_window_seconds,
			event_bus.clone(),
		));
		let verifier = Arc::new(WithdrawalVerifier::new(
			separator,
			ledger.clone(),
			self.clock,
			event_bus.clone(),
		));

		Ok(Vault {
			config: self.config,
			ledger,
			issuer,
			verifier,
			event_bus,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use crate::verifier::WithdrawalError;
	use alloy_primitives::U256;
	use vault_account::{implementations::local::LocalAccount, AccountService};
	use vault_types::{VaultEvent, WithdrawalRequest};

	const OWNER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	fn config(extra: &str) -> Config {
		format!(
			r#"
[vault]
id = "builder-test"
initial_custody = "5000"

[domain]
name = "GaslessVault"
version = "1"
chain_id = 31337
verifying_contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[storage]
primary = "memory"
[storage.implementations.memory]
{}
"#,
			extra
		)
		.parse()
		.unwrap()
	}

	#[tokio::test]
	async fn test_build_and_round_trip() {
		let clock = Arc::new(ManualClock::new(1_700_000_000));
		let vault = VaultBuilder::new(config(""))
			.with_clock(clock.clone())
			.build(VaultFactories::with_builtin_storage())
			.await
			.unwrap();

		assert_eq!(
			vault.ledger().custody(),
			vault.config().domain.verifying_contract
		);
		assert_eq!(
			vault.verifier().custody_balance().await.unwrap(),
			U256::from(5000)
		);

		let signer = AccountService::new(Box::new(LocalAccount::from_hex(OWNER_KEY).unwrap()));
		let owner = signer.get_address().await.unwrap();

		let request = vault.issuer().issue(owner, U256::from(1000)).await.unwrap();
		assert_eq!(
			request.domain.chain_id,
			vault.domain_separator().domain().chain_id
		);
		let redemption = WithdrawalRequest {
			recipient: owner,
			amount: request.message.amount,
			deadline: request.message.deadline,
			signature: signer.sign_withdrawal(&request).await.unwrap(),
		};

		vault.verifier().withdraw(&redemption).await.unwrap();
		assert!(matches!(
			vault.verifier().withdraw(&redemption).await,
			Err(WithdrawalError::AlreadyRedeemed { .. })
		));

		// Past the configured window a fresh request is needed.
		let late = vault.issuer().issue(owner, U256::from(1)).await.unwrap();
		clock.advance(vault.issuer().window_secs() + 1);
		let late = WithdrawalRequest {
			recipient: owner,
			amount: late.message.amount,
			deadline: late.message.deadline,
			signature: signer.sign_withdrawal(&late).await.unwrap(),
		};
		assert!(matches!(
			vault.verifier().withdraw(&late).await,
			Err(WithdrawalError::ExpiredAuthorization { .. })
		));
	}

	#[tokio::test]
	async fn test_deposit_publishes_event() {
		let vault = VaultBuilder::new(config(""))
			.build(VaultFactories::with_builtin_storage())
			.await
			.unwrap();
		let mut events = vault.event_bus().subscribe();
		let from = alloy_primitives::Address::repeat_byte(0x42);

		let balance = vault.deposit(from, U256::from(250)).await.unwrap();
		assert_eq!(balance, U256::from(5250));
		assert_eq!(
			events.recv().await.unwrap(),
			VaultEvent::Deposited {
				from,
				amount: U256::from(250),
			}
		);
		assert!(vault.deposit(from, U256::ZERO).await.is_err());
	}

	#[tokio::test]
	async fn test_unknown_storage_backend() {
		let config = config("[storage.implementations.redis]\nurl = \"redis://localhost\"");
		let mut config = config;
		config.storage.primary = "redis".into();

		let result = VaultBuilder::new(config)
			.build(VaultFactories::with_builtin_storage())
			.await;
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[tokio::test]
	async fn test_invalid_storage_config() {
		let mut config = config("");
		config.storage.primary = "file".into();
		config.storage.implementations.insert(
			"file".into(),
			toml::from_str("storage_path = \"\"").unwrap(),
		);

		let result = VaultBuilder::new(config)
			.build(VaultFactories::with_builtin_storage())
			.await;
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}
}
