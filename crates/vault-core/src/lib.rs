//! Core engine for signature-authorized vault withdrawals.
//!
//! Ties the EIP-712 hashing, signer recovery, the custody ledger, the
//! authorization issuer and the withdrawal verifier into one [`Vault`]
//! per deployment. Construct it with [`VaultBuilder`].

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use thiserror::Error;
use vault_config::Config;
use vault_types::VaultEvent;

pub mod builder;
pub mod clock;
pub mod eip712;
pub mod event_bus;
pub mod issuer;
pub mod ledger;
pub mod signature;
pub mod verifier;

pub use builder::{BuilderError, VaultBuilder, VaultFactories};
pub use clock::{Clock, ManualClock, SystemClock};
pub use eip712::DomainSeparator;
pub use event_bus::EventBus;
pub use issuer::{AuthorizationIssuer, IssuerError};
pub use ledger::{LedgerError, LedgerInterface, Redemption, StorageLedger};
pub use verifier::{Remediation, WithdrawalError, WithdrawalVerifier};

/// Errors surfaced by vault-level operations outside the withdrawal path.
#[derive(Debug, Error)]
pub enum VaultError {
	#[error("Invalid deposit: {0}")]
	InvalidDeposit(String),
	#[error(transparent)]
	Ledger(#[from] LedgerError),
}

/// A running vault deployment.
pub struct Vault {
	config: Config,
	ledger: Arc<dyn LedgerInterface>,
	issuer: Arc<AuthorizationIssuer>,
	verifier: Arc<WithdrawalVerifier>,
	event_bus: EventBus,
}

impl Vault {
	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn issuer(&self) -> &Arc<AuthorizationIssuer> {
		&self.issuer
	}

	pub fn verifier(&self) -> &Arc<WithdrawalVerifier> {
		&self.verifier
	}

	pub fn ledger(&self) -> &Arc<dyn LedgerInterface> {
		&self.ledger
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn domain_separator(&self) -> &DomainSeparator {
		self.verifier.separator()
	}

	/// Tops up custody with `amount` sent by `from`. Returns the new balance.
	pub async fn deposit(&self, from: Address, amount: U256) -> Result<U256, VaultError> {
		if amount.is_zero() {
			return Err(VaultError::InvalidDeposit(
				"amount must be greater than zero".into(),
			));
		}
		let balance = self.ledger.deposit(amount).await?;
		tracing::info!(from = %from, amount = %amount, balance = %balance, "Custody deposit");
		self.event_bus.publish(VaultEvent::Deposited { from, amount });
		Ok(balance)
	}
}
