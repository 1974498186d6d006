//! Authorization issuer.
//!
//! Hands out typed-data payloads for owners to sign. The nonce it embeds is
//! advisory: it is read fresh from the ledger on every call, and the
//! verifier re-derives it again at redemption time.

use crate::clock::Clock;
use crate::eip712::DomainSeparator;
use crate::event_bus::EventBus;
use crate::ledger::{LedgerError, LedgerInterface};
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use thiserror::Error;
use vault_types::{SigningRequest, VaultEvent, WithdrawalMessage};

/// Errors that can occur while issuing an authorization.
#[derive(Debug, Error)]
pub enum IssuerError {
	#[error("Recipient must not be the zero address")]
	InvalidRecipient,
	#[error("Amount must be greater than zero")]
	InvalidAmount,
	#[error(transparent)]
	Ledger(#[from] LedgerError),
}

pub struct AuthorizationIssuer {
	separator: DomainSeparator,
	ledger: Arc<dyn LedgerInterface>,
	clock: Arc<dyn Clock>,
	/// Seconds between issuance and deadline.
	window_secs: u64,
	event_bus: EventBus,
}

impl AuthorizationIssuer {
	pub fn new(
		separator: DomainSeparator,
		ledger: Arc<dyn LedgerInterface>,
		clock: Arc<dyn Clock>,
		window_secs: u64,
		event_bus: EventBus,
	) -> Self {
		Self {
			separator,
			ledger,
			clock,
			window_secs,
			event_bus,
		}
	}

	pub fn window_secs(&self) -> u64 {
		self.window_secs
	}

	/// Builds the signing request for withdrawing `amount` to `recipient`.
	///
	/// Two calls without an intervening redemption carry the same nonce;
	/// only one of the resulting signatures can ever be redeemed.
	pub async fn issue(
		&self,
		recipient: Address,
		amount: U256,
	) -> Result<SigningRequest, IssuerError> {
		if recipient == Address::ZERO {
			return Err(IssuerError::InvalidRecipient);
		}
		if amount.is_zero() {
			return Err(IssuerError::InvalidAmount);
		}

		let nonce = self.ledger.nonce_of(recipient).await?;
		let deadline = U256::from(self.clock.now().saturating_add(self.window_secs));
		let message = WithdrawalMessage {
			recipient,
			amount,
			nonce,
			deadline,
		};
		let digest = self.separator.digest(&message);

		tracing::info!(
			recipient = %recipient,
			amount = %amount,
			nonce = %nonce,
			deadline = %deadline,
			"Issued withdrawal authorization"
		);
		self.event_bus.publish(VaultEvent::AuthorizationIssued {
			recipient,
			amount,
			nonce,
			deadline,
		});

		Ok(SigningRequest::new(
			self.separator.domain().clone(),
			message,
			digest,
		))
	}
}
