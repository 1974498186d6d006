//! Signature-authorized withdrawal state machine.
//!
//! The verifier owns nonce enforcement. It never trusts a nonce from the
//! caller: the message is rebuilt from the ledger's current nonce, so a
//! signature only verifies if it was made for exactly that nonce.

use crate::clock::Clock;
use crate::eip712::DomainSeparator;
use crate::event_bus::EventBus;
use crate::ledger::{LedgerError, LedgerInterface, Redemption};
use crate::signature::{self, ParsedSignature, RecoveryError};
use alloy_primitives::{Address, B256, U256};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;
use vault_types::{
	truncate_id, VaultEvent, WithdrawalMessage, WithdrawalReceipt, WithdrawalRequest,
};

/// Reasons a withdrawal is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WithdrawalError {
	#[error("Malformed signature: {0}")]
	MalformedSignature(String),
	#[error("Signature recovers to no valid identity")]
	InvalidSignature,
	#[error("Signer {recovered} is not the recipient {expected}")]
	UnauthorizedSigner { expected: Address, recovered: Address },
	#[error("Authorization expired at {deadline}, now {now}")]
	ExpiredAuthorization { deadline: U256, now: u64 },
	#[error("Authorization for nonce {nonce} was already redeemed")]
	AlreadyRedeemed { nonce: U256 },
	#[error("Nonce moved during redemption: expected {expected}, current {current}")]
	StaleNonce { expected: U256, current: U256 },
	#[error("Transfer failed: {0}")]
	TransferFailed(String),
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	#[error("Ledger error: {0}")]
	Ledger(String),
}

/// What a client should do after a rejected withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
	/// Sign the same authorization again, correctly.
	ReSign,
	/// Ask the issuer for a fresh authorization.
	RequestNewAuthorization,
	/// The authorization was used; nothing to do.
	AlreadyUsed,
	/// Transient; retrying the same request may succeed.
	Retry,
	/// The request itself is wrong.
	FixRequest,
}

impl Remediation {
	pub fn as_str(&self) -> &'static str {
		match self {
			Remediation::ReSign => "re_sign",
			Remediation::RequestNewAuthorization => "request_new_authorization",
			Remediation::AlreadyUsed => "already_used",
			Remediation::Retry => "retry",
			Remediation::FixRequest => "fix_request",
		}
	}
}

impl fmt::Display for Remediation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl WithdrawalError {
	pub fn remediation(&self) -> Remediation {
		match self {
			WithdrawalError::MalformedSignature(_)
			| WithdrawalError::InvalidSignature
			| WithdrawalError::UnauthorizedSigner { .. } => Remediation::ReSign,
			WithdrawalError::ExpiredAuthorization { .. } => Remediation::RequestNewAuthorization,
			WithdrawalError::AlreadyRedeemed { .. } => Remediation::AlreadyUsed,
			WithdrawalError::StaleNonce { .. } => Remediation::RequestNewAuthorization,
			WithdrawalError::TransferFailed(_) | WithdrawalError::Ledger(_) => Remediation::Retry,
			WithdrawalError::InvalidRequest(_) => Remediation::FixRequest,
		}
	}

	/// Stable machine-readable code.
	pub fn code(&self) -> &'static str {
		match self {
			WithdrawalError::MalformedSignature(_) => "MALFORMED_SIGNATURE",
			WithdrawalError::InvalidSignature => "INVALID_SIGNATURE",
			WithdrawalError::UnauthorizedSigner { .. } => "UNAUTHORIZED_SIGNER",
			WithdrawalError::ExpiredAuthorization { .. } => "EXPIRED_AUTHORIZATION",
			WithdrawalError::AlreadyRedeemed { .. } => "ALREADY_REDEEMED",
			WithdrawalError::StaleNonce { .. } => "STALE_NONCE",
			WithdrawalError::TransferFailed(_) => "TRANSFER_FAILED",
			WithdrawalError::InvalidRequest(_) => "INVALID_REQUEST",
			WithdrawalError::Ledger(_) => "LEDGER_ERROR",
		}
	}
}

impl From<RecoveryError> for WithdrawalError {
	fn from(err: RecoveryError) -> Self {
		match err {
			RecoveryError::Malformed(msg) => WithdrawalError::MalformedSignature(msg),
			RecoveryError::ZeroAddress => WithdrawalError::InvalidSignature,
		}
	}
}

impl From<LedgerError> for WithdrawalError {
	fn from(err: LedgerError) -> Self {
		match err {
			LedgerError::StaleNonce {
				expected, current, ..
			} => WithdrawalError::StaleNonce { expected, current },
			LedgerError::InsufficientCustody { .. } | LedgerError::Overflow(_) => {
				WithdrawalError::TransferFailed(err.to_string())
			},
			LedgerError::Backend(msg) => WithdrawalError::Ledger(msg),
		}
	}
}

/// A request that passed every check against the current nonce.
struct Authorized {
	message: WithdrawalMessage,
	digest: B256,
}

/// Verifies and redeems withdrawal authorizations for one vault.
pub struct WithdrawalVerifier {
	separator: DomainSeparator,
	ledger: Arc<dyn LedgerInterface>,
	clock: Arc<dyn Clock>,
	event_bus: EventBus,
	/// One lock per recipient, held across verify and commit.
	locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl WithdrawalVerifier {
	pub fn new(
		separator: DomainSeparator,
		ledger: Arc<dyn LedgerInterface>,
		clock: Arc<dyn Clock>,
		event_bus: EventBus,
	) -> Self {
		Self {
			separator,
			ledger,
			clock,
			event_bus,
			locks: DashMap::new(),
		}
	}

	pub fn separator(&self) -> &DomainSeparator {
		&self.separator
	}

	/// Current nonce of `account`.
	pub async fn nonce_of(&self, account: Address) -> Result<U256, WithdrawalError> {
		Ok(self.ledger.nonce_of(account).await?)
	}

	pub async fn custody_balance(&self) -> Result<U256, WithdrawalError> {
		Ok(self.ledger.custody_balance().await?)
	}

	fn lock_for(&self, account: Address) -> Arc<Mutex<()>> {
		self.locks
			.entry(account)
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	/// Runs every check `withdraw` runs without changing any state.
	///
	/// Also confirms custody currently covers the amount. A passing dry run
	/// can still lose a race to a concurrent redemption.
	pub async fn verify(
		&self,
		request: &WithdrawalRequest,
	) -> Result<WithdrawalReceipt, WithdrawalError> {
		let nonce = self.ledger.nonce_of(request.recipient).await?;
		let authorized = self.authorize(request, nonce)?;

		let available = self.ledger.custody_balance().await?;
		if available < request.amount {
			return Err(WithdrawalError::TransferFailed(
				LedgerError::InsufficientCustody {
					available,
					requested: request.amount,
				}
				.to_string(),
			));
		}

		Ok(receipt(&authorized))
	}

	/// Verifies `request` against the recipient's current nonce and, if it
	/// authorizes the withdrawal, consumes the nonce and pays out.
	#[instrument(skip_all, fields(recipient = %request.recipient, amount = %request.amount))]
	pub async fn withdraw(
		&self,
		request: &WithdrawalRequest,
	) -> Result<WithdrawalReceipt, WithdrawalError> {
		match self.withdraw_locked(request).await {
			Ok(receipt) => {
				tracing::info!(
					nonce = %receipt.nonce,
					digest = %truncate_id(&receipt.digest.to_string()),
					"Withdrawal redeemed"
				);
				self.event_bus.publish(VaultEvent::Withdrawn {
					recipient: receipt.recipient,
					amount: receipt.amount,
					nonce: receipt.nonce,
				});
				Ok(receipt)
			},
			Err(e) => {
				tracing::warn!(error = %e, code = e.code(), "Withdrawal rejected");
				Err(e)
			},
		}
	}

	async fn withdraw_locked(
		&self,
		request: &WithdrawalRequest,
	) -> Result<WithdrawalReceipt, WithdrawalError> {
		// Rejections that need no nonce never reach the lock table.
		self.precheck(request)?;

		let lock = self.lock_for(request.recipient);
		let result = {
			let _guard = lock.lock().await;
			self.redeem_at_current_nonce(request).await
		};
		drop(lock);
		self.release_lock(request.recipient);
		result
	}

	async fn redeem_at_current_nonce(
		&self,
		request: &WithdrawalRequest,
	) -> Result<WithdrawalReceipt, WithdrawalError> {
		let nonce = self.ledger.nonce_of(request.recipient).await?;
		let authorized = self.authorize(request, nonce)?;

		self.ledger
			.redeem(&Redemption {
				recipient: request.recipient,
				amount: request.amount,
				expected_nonce: nonce,
			})
			.await?;

		Ok(receipt(&authorized))
	}

	/// Drops the entry for `account` unless another redemption holds it.
	fn release_lock(&self, account: Address) {
		self.locks
			.remove_if(&account, |_, lock| Arc::strong_count(lock) == 1);
	}

	/// Checks that do not depend on the nonce: request shape, expiry and
	/// signature encoding.
	fn precheck(&self, request: &WithdrawalRequest) -> Result<ParsedSignature, WithdrawalError> {
		if request.recipient == Address::ZERO {
			return Err(WithdrawalError::InvalidRequest(
				"recipient must not be the zero address".into(),
			));
		}
		if request.amount.is_zero() {
			return Err(WithdrawalError::InvalidRequest(
				"amount must be greater than zero".into(),
			));
		}

		let now = self.clock.now();
		if U256::from(now) > request.deadline {
			return Err(WithdrawalError::ExpiredAuthorization {
				deadline: request.deadline,
				now,
			});
		}

		Ok(signature::parse(&request.signature)?)
	}

	/// Checks `request` against `nonce`. Pure apart from reading the clock.
	fn authorize(
		&self,
		request: &WithdrawalRequest,
		nonce: U256,
	) -> Result<Authorized, WithdrawalError> {
		let parsed = self.precheck(request)?;

		let message = WithdrawalMessage {
			recipient: request.recipient,
			amount: request.amount,
			nonce,
			deadline: request.deadline,
		};
		let digest = self.separator.digest(&message);
		tracing::debug!(nonce = %nonce, digest = %digest, "Rebuilt withdrawal digest");

		let signer = parsed.recover(&digest)?;
		if signer != request.recipient {
			if let Some(consumed) = self.consumed_nonce(&message, &parsed) {
				return Err(WithdrawalError::AlreadyRedeemed { nonce: consumed });
			}
			return Err(WithdrawalError::UnauthorizedSigner {
				expected: request.recipient,
				recovered: signer,
			});
		}

		Ok(Authorized { message, digest })
	}

	/// Returns the previous nonce if the signature was valid for it.
	fn consumed_nonce(
		&self,
		message: &WithdrawalMessage,
		signature: &ParsedSignature,
	) -> Option<U256> {
		let previous = message.nonce.checked_sub(U256::from(1))?;
		let digest = self.separator.digest(&WithdrawalMessage {
			nonce: previous,
			..*message
		});
		match signature.recover(&digest) {
			Ok(signer) if signer == message.recipient => Some(previous),
			_ => None,
		}
	}
}

fn receipt(authorized: &Authorized) -> WithdrawalReceipt {
	WithdrawalReceipt {
		recipient: authorized.message.recipient,
		amount: authorized.message.amount,
		nonce: authorized.message.nonce,
		digest: authorized.digest,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use crate::ledger::StorageLedger;
	use alloy_primitives::{address, Bytes};
	use tokio::sync::Barrier;
	use vault_account::implementations::local::LocalAccount;
	use vault_storage::{implementations::memory::MemoryStorage, StorageService};
	use vault_types::Eip712Domain;

	const T: u64 = 1_700_000_000;
	const CUSTODY: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
	const OWNER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
	const OTHER_KEY: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

	struct Harness {
		verifier: Arc<WithdrawalVerifier>,
		ledger: Arc<StorageLedger>,
		clock: Arc<ManualClock>,
		owner: LocalAccount,
	}

	fn domain() -> Eip712Domain {
		Eip712Domain::new("GaslessVault", "1", 31337, CUSTODY)
	}

	async fn harness_with(domain: Eip712Domain, custody: u64) -> Harness {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let ledger = Arc::new(
			StorageLedger::open(storage, "test", CUSTODY, U256::from(custody))
				.await
				.unwrap(),
		);
		let clock = Arc::new(ManualClock::new(T));
		let verifier = Arc::new(WithdrawalVerifier::new(
			DomainSeparator::new(domain),
			ledger.clone(),
			clock.clone(),
			EventBus::new(16),
		));
		Harness {
			verifier,
			ledger,
			clock,
			owner: LocalAccount::from_hex(OWNER_KEY).unwrap(),
		}
	}

	async fn harness() -> Harness {
		harness_with(domain(), 1_000_000).await
	}

	fn sign(
		signer: &LocalAccount,
		domain: &Eip712Domain,
		recipient: Address,
		amount: u64,
		nonce: u64,
		deadline: u64,
	) -> WithdrawalRequest {
		let message = WithdrawalMessage {
			recipient,
			amount: U256::from(amount),
			nonce: U256::from(nonce),
			deadline: U256::from(deadline),
		};
		let digest = DomainSeparator::new(domain.clone()).digest(&message);
		WithdrawalRequest {
			recipient,
			amount: message.amount,
			deadline: message.deadline,
			signature: signer.sign_hash_sync(&digest).unwrap(),
		}
	}

	impl Harness {
		fn owner_request(&self, amount: u64, nonce: u64, deadline: u64) -> WithdrawalRequest {
			sign(
				&self.owner,
				&domain(),
				self.owner.address(),
				amount,
				nonce,
				deadline,
			)
		}
	}

	#[tokio::test]
	async fn test_redeems_once_then_rejects_replay() {
		let h = harness().await;
		let r = h.owner.address();
		let request = h.owner_request(1000, 0, T + 1800);

		let receipt = h.verifier.withdraw(&request).await.unwrap();
		assert_eq!(receipt.nonce, U256::ZERO);
		assert_eq!(receipt.amount, U256::from(1000));
		assert_eq!(h.verifier.nonce_of(r).await.unwrap(), U256::from(1));
		assert_eq!(h.ledger.balance_of(r).await.unwrap(), U256::from(1000));
		assert_eq!(
			h.verifier.custody_balance().await.unwrap(),
			U256::from(999_000)
		);

		let replay = h.verifier.withdraw(&request).await.unwrap_err();
		assert_eq!(replay, WithdrawalError::AlreadyRedeemed { nonce: U256::ZERO });
		assert_eq!(replay.remediation(), Remediation::AlreadyUsed);
		assert_eq!(h.verifier.nonce_of(r).await.unwrap(), U256::from(1));
		assert_eq!(h.ledger.balance_of(r).await.unwrap(), U256::from(1000));
	}

	#[tokio::test]
	async fn test_sequential_nonces() {
		let h = harness().await;
		for nonce in 0..3 {
			let request = h.owner_request(10, nonce, T + 60);
			let receipt = h.verifier.withdraw(&request).await.unwrap();
			assert_eq!(receipt.nonce, U256::from(nonce));
		}
		assert_eq!(
			h.verifier.nonce_of(h.owner.address()).await.unwrap(),
			U256::from(3)
		);
	}

	#[tokio::test]
	async fn test_signature_for_future_nonce_is_unauthorized() {
		let h = harness().await;
		let request = h.owner_request(1000, 1, T + 60);

		let err = h.verifier.withdraw(&request).await.unwrap_err();
		assert!(matches!(err, WithdrawalError::UnauthorizedSigner { .. }));
		assert_eq!(
			h.verifier.nonce_of(h.owner.address()).await.unwrap(),
			U256::ZERO
		);
	}

	#[tokio::test]
	async fn test_deadline_boundary() {
		let h = harness().await;

		let at_deadline = h.owner_request(1, 0, T);
		assert!(h.verifier.withdraw(&at_deadline).await.is_ok());

		let past = h.owner_request(1, 1, T - 1);
		assert_eq!(
			h.verifier.withdraw(&past).await.unwrap_err(),
			WithdrawalError::ExpiredAuthorization {
				deadline: U256::from(T - 1),
				now: T,
			}
		);

		let later = h.owner_request(1, 1, T + 10);
		h.clock.advance(11);
		let err = h.verifier.withdraw(&later).await.unwrap_err();
		assert_eq!(err.remediation(), Remediation::RequestNewAuthorization);
	}

	#[tokio::test]
	async fn test_expiry_checked_before_signature() {
		let h = harness().await;

		let mut expired_and_forged = h.owner_request(1, 0, T - 1);
		expired_and_forged.signature = Bytes::from(vec![0u8; 10]);
		assert!(matches!(
			h.verifier.withdraw(&expired_and_forged).await,
			Err(WithdrawalError::ExpiredAuthorization { .. })
		));

		let mut fresh_and_forged = h.owner_request(1, 0, T + 60);
		fresh_and_forged.signature = Bytes::from(vec![0u8; 10]);
		assert!(matches!(
			h.verifier.withdraw(&fresh_and_forged).await,
			Err(WithdrawalError::MalformedSignature(_))
		));
	}

	#[tokio::test]
	async fn test_tampered_fields_are_unauthorized() {
		let h = harness().await;
		let request = h.owner_request(1000, 0, T + 60);

		let more = WithdrawalRequest {
			amount: U256::from(1001),
			..request.clone()
		};
		let later = WithdrawalRequest {
			deadline: U256::from(T + 61),
			..request.clone()
		};
		for tampered in [more, later] {
			let err = h.verifier.withdraw(&tampered).await.unwrap_err();
			assert!(matches!(
				err,
				WithdrawalError::UnauthorizedSigner { expected, .. } if expected == h.owner.address()
			));
			assert_eq!(err.remediation(), Remediation::ReSign);
		}

		// Someone else's signature naming the owner as recipient.
		let other = LocalAccount::from_hex(OTHER_KEY).unwrap();
		let forged = sign(&other, &domain(), h.owner.address(), 1000, 0, T + 60);
		assert_eq!(
			h.verifier.withdraw(&forged).await.unwrap_err(),
			WithdrawalError::UnauthorizedSigner {
				expected: h.owner.address(),
				recovered: other.address(),
			}
		);

		// The original still works; nothing was consumed.
		assert!(h.verifier.withdraw(&request).await.is_ok());
	}

	#[tokio::test]
	async fn test_domain_isolation() {
		let h = harness().await;
		let variants = [
			Eip712Domain {
				chain_id: 1,
				..domain()
			},
			Eip712Domain {
				verifying_contract: Address::repeat_byte(0x01),
				..domain()
			},
			Eip712Domain {
				name: "OtherVault".into(),
				..domain()
			},
			Eip712Domain {
				version: "2".into(),
				..domain()
			},
		];

		for variant in variants {
			let request = sign(&h.owner, &variant, h.owner.address(), 1000, 0, T + 60);
			assert!(matches!(
				h.verifier.withdraw(&request).await,
				Err(WithdrawalError::UnauthorizedSigner { .. })
			));
		}
		assert_eq!(
			h.verifier.nonce_of(h.owner.address()).await.unwrap(),
			U256::ZERO
		);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_redemptions_are_serialized() {
		for _ in 0..50 {
			let h = harness().await;
			let request = h.owner_request(1000, 0, T + 1800);
			let start = Arc::new(Barrier::new(2));

			let racers: Vec<_> = (0..2)
				.map(|_| {
					let verifier = h.verifier.clone();
					let request = request.clone();
					let start = start.clone();
					tokio::spawn(async move {
						start.wait().await;
						verifier.withdraw(&request).await
					})
				})
				.collect();

			let mut results = Vec::new();
			for racer in racers {
				results.push(racer.await.unwrap());
			}
			let successes = results.iter().filter(|r| r.is_ok()).count();
			let replays = results
				.iter()
				.filter(|r| matches!(r, Err(WithdrawalError::AlreadyRedeemed { .. })))
				.count();

			// A StaleNonce here would mean both racers read nonce 0.
			assert_eq!(successes, 1, "{:?}", results);
			assert_eq!(replays, 1, "{:?}", results);
			assert_eq!(
				h.verifier.nonce_of(h.owner.address()).await.unwrap(),
				U256::from(1)
			);
			assert_eq!(
				h.ledger.balance_of(h.owner.address()).await.unwrap(),
				U256::from(1000)
			);
			assert!(h.verifier.locks.is_empty());
		}
	}

	#[tokio::test]
	async fn test_lock_table_does_not_grow() {
		let h = harness().await;

		for i in 1..=1000u64 {
			let recipient = Address::from_word(B256::from(U256::from(i)));
			let zero_amount = WithdrawalRequest {
				recipient,
				amount: U256::ZERO,
				deadline: U256::from(T + 60),
				signature: Bytes::from(vec![0u8; 65]),
			};
			let expired = WithdrawalRequest {
				amount: U256::from(1),
				deadline: U256::from(T - 1),
				..zero_amount.clone()
			};
			let garbage = WithdrawalRequest {
				amount: U256::from(1),
				signature: Bytes::from(vec![7u8; 3]),
				..zero_amount.clone()
			};
			for request in [zero_amount, expired, garbage] {
				assert!(h.verifier.withdraw(&request).await.is_err());
			}
		}
		assert!(h.verifier.locks.is_empty());

		// Requests that reach the ledger release their entry too.
		let forged = sign(
			&LocalAccount::from_hex(OTHER_KEY).unwrap(),
			&domain(),
			h.owner.address(),
			10,
			0,
			T + 60,
		);
		assert!(h.verifier.withdraw(&forged).await.is_err());
		h.verifier
			.withdraw(&h.owner_request(10, 0, T + 60))
			.await
			.unwrap();
		assert!(h.verifier.locks.is_empty());
	}

	#[tokio::test]
	async fn test_insufficient_custody_keeps_nonce() {
		let h = harness_with(domain(), 500).await;
		let request = h.owner_request(1000, 0, T + 60);

		let err = h.verifier.withdraw(&request).await.unwrap_err();
		assert!(matches!(err, WithdrawalError::TransferFailed(_)));
		assert_eq!(err.remediation(), Remediation::Retry);
		assert_eq!(
			h.verifier.nonce_of(h.owner.address()).await.unwrap(),
			U256::ZERO
		);

		// Once custody is topped up the same authorization goes through.
		h.ledger.deposit(U256::from(500)).await.unwrap();
		assert!(h.verifier.withdraw(&request).await.is_ok());
	}

	#[tokio::test]
	async fn test_stale_nonce_from_external_writer() {
		let h = harness().await;
		let request = h.owner_request(1000, 0, T + 60);

		// Authorized against nonce 0, but the ledger moved before commit.
		let authorized = h.verifier.authorize(&request, U256::ZERO).unwrap();
		h.ledger
			.redeem(&Redemption {
				recipient: h.owner.address(),
				amount: U256::from(1),
				expected_nonce: U256::ZERO,
			})
			.await
			.unwrap();

		let err: WithdrawalError = h
			.ledger
			.redeem(&Redemption {
				recipient: authorized.message.recipient,
				amount: authorized.message.amount,
				expected_nonce: authorized.message.nonce,
			})
			.await
			.unwrap_err()
			.into();
		assert_eq!(
			err,
			WithdrawalError::StaleNonce {
				expected: U256::ZERO,
				current: U256::from(1),
			}
		);
	}

	#[tokio::test]
	async fn test_invalid_requests() {
		let h = harness().await;

		let zero_amount = h.owner_request(0, 0, T + 60);
		let err = h.verifier.withdraw(&zero_amount).await.unwrap_err();
		assert!(matches!(err, WithdrawalError::InvalidRequest(_)));
		assert_eq!(err.remediation(), Remediation::FixRequest);

		let zero_recipient = sign(&h.owner, &domain(), Address::ZERO, 1, 0, T + 60);
		assert!(matches!(
			h.verifier.withdraw(&zero_recipient).await,
			Err(WithdrawalError::InvalidRequest(_))
		));
	}

	#[tokio::test]
	async fn test_verify_is_a_dry_run() {
		let h = harness_with(domain(), 2000).await;
		let request = h.owner_request(1000, 0, T + 60);

		let preview = h.verifier.verify(&request).await.unwrap();
		assert_eq!(preview.nonce, U256::ZERO);
		assert_eq!(
			h.verifier.nonce_of(h.owner.address()).await.unwrap(),
			U256::ZERO
		);

		let receipt = h.verifier.withdraw(&request).await.unwrap();
		assert_eq!(receipt, preview);

		let too_much = h.owner_request(5000, 1, T + 60);
		assert!(matches!(
			h.verifier.verify(&too_much).await,
			Err(WithdrawalError::TransferFailed(_))
		));
	}

	#[tokio::test]
	async fn test_publishes_withdrawn_event() {
		let h = harness().await;
		let mut events = h.verifier.event_bus.subscribe();

		h.verifier
			.withdraw(&h.owner_request(1000, 0, T + 60))
			.await
			.unwrap();

		assert_eq!(
			events.recv().await.unwrap(),
			VaultEvent::Withdrawn {
				recipient: h.owner.address(),
				amount: U256::from(1000),
				nonce: U256::ZERO,
			}
		);
	}

	#[test]
	fn test_recovery_error_mapping() {
		assert_eq!(
			WithdrawalError::from(RecoveryError::ZeroAddress),
			WithdrawalError::InvalidSignature
		);
		assert!(matches!(
			WithdrawalError::from(RecoveryError::Malformed("x".into())),
			WithdrawalError::MalformedSignature(_)
		));
		assert_eq!(
			WithdrawalError::from(LedgerError::Backend("down".into())),
			WithdrawalError::Ledger("down".into())
		);
	}
}
