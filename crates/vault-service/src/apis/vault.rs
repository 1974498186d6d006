//! Read-only vault queries.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use vault_core::{LedgerError, LedgerInterface, Remediation, Vault};
use vault_types::{utils::u256_serde, APIError, Eip712Domain};

use super::withdrawal::withdrawal_error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceResponse {
	pub account: Address,
	#[serde(with = "u256_serde")]
	pub nonce: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
	pub custody: Address,
	#[serde(with = "u256_serde")]
	pub balance: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainResponse {
	pub domain: Eip712Domain,
	pub domain_separator: B256,
}

fn ledger_error(err: LedgerError) -> APIError {
	APIError::InternalServerError {
		error_type: "LEDGER_ERROR".to_string(),
		message: err.to_string(),
		remediation: Remediation::Retry.to_string(),
	}
}

pub async fn get_nonce(account: &str, vault: &Vault) -> Result<NonceResponse, APIError> {
	let account: Address = account.parse().map_err(|e| APIError::BadRequest {
		error_type: "INVALID_ADDRESS".to_string(),
		message: format!("Invalid account address '{}': {}", account, e),
		remediation: Remediation::FixRequest.to_string(),
	})?;
	let nonce = vault
		.verifier()
		.nonce_of(account)
		.await
		.map_err(withdrawal_error)?;
	Ok(NonceResponse { account, nonce })
}

pub async fn get_balance(vault: &Vault) -> Result<BalanceResponse, APIError> {
	let ledger = vault.ledger();
	let balance = ledger.custody_balance().await.map_err(ledger_error)?;
	Ok(BalanceResponse {
		custody: ledger.custody(),
		balance,
	})
}

pub fn get_domain(vault: &Vault) -> DomainResponse {
	let separator = vault.domain_separator();
	DomainResponse {
		domain: separator.domain().clone(),
		domain_separator: separator.domain_hash(),
	}
}
