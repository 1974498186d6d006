//! Authorization issuance endpoint.
//!
//! Returns the typed-data payload an owner signs with
//! `eth_signTypedData_v4`. The nonce inside is only a hint; redemption
//! re-reads it.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use vault_core::{IssuerError, Remediation, Vault};
use vault_types::{utils::u256_serde, APIError, SigningRequest};

/// Body of `POST /api/authorizations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueAuthorizationRequest {
	pub recipient: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
}

pub fn issuer_error(err: IssuerError) -> APIError {
	match err {
		IssuerError::InvalidRecipient => APIError::BadRequest {
			error_type: "INVALID_RECIPIENT".to_string(),
			message: err.to_string(),
			remediation: Remediation::FixRequest.to_string(),
		},
		IssuerError::InvalidAmount => APIError::BadRequest {
			error_type: "INVALID_AMOUNT".to_string(),
			message: err.to_string(),
			remediation: Remediation::FixRequest.to_string(),
		},
		IssuerError::Ledger(e) => APIError::InternalServerError {
			error_type: "LEDGER_ERROR".to_string(),
			message: e.to_string(),
			remediation: Remediation::Retry.to_string(),
		},
	}
}

pub async fn issue_authorization(
	request: IssueAuthorizationRequest,
	vault: &Vault,
) -> Result<SigningRequest, APIError> {
	vault
		.issuer()
		.issue(request.recipient, request.amount)
		.await
		.map_err(issuer_error)
}
