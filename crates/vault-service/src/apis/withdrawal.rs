//! Withdrawal redemption endpoints.
//!
//! Rejections keep their identity all the way to the client: each
//! verifier error maps to its own code, status and remediation.

use vault_core::{Vault, WithdrawalError};
use vault_types::{APIError, WithdrawalReceipt, WithdrawalRequest};

/// Maps a verifier rejection onto an HTTP error.
///
/// - 400: the request or signature bytes are malformed
/// - 401: the signature does not authorize this withdrawal
/// - 409: the authorization was already used or raced
/// - 410: the authorization expired
/// - 422: funds could not be moved; nothing was consumed
/// - 500: ledger backend failure
pub fn withdrawal_error(err: WithdrawalError) -> APIError {
	let error_type = err.code().to_string();
	let remediation = err.remediation().to_string();
	let message = err.to_string();

	match err {
		WithdrawalError::MalformedSignature(_) | WithdrawalError::InvalidRequest(_) => {
			APIError::BadRequest {
				error_type,
				message,
				remediation,
			}
		},
		WithdrawalError::InvalidSignature | WithdrawalError::UnauthorizedSigner { .. } => {
			APIError::Unauthorized {
				error_type,
				message,
				remediation,
			}
		},
		WithdrawalError::AlreadyRedeemed { .. } | WithdrawalError::StaleNonce { .. } => {
			APIError::Conflict {
				error_type,
				message,
				remediation,
			}
		},
		WithdrawalError::ExpiredAuthorization { .. } => APIError::Gone {
			error_type,
			message,
			remediation,
		},
		WithdrawalError::TransferFailed(_) => APIError::UnprocessableEntity {
			error_type,
			message,
			remediation,
		},
		WithdrawalError::Ledger(_) => APIError::InternalServerError {
			error_type,
			message,
			remediation,
		},
	}
}

/// Redeems a signed authorization.
pub async fn submit_withdrawal(
	request: WithdrawalRequest,
	vault: &Vault,
) -> Result<WithdrawalReceipt, APIError> {
	vault
		.verifier()
		.withdraw(&request)
		.await
		.map_err(withdrawal_error)
}

/// Checks a signed authorization without redeeming it.
pub async fn verify_withdrawal(
	request: WithdrawalRequest,
	vault: &Vault,
) -> Result<WithdrawalReceipt, APIError> {
	vault
		.verifier()
		.verify(&request)
		.await
		.map_err(withdrawal_error)
}
