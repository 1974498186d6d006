//! `vault sign`: signs a typed-data payload with the configured account.
//!
//! Prints a redemption request body ready for `POST /api/withdrawals`.

use std::path::Path;
use vault_account::{AccountError, AccountService};
use vault_config::Config;
use vault_types::{SigningRequest, WithdrawalRequest};

/// Creates the primary account service from `[account]`.
pub(crate) fn build_account(config: &Config) -> Result<AccountService, Box<dyn std::error::Error>> {
	let account = config
		.account
		.as_ref()
		.ok_or("No [account] section configured")?;

	let (_, factory) = vault_account::get_all_implementations()
		.into_iter()
		.find(|(name, _)| *name == account.primary)
		.ok_or_else(|| format!("Unknown account implementation '{}'", account.primary))?;
	let implementation_config = account
		.implementations
		.get(&account.primary)
		.ok_or_else(|| format!("Account '{}' has no configuration", account.primary))?;

	Ok(AccountService::new(factory(implementation_config)?))
}

/// Signs `request` and assembles the matching redemption request.
pub(crate) async fn sign_request(
	account: &AccountService,
	request: &SigningRequest,
) -> Result<WithdrawalRequest, AccountError> {
	let signer = account.get_address().await?;
	if signer != request.message.recipient {
		tracing::warn!(
			%signer,
			recipient = %request.message.recipient,
			"Signer is not the recipient; the vault will reject this authorization"
		);
	}

	let signature = account.sign_withdrawal(request).await?;
	Ok(WithdrawalRequest {
		recipient: request.message.recipient,
		amount: request.message.amount,
		deadline: request.message.deadline,
		signature,
	})
}

pub(crate) async fn sign_request_file(
	config: &Config,
	path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
	let account = build_account(config)?;
	let content = tokio::fs::read_to_string(path).await?;
	let request: SigningRequest = serde_json::from_str(&content)?;

	let redemption = sign_request(&account, &request).await?;
	println!("{}", serde_json::to_string_pretty(&redemption)?);
	Ok(())
}
