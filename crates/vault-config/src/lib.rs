//! Configuration module for the gasless vault.
//!
//! Configuration is loaded from TOML. `${VAR}` and `${VAR:-default}` references
//! are resolved from the environment before parsing, which keeps key material
//! out of checked-in files.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["domain.toml", "storage.toml"]` to include other files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use alloy_primitives::{Address, U256};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use vault_types::Eip712Domain;

pub use loader::ConfigLoader;

/// Longest authorization window accepted from configuration (7 days).
const MAX_AUTHORIZATION_WINDOW_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the vault service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Vault identity and custody settings.
	pub vault: VaultConfig,
	/// EIP-712 domain every authorization is bound to.
	pub domain: DomainConfig,
	/// Authorization issuer settings.
	#[serde(default)]
	pub issuer: IssuerConfig,
	/// Storage backend for the ledger.
	pub storage: StorageConfig,
	/// Optional relayer signer.
	pub account: Option<AccountConfig>,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Vault identity and custody settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
	/// Identifier used in logs.
	pub id: String,
	/// Account holding the custodial balance. Defaults to the verifying contract.
	pub custody_address: Option<Address>,
	/// Amount deposited into custody when the ledger is first created.
	#[serde(default, deserialize_with = "deserialize_amount")]
	pub initial_custody: U256,
}

/// EIP-712 domain configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
	pub name: String,
	pub version: String,
	pub chain_id: u64,
	pub verifying_contract: Address,
}

impl DomainConfig {
	/// Builds the immutable domain descriptor.
	pub fn to_domain(&self) -> Eip712Domain {
		Eip712Domain::new(
			self.name.clone(),
			self.version.clone(),
			self.chain_id,
			self.verifying_contract,
		)
	}
}

/// Authorization issuer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IssuerConfig {
	/// Seconds between issuance and the authorization's deadline.
	/// Defaults to 1800 (30 minutes).
	#[serde(default = "default_authorization_window_seconds")]
	pub authorization_window_seconds: u64,
}

impl Default for IssuerConfig {
	fn default() -> Self {
		Self {
			authorization_window_seconds: default_authorization_window_seconds(),
		}
	}
}

fn default_authorization_window_seconds() -> u64 {
	1800
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for account management.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Accepts an amount either as a TOML integer or as a decimal/hex string,
/// since token base units routinely exceed the TOML integer range.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
	D: Deserializer<'de>,
{
	use serde::de::Error;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Amount {
		Int(u64),
		Str(String),
	}

	match Amount::deserialize(deserializer)? {
		Amount::Int(v) => Ok(U256::from(v)),
		Amount::Str(s) => match s.strip_prefix("0x") {
			Some(hex) => U256::from_str_radix(hex, 16).map_err(D::Error::custom),
			None => U256::from_str_radix(&s, 10).map_err(D::Error::custom),
		},
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Account that holds the custodial balance.
	pub fn custody_address(&self) -> Address {
		self.vault
			.custody_address
			.unwrap_or(self.domain.verifying_contract)
	}

	/// Validates the configuration.
	///
	/// A malformed domain is a deployment error, so every domain field is
	/// checked here rather than at signing time.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.vault.id.is_empty() {
			return Err(ConfigError::Validation("Vault ID cannot be empty".into()));
		}
		if self.vault.custody_address == Some(Address::ZERO) {
			return Err(ConfigError::Validation(
				"Vault custody_address cannot be the zero address".into(),
			));
		}

		if self.domain.name.is_empty() {
			return Err(ConfigError::Validation("Domain name cannot be empty".into()));
		}
		if self.domain.version.is_empty() {
			return Err(ConfigError::Validation(
				"Domain version cannot be empty".into(),
			));
		}
		if self.domain.chain_id == 0 {
			return Err(ConfigError::Validation(
				"Domain chain_id must be greater than 0".into(),
			));
		}
		if self.domain.verifying_contract == Address::ZERO {
			return Err(ConfigError::Validation(
				"Domain verifying_contract cannot be the zero address".into(),
			));
		}

		let window = self.issuer.authorization_window_seconds;
		if window == 0 || window > MAX_AUTHORIZATION_WINDOW_SECONDS {
			return Err(ConfigError::Validation(format!(
				"Issuer authorization_window_seconds must be between 1 and {}",
				MAX_AUTHORIZATION_WINDOW_SECONDS
			)));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if let Some(account) = &self.account {
			if !account.implementations.contains_key(&account.primary) {
				return Err(ConfigError::Validation(format!(
					"Primary account '{}' not found in implementations",
					account.primary
				)));
			}
		}

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[vault]
id = "vault-test"

[domain]
name = "GaslessVault"
version = "1"
chain_id = 31337
verifying_contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("VAULT_TEST_HOST", "localhost");
		std::env::set_var("VAULT_TEST_PORT", "5432");

		let input = "host = \"${VAULT_TEST_HOST}:${VAULT_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("VAULT_TEST_HOST");
		std::env::remove_var("VAULT_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${VAULT_MISSING_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${VAULT_DEFINITELY_MISSING}\"";
		let err = resolve_env_vars(input).unwrap_err();
		assert!(err.to_string().contains("VAULT_DEFINITELY_MISSING"));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config = Config::from_str(BASE).unwrap();

		assert_eq!(config.vault.id, "vault-test");
		assert_eq!(config.issuer.authorization_window_seconds, 1800);
		assert_eq!(config.vault.initial_custody, U256::ZERO);
		assert_eq!(config.custody_address(), config.domain.verifying_contract);
		assert!(config.account.is_none());
		assert!(config.api.is_none());

		let domain = config.domain.to_domain();
		assert_eq!(domain.chain_id, 31337);
		assert_eq!(domain.name, "GaslessVault");
	}

	#[test]
	fn test_initial_custody_accepts_large_strings() {
		let config_str = BASE.replace(
			"id = \"vault-test\"",
			"id = \"vault-test\"\ninitial_custody = \"1000000000000000000000000\"",
		);
		let config = Config::from_str(&config_str).unwrap();
		assert_eq!(
			config.vault.initial_custody,
			U256::from(10u64).pow(U256::from(24u64))
		);
	}

	#[test]
	fn test_zero_chain_id_rejected() {
		let config_str = BASE.replace("chain_id = 31337", "chain_id = 0");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("chain_id"));
	}

	#[test]
	fn test_malformed_verifying_contract_rejected() {
		let config_str = BASE.replace(
			"0x5FbDB2315678afecb367f032d93F642f64180aa3",
			"0x1234",
		);
		assert!(matches!(
			Config::from_str(&config_str),
			Err(ConfigError::Parse(_))
		));

		let config_str = BASE.replace(
			"0x5FbDB2315678afecb367f032d93F642f64180aa3",
			"0x0000000000000000000000000000000000000000",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("verifying_contract"));
	}

	#[test]
	fn test_window_bounds() {
		let config_str = format!("{}\n[issuer]\nauthorization_window_seconds = 0\n", BASE);
		assert!(Config::from_str(&config_str).is_err());

		let config_str = format!(
			"{}\n[issuer]\nauthorization_window_seconds = 999999999\n",
			BASE
		);
		assert!(Config::from_str(&config_str).is_err());

		let config_str = format!("{}\n[issuer]\nauthorization_window_seconds = 60\n", BASE);
		let config = Config::from_str(&config_str).unwrap();
		assert_eq!(config.issuer.authorization_window_seconds, 60);
	}

	#[test]
	fn test_unknown_primary_storage_rejected() {
		let config_str = BASE.replace("primary = \"memory\"", "primary = \"file\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Primary storage 'file'"));
	}

	#[test]
	fn test_account_and_api_sections() {
		std::env::set_var(
			"VAULT_TEST_PRIVATE_KEY",
			"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
		);
		let config_str = format!(
			r#"{}
[account]
primary = "local"
[account.implementations.local]
private_key = "${{VAULT_TEST_PRIVATE_KEY}}"

[api]
enabled = true
port = 8080
"#,
			BASE
		);
		let config = Config::from_str(&config_str).unwrap();
		std::env::remove_var("VAULT_TEST_PRIVATE_KEY");

		let account = config.account.unwrap();
		assert_eq!(account.primary, "local");
		assert_eq!(
			account.implementations["local"]["private_key"].as_str(),
			Some("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
		);

		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8080);
	}
}
