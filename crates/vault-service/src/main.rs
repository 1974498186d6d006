//! Main entry point for the gasless vault relayer.
//!
//! `vault serve` runs the relayer: it loads the configuration, builds the
//! vault engine and exposes the HTTP API. `vault sign` signs a typed-data
//! payload with the configured account, which is handy for local testing
//! against a running relayer.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use vault_config::Config;
use vault_core::{Vault, VaultBuilder, VaultFactories};
use vault_types::VaultEvent;

mod apis;
mod server;
mod sign;

/// Command-line arguments for the vault service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "VAULT_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the relayer (default)
	Serve,
	/// Sign a signing request JSON file with the configured account
	Sign {
		/// Path to a `SigningRequest` as returned by POST /api/authorizations
		request: PathBuf,
	},
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.vault.id);

	match args.command.unwrap_or(Command::Serve) {
		Command::Serve => serve(config).await,
		Command::Sign { request } => sign::sign_request_file(&config, &request).await,
	}
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
	tracing::info!("Started vault relayer");

	let vault = Arc::new(build_vault(config.clone()).await?);
	let audit_task = log_events(Arc::clone(&vault));

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			let api_task = server::start_server(api_config, Arc::clone(&vault));
			tokio::select! {
				result = api_task => {
					tracing::info!("API server finished");
					result?;
				}
				_ = audit_task => {}
			}
		},
		None => {
			tracing::warn!("API disabled; only logging vault events");
			audit_task.await;
		},
	}

	tracing::info!("Stopped vault relayer");
	Ok(())
}

/// Builds the vault engine with every storage backend available.
async fn build_vault(config: Config) -> Result<Vault, Box<dyn std::error::Error>> {
	use vault_storage::implementations::file::create_storage as create_file_storage;
	use vault_storage::implementations::memory::create_storage as create_memory_storage;

	let storage_factories = create_factory_map!(
		vault_storage::StorageInterface,
		vault_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	Ok(VaultBuilder::new(config)
		.build(VaultFactories { storage_factories })
		.await?)
}

/// Writes every vault event to the log until Ctrl+C.
async fn log_events(vault: Arc<Vault>) {
	use tokio::sync::broadcast::error::RecvError;

	let mut events = vault.event_bus().subscribe();
	loop {
		tokio::select! {
			event = events.recv() => match event {
				Ok(VaultEvent::AuthorizationIssued { recipient, nonce, deadline, .. }) => {
					tracing::debug!(%recipient, %nonce, %deadline, "event: authorization issued");
				}
				Ok(VaultEvent::Withdrawn { recipient, amount, nonce }) => {
					tracing::info!(%recipient, %amount, %nonce, "event: withdrawn");
				}
				Ok(VaultEvent::Deposited { from, amount }) => {
					tracing::info!(%from, %amount, "event: deposited");
				}
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Event log fell behind");
				}
				Err(RecvError::Closed) => break,
			},
			_ = tokio::signal::ctrl_c() => break,
		}
	}
}
