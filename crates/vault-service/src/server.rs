//! HTTP server for the relayer API.
//!
//! A thin layer over the vault engine: handlers parse the request, call
//! into the issuer or verifier and map the outcome onto JSON.

use crate::apis::{
	authorization::{issue_authorization, IssueAuthorizationRequest},
	vault::{get_balance, get_domain, get_nonce, BalanceResponse, DomainResponse, NonceResponse},
	withdrawal::{submit_withdrawal, verify_withdrawal},
};
use axum::{
	extract::{rejection::JsonRejection, Path, State},
	response::Json,
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use vault_config::ApiConfig;
use vault_core::{Remediation, Vault};
use vault_types::{APIError, SigningRequest, WithdrawalReceipt, WithdrawalRequest};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub vault: Arc<Vault>,
}

/// Builds the router with every endpoint under `/api`.
pub fn router(vault: Arc<Vault>) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/authorizations", post(handle_issue_authorization))
				.route("/withdrawals", post(handle_withdraw))
				.route("/withdrawals/verify", post(handle_verify_withdrawal))
				.route("/nonces/{address}", get(handle_get_nonce))
				.route("/balance", get(handle_get_balance))
				.route("/domain", get(handle_get_domain)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(AppState { vault })
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	vault: Arc<Vault>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(vault);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Vault relayer API starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Unwraps a JSON body. Bodies that fail to parse, including ones carrying
/// fields the endpoint does not accept, become a 400 in the API error shape.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, APIError> {
	payload.map(|Json(body)| body).map_err(|rejection| {
		tracing::warn!("Rejected request body: {}", rejection.body_text());
		APIError::BadRequest {
			error_type: "INVALID_REQUEST".to_string(),
			message: rejection.body_text(),
			remediation: Remediation::FixRequest.to_string(),
		}
	})
}

/// Handles POST /api/authorizations requests.
async fn handle_issue_authorization(
	State(state): State<AppState>,
	payload: Result<Json<IssueAuthorizationRequest>, JsonRejection>,
) -> Result<Json<SigningRequest>, APIError> {
	let request = json_body(payload)?;
	match issue_authorization(request, &state.vault).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Authorization request failed: {}", e);
			Err(e)
		},
	}
}

/// Handles POST /api/withdrawals requests.
///
/// The verifier already logs rejections with their code.
async fn handle_withdraw(
	State(state): State<AppState>,
	payload: Result<Json<WithdrawalRequest>, JsonRejection>,
) -> Result<Json<WithdrawalReceipt>, APIError> {
	let request = json_body(payload)?;
	submit_withdrawal(request, &state.vault).await.map(Json)
}

/// Handles POST /api/withdrawals/verify requests.
async fn handle_verify_withdrawal(
	State(state): State<AppState>,
	payload: Result<Json<WithdrawalRequest>, JsonRejection>,
) -> Result<Json<WithdrawalReceipt>, APIError> {
	let request = json_body(payload)?;
	match verify_withdrawal(request, &state.vault).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::debug!("Withdrawal dry run rejected: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/nonces/{address} requests.
async fn handle_get_nonce(
	Path(address): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<NonceResponse>, APIError> {
	match get_nonce(&address, &state.vault).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Nonce lookup failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/balance requests.
async fn handle_get_balance(
	State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, APIError> {
	get_balance(&state.vault).await.map(Json)
}

/// Handles GET /api/domain requests.
async fn handle_get_domain(State(state): State<AppState>) -> Json<DomainResponse> {
	Json(get_domain(&state.vault))
}
