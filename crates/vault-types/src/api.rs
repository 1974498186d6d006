//! API error types for the relayer HTTP endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error kind, e.g. `EXPIRED_AUTHORIZATION`.
	pub error: String,
	/// Human-readable description.
	pub message: String,
	/// What the client should do next, e.g. `re_sign`.
	pub remediation: String,
}

/// API error with its HTTP classification.
#[derive(Debug)]
pub enum APIError {
	/// Malformed input (400).
	BadRequest {
		error_type: String,
		message: String,
		remediation: String,
	},
	/// Signature did not authorize the withdrawal (401).
	Unauthorized {
		error_type: String,
		message: String,
		remediation: String,
	},
	/// Authorization already consumed or raced (409).
	Conflict {
		error_type: String,
		message: String,
		remediation: String,
	},
	/// Authorization expired (410).
	Gone {
		error_type: String,
		message: String,
		remediation: String,
	},
	/// Request was valid but could not be carried out (422).
	UnprocessableEntity {
		error_type: String,
		message: String,
		remediation: String,
	},
	/// Internal server error (500).
	InternalServerError {
		error_type: String,
		message: String,
		remediation: String,
	},
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::Conflict { .. } => 409,
			APIError::Gone { .. } => 410,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (APIError::BadRequest {
			error_type,
			message,
			remediation,
		}
		| APIError::Unauthorized {
			error_type,
			message,
			remediation,
		}
		| APIError::Conflict {
			error_type,
			message,
			remediation,
		}
		| APIError::Gone {
			error_type,
			message,
			remediation,
		}
		| APIError::UnprocessableEntity {
			error_type,
			message,
			remediation,
		}
		| APIError::InternalServerError {
			error_type,
			message,
			remediation,
		}) = self;

		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
			remediation: remediation.clone(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({}): {}", response.error, self.status_code(), response.message)
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
