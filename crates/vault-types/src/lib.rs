//! Common types module for the gasless vault system.
//!
//! This module defines the data types shared by the issuer, the verifier and the
//! relayer service. Keeping them in one crate guarantees that every party builds
//! the withdrawal message from the same definitions.

/// API error types for the relayer HTTP endpoints.
pub mod api;
/// EIP-712 domain descriptor.
pub mod domain;
/// Event types published by the vault.
pub mod events;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secure string wrapper for key material.
pub mod secret_string;
/// Storage namespaces.
pub mod storage;
/// Utility functions for hashing and formatting.
pub mod utils;
/// Configuration validation types.
pub mod validation;
/// Withdrawal message, redemption request and signing request types.
pub mod withdrawal;

pub use alloy_primitives::{Address, B256, U256};
pub use api::*;
pub use domain::Eip712Domain;
pub use events::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{truncate_id, without_0x_prefix};
pub use validation::*;
pub use withdrawal::*;
