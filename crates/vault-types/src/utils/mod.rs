//! Utility functions for hashing, serialization and formatting.

pub mod eip712;
pub mod formatting;
pub mod u256_serde;

pub use eip712::{compute_final_digest, Eip712AbiEncoder, DOMAIN_TYPE, WITHDRAW_TYPE};
pub use formatting::{truncate_id, without_0x_prefix};
