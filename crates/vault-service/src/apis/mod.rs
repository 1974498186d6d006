//! Relayer API implementations.

pub mod authorization;
pub mod vault;
pub mod withdrawal;
