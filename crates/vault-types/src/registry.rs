//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable module (storage backends, account signers) provides a
/// `Registry` struct implementing this trait so that it can be selected by
/// name from configuration.
pub trait ImplementationRegistry {
	/// Name used in configuration, e.g. `"memory"` for
	/// `storage.implementations.memory`.
	const NAME: &'static str;

	/// Factory function type this implementation provides.
	type Factory;

	/// Returns the factory that builds this implementation from its config table.
	fn factory() -> Self::Factory;
}
