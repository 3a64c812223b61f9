//! Registry trait for name-registered implementations.

/// Base trait for implementation registries.
///
/// Each pluggable boundary implementation provides a `Registry` type that
/// names it for configuration (for example `api.implementations.http`) and
/// hands out its factory function.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
