//! Test-mode registration front-end
//!
//! [`MockBuilder`] wraps a child [`Builder`] with rules suited to composing
//! modules in tests:
//!
//! - In plain mock mode an inherited registration is skipped when an ancestor
//!   already provides the key, so production values registered higher up win.
//! - In override mode (the closure passed to `Container::build_child_mocked`)
//!   every registration is applied and replaces whatever is there.
//! - [`MockBuilder::import_dependencies`] merges another module's mock
//!   registrations, first-in-wins.
//!
//! After registration the module's requirements and inputs are checked once.
//! Optional requirements are included when the module has a mock registration. Missing entries panic unless
//! [`MockBuilder::suppress_missing_requirement_assertions`] was called.

use crate::builder::{AffinityBinding, Binding, Builder, PendingRegistration, RegistrationSink};
use crate::container::Container;
use crate::error::DiResult;
use crate::key::{Discriminator, Key, TypeIdentity};
use crate::module::Module;
use crate::scope::Locality;
use crate::settings::Mode;
use std::borrow::Cow;
use std::collections::HashSet;
use std::panic::Location;

pub struct MockBuilder<'a> {
	builder: &'a mut Builder,
	override_mode: bool,
}

impl<'a> MockBuilder<'a> {
	pub(crate) fn new(builder: &'a mut Builder) -> Self {
		Self {
			builder,
			override_mode: false,
		}
	}

	pub(crate) fn overriding(builder: &'a mut Builder) -> Self {
		Self {
			builder,
			override_mode: true,
		}
	}

	/// Whether an inherited registration of `key` would be applied.
	pub fn should_register(&self, key: &Key) -> bool {
		self.override_mode || !self.builder.parent_provides(key)
	}

	pub fn is_override_mode(&self) -> bool {
		self.override_mode
	}

	pub fn parent(&self) -> Option<&Container> {
		self.builder.parent()
	}

	#[track_caller]
	pub fn bind<T: Send + Sync + 'static>(&mut self) -> Binding<'_, T> {
		Binding::new(self, Location::caller())
	}

	#[track_caller]
	pub fn bind_affinity<T: 'static>(&mut self) -> AffinityBinding<'_, T> {
		AffinityBinding::new(self, Location::caller())
	}

	#[track_caller]
	pub fn transient<T>(
		&mut self,
		factory: impl Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	) -> DiResult<()>
	where
		T: Send + Sync + 'static,
	{
		self.bind::<T>().transient(factory)
	}

	#[track_caller]
	pub fn singleton<T>(
		&mut self,
		factory: impl Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	) -> DiResult<()>
	where
		T: Send + Sync + 'static,
	{
		self.bind::<T>().singleton(factory)
	}

	#[track_caller]
	pub fn scoped<T>(
		&mut self,
		factory: impl Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	) -> DiResult<()>
	where
		T: Send + Sync + 'static,
	{
		self.bind::<T>().scoped(factory)
	}

	#[track_caller]
	pub fn provide_input<T: Send + Sync + 'static>(&mut self, value: T) {
		self.builder.provide_input(value);
	}

	#[track_caller]
	pub fn provide_input_keyed<T: Send + Sync + 'static>(
		&mut self,
		discriminator: impl Into<Discriminator>,
		value: T,
	) {
		self.builder.provide_input_keyed(discriminator, value);
	}

	/// Merges the inherited registrations of module `X`'s mock registration
	/// into this builder. Keys already present are left untouched, as are keys
	/// [`should_register`](Self::should_register) rejects.
	pub fn import_dependencies<X: Module>(&mut self) -> DiResult<()> {
		let module = TypeIdentity::of::<X>().short_name();
		let mut scratch = Builder::new(
			self.builder.settings().clone().with_mode(Mode::Testing),
			self.builder.affinity_thread(),
			None,
			Cow::Owned(format!("import {module}")),
		);
		run_mock_registration::<X>(&mut scratch)?;
		let skipped: HashSet<Key> = scratch
			.exported_keys()
			.into_iter()
			.filter(|key| !self.should_register(key))
			.collect();
		let exported = self.builder.merge_imported(scratch, &skipped);
		tracing::debug!(
			module = %module,
			into = %self.builder.label(),
			exported = exported.len(),
			skipped = skipped.len(),
			"imported mock dependencies"
		);
		self.builder.mock.imported_keys.extend(exported);
		Ok(())
	}

	/// Report missing requirements as warnings instead of panicking.
	pub fn suppress_missing_requirement_assertions(&mut self) {
		self.builder.mock.suppress_missing = true;
	}

	pub fn explicit_keys(&self) -> &HashSet<Key> {
		&self.builder.mock.explicit_keys
	}

	pub fn imported_keys(&self) -> &HashSet<Key> {
		&self.builder.mock.imported_keys
	}

	/// Explicit registrations an import already supplies.
	pub fn redundant_registrations(&self) -> Vec<Key> {
		redundant_keys(self.builder)
	}
}

impl RegistrationSink for MockBuilder<'_> {
	fn accept(&mut self, mut registration: PendingRegistration) -> DiResult<()> {
		let key = registration.key.clone();
		if registration.locality == Locality::Inherited && !self.should_register(&key) {
			tracing::debug!(
				key = %key,
				container = %self.builder.label(),
				"skipping mock registration; an ancestor already provides it"
			);
			return Ok(());
		}
		if self.override_mode || self.builder.is_imported(&key) {
			registration.overriding = true;
		}
		self.builder.accept(registration)?;
		self.builder.mock.explicit_keys.insert(key);
		Ok(())
	}
}

impl std::fmt::Debug for MockBuilder<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MockBuilder")
			.field("builder", &self.builder)
			.field("override_mode", &self.override_mode)
			.finish()
	}
}

fn redundant_keys(builder: &Builder) -> Vec<Key> {
	let mut keys: Vec<Key> = builder
		.mock
		.explicit_keys
		.intersection(&builder.mock.imported_keys)
		.cloned()
		.collect();
	keys.sort_by_key(|key| key.to_string());
	keys
}

/// Runs `M`'s mock registration, or its production registration when the
/// module has none.
fn run_mock_registration<M: Module>(builder: &mut Builder) -> DiResult<()> {
	if M::MOCKABLE {
		return M::mock_registration(&mut MockBuilder::new(builder));
	}
	tracing::warn!(
		module = %TypeIdentity::of::<M>().short_name(),
		"module has no mock registration; falling back to production registration"
	);
	M::register_dependencies(builder)
}

/// Mock composition of module `M` into `builder`: mock registration, then the
/// override closure, then one coverage check.
///
/// Modules that are not [`Module::MOCKABLE`] skip their optional requirements
/// in that check.
pub(crate) fn compose<M, O>(mut builder: Builder, overrides: Option<O>) -> DiResult<Container>
where
	M: Module,
	O: FnOnce(&mut MockBuilder<'_>) -> DiResult<()>,
{
	run_mock_registration::<M>(&mut builder)?;
	if let Some(overrides) = overrides {
		overrides(&mut MockBuilder::overriding(&mut builder))?;
	}

	// Optional requirements are enforced only against a mock registration;
	// the production fallback is validated like an ordinary freeze.
	let problems = builder.missing_requirements(&M::requirements(), M::MOCKABLE);
	if !problems.is_empty() {
		let report = builder.missing_report(&problems);
		if !builder.mock.suppress_missing {
			panic!("{report}");
		}
		tracing::warn!(container = %builder.label(), "{report}");
	}

	let redundant = redundant_keys(&builder);
	if !redundant.is_empty() {
		let keys: Vec<String> = redundant.iter().map(Key::to_string).collect();
		tracing::info!(
			container = %builder.label(),
			keys = %keys.join(", "),
			"redundant explicit registration: already supplied by an import"
		);
	}

	Ok(builder.freeze_unchecked())
}
