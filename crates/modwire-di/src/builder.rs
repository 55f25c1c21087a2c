//! Registration phase: the mutable [`Builder`] and its binding front-end
//!
//! A builder owns four factory stores (inherited/local x default/affinity),
//! the input map and per-key metadata. It is consumed by [`Builder::freeze`],
//! which validates a module's [`RequirementSet`] and produces an immutable
//! [`Container`].
//!
//! ```
//! use modwire_di::{RequirementSet, Root};
//!
//! struct Config(&'static str);
//! struct Greeter(String);
//!
//! let mut builder = Root::production().builder();
//! builder.singleton::<Config>(|_| Ok(Config("prod")))?;
//! builder.bind::<Greeter>().local().transient(|c| {
//! 	let config = c.resolve::<Config>()?;
//! 	Ok(Greeter(format!("hello from {}", config.0)))
//! })?;
//!
//! let container = builder.freeze(&RequirementSet::new().require::<Config>().local::<Greeter>());
//! assert_eq!(container.resolve::<Greeter>()?.0, "hello from prod");
//! # Ok::<(), modwire_di::DiError>(())
//! ```

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::factory::{AffinityFactory, Factory};
use crate::key::{Discriminator, Domain, Key, TypeIdentity};
use crate::metadata::RegistrationMetadata;
use crate::registry::Registry;
use crate::requirement::RequirementSet;
use crate::scope::{Locality, Scope};
use crate::settings::{ContainerSettings, Mode, ShadowingPolicy};
use std::borrow::Cow;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::panic::Location;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Entry point for building the root of a container tree.
///
/// There is no ambient global container: the application constructs a `Root`
/// once and passes the resulting container down.
#[derive(Debug, Clone)]
pub struct Root {
	settings: ContainerSettings,
	affinity_thread: ThreadId,
}

impl Root {
	pub fn production() -> Self {
		Self::with_settings(ContainerSettings::production())
	}

	pub fn testing() -> Self {
		Self::with_settings(ContainerSettings::testing())
	}

	/// The calling thread becomes the designated affinity thread.
	pub fn with_settings(settings: ContainerSettings) -> Self {
		Self {
			settings,
			affinity_thread: thread::current().id(),
		}
	}

	pub fn with_affinity_thread(mut self, thread: ThreadId) -> Self {
		self.affinity_thread = thread;
		self
	}

	pub fn settings(&self) -> &ContainerSettings {
		&self.settings
	}

	pub fn affinity_thread(&self) -> ThreadId {
		self.affinity_thread
	}

	pub fn builder(&self) -> Builder {
		Builder::new(
			self.settings.clone(),
			self.affinity_thread,
			None,
			Cow::Borrowed("root"),
		)
	}
}

/// Bookkeeping used by mock composition.
#[derive(Debug, Default)]
pub(crate) struct MockState {
	pub(crate) explicit_keys: HashSet<Key>,
	pub(crate) imported_keys: HashSet<Key>,
	pub(crate) suppress_missing: bool,
}

pub(crate) enum AnyFactory {
	Shared(Factory),
	Affinity(AffinityFactory),
}

impl AnyFactory {
	fn scope(&self) -> Scope {
		match self {
			AnyFactory::Shared(factory) => factory.scope(),
			AnyFactory::Affinity(factory) => factory.scope(),
		}
	}
}

/// A fully described registration on its way into a builder.
pub(crate) struct PendingRegistration {
	pub(crate) key: Key,
	pub(crate) locality: Locality,
	pub(crate) overriding: bool,
	pub(crate) factory: AnyFactory,
	pub(crate) metadata: RegistrationMetadata,
}

/// Something bindings can deliver registrations to.
pub(crate) trait RegistrationSink {
	fn accept(&mut self, registration: PendingRegistration) -> DiResult<()>;
}

/// Mutable registration-phase state. Not `Send`: build it up on one thread and
/// freeze it.
pub struct Builder {
	registry: Registry,
	parent: Option<Container>,
	settings: ContainerSettings,
	affinity_thread: ThreadId,
	label: Cow<'static, str>,
	pub(crate) mock: MockState,
	_not_send: PhantomData<Rc<()>>,
}

impl Builder {
	pub(crate) fn new(
		settings: ContainerSettings,
		affinity_thread: ThreadId,
		parent: Option<Container>,
		label: Cow<'static, str>,
	) -> Self {
		Self {
			registry: Registry::default(),
			parent,
			settings,
			affinity_thread,
			label,
			mock: MockState::default(),
			_not_send: PhantomData,
		}
	}

	/// Builder parented to `parent`, seeded with its inputs.
	pub(crate) fn child_of(parent: &Container, label: Cow<'static, str>) -> Self {
		let mut builder = Self::new(
			parent.settings().clone(),
			parent.affinity_thread(),
			Some(parent.clone()),
			label,
		);
		let (inputs, input_metadata) = parent.input_snapshot();
		builder.registry.inputs = inputs;
		builder.registry.input_metadata = input_metadata;
		builder
	}

	pub fn mode(&self) -> Mode {
		self.settings.mode
	}

	pub fn settings(&self) -> &ContainerSettings {
		&self.settings
	}

	pub fn parent(&self) -> Option<&Container> {
		self.parent.as_ref()
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub(crate) fn affinity_thread(&self) -> ThreadId {
		self.affinity_thread
	}

	/// Starts a default-domain registration of `T`.
	#[track_caller]
	pub fn bind<T: Send + Sync + 'static>(&mut self) -> Binding<'_, T> {
		Binding::new(self, Location::caller())
	}

	/// Starts an affinity-domain registration of `T`.
	#[track_caller]
	pub fn bind_affinity<T: 'static>(&mut self) -> AffinityBinding<'_, T> {
		AffinityBinding::new(self, Location::caller())
	}

	/// Registers an inherited, unkeyed transient factory.
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

	/// Registers an inherited, unkeyed singleton factory.
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

	/// Registers an inherited, unkeyed scoped factory.
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

	/// Stores an input value; the last write for a key wins.
	#[track_caller]
	pub fn provide_input<T: Send + Sync + 'static>(&mut self, value: T) {
		self.insert_input(Key::of::<T>(), Arc::new(value), Location::caller());
	}

	#[track_caller]
	pub fn provide_input_keyed<T: Send + Sync + 'static>(
		&mut self,
		discriminator: impl Into<Discriminator>,
		value: T,
	) {
		self.insert_input(
			Key::keyed::<T>(discriminator),
			Arc::new(value),
			Location::caller(),
		);
	}

	fn insert_input(
		&mut self,
		key: Key,
		value: Arc<dyn std::any::Any + Send + Sync>,
		location: &'static Location<'static>,
	) {
		tracing::trace!(key = %key, container = %self.label, "input provided");
		self.registry
			.input_metadata
			.insert(key.clone(), RegistrationMetadata::input(location));
		self.registry.inputs.insert(key, value);
	}

	/// True when this builder itself holds a registration for `key` in either locality.
	pub fn contains(&self, key: &Key) -> bool {
		self.registry.contains(key)
	}

	pub fn contains_input(&self, key: &Key) -> bool {
		self.registry.inputs.contains_key(key)
	}

	/// Whether `key` would resolve on the frozen container from the given
	/// locality's point of view.
	///
	/// Local keys are only looked up in the local stores; inherited keys in the
	/// inherited stores and then up the parent chain.
	pub fn can_resolve(&self, key: &Key, locality: Locality) -> bool {
		match locality {
			Locality::Local => self.registry.local.contains(key),
			Locality::Inherited => self.registry.inherited.contains(key) || self.parent_provides(key),
		}
	}

	pub(crate) fn parent_provides(&self, key: &Key) -> bool {
		self.parent
			.as_ref()
			.is_some_and(|parent| parent.provides_inherited(key))
	}

	fn check_shadowing(&self, key: &Key, locality: Locality) {
		if self.settings.shadowing == ShadowingPolicy::Ignore || !self.parent_provides(key) {
			return;
		}
		tracing::warn!(
			key = %key,
			locality = %locality,
			container = %self.label,
			"registration shadows a dependency already provided by an ancestor; use `.overriding()` if this is intended"
		);
		if self.settings.shadowing == ShadowingPolicy::Deny && cfg!(debug_assertions) {
			panic!(
				"{key} registered in {} shadows a dependency provided by an ancestor container",
				self.label
			);
		}
	}

	/// Validates `requirements` and freezes the builder.
	///
	/// # Panics
	///
	/// Panics if an input requirement or a non-optional requirement is not
	/// resolvable. Composition errors are programmer mistakes and must not
	/// survive to resolution time.
	pub fn freeze(self, requirements: &RequirementSet) -> Container {
		match self.try_freeze(requirements) {
			Ok(container) => container,
			Err(error) => panic!("{error}"),
		}
	}

	/// Like [`Builder::freeze`], but returns [`DiError::MissingRequirements`]
	/// instead of panicking.
	pub fn try_freeze(self, requirements: &RequirementSet) -> DiResult<Container> {
		let problems = self.missing_requirements(requirements, false);
		if !problems.is_empty() {
			return Err(DiError::MissingRequirements(self.missing_report(&problems)));
		}
		Ok(self.freeze_unchecked())
	}

	/// Freezes without validating any requirements.
	pub fn freeze_unchecked(self) -> Container {
		tracing::debug!(
			container = %self.label,
			local = self.registry.local.len(),
			inherited = self.registry.inherited.len(),
			inputs = self.registry.inputs.len(),
			"freezing container"
		);
		Container::from_parts(
			self.registry,
			self.parent,
			self.settings,
			self.affinity_thread,
			self.label,
		)
	}

	/// Unresolvable requirements, one human-readable line each.
	///
	/// Inputs are checked first. With `include_optional`, optional requirements
	/// are treated as mandatory (mock coverage checks).
	pub(crate) fn missing_requirements(
		&self,
		requirements: &RequirementSet,
		include_optional: bool,
	) -> Vec<String> {
		let mut problems = Vec::new();
		for input in requirements.input_requirements() {
			if !self.registry.inputs.contains_key(input.key()) {
				problems.push(format!(
					"missing input {} ({})",
					input.key(),
					input.description()
				));
			}
		}
		for (locality, requirement) in requirements.iter() {
			if (requirement.is_optional() && !include_optional)
				|| self.can_resolve(requirement.key(), locality)
			{
				continue;
			}
			let mut line = format!(
				"missing {locality} requirement {} ({})",
				requirement.key(),
				requirement.description()
			);
			let alternatives = self.alternatives_for(requirement.key().type_identity());
			if !alternatives.is_empty() {
				line.push_str(&format!(
					"; registrations of the same type: {}",
					alternatives.join(", ")
				));
			}
			problems.push(line);
		}
		problems
	}

	pub(crate) fn missing_report(&self, problems: &[String]) -> String {
		format!(
			"cannot freeze container for {}: {} unresolved requirement(s)\n  - {}",
			self.label,
			problems.len(),
			problems.join("\n  - ")
		)
	}

	fn alternatives_for(&self, type_identity: TypeIdentity) -> Vec<String> {
		let mut alternatives = self.registry.describe_type(
			type_identity,
			&self.label,
			&[Locality::Inherited, Locality::Local],
		);
		alternatives.extend(self.registry.describe_inputs(type_identity, &self.label));
		if let Some(parent) = &self.parent {
			alternatives.extend(parent.describe_type_in_chain(type_identity));
		}
		alternatives.sort();
		alternatives
	}

	/// Keys of the inherited registrations, both domains.
	pub(crate) fn exported_keys(&self) -> Vec<Key> {
		self.registry.inherited.keys().cloned().collect()
	}

	/// Merges another builder's inherited registrations, keeping entries this
	/// builder already has and leaving out `skipped`. Returns every key the
	/// other builder exported.
	pub(crate) fn merge_imported(&mut self, other: Builder, skipped: &HashSet<Key>) -> Vec<Key> {
		let exported = other.exported_keys();
		let Builder {
			registry: mut imported,
			..
		} = other;
		let partition = std::mem::take(&mut imported.inherited);
		for (key, factory) in partition.shared.iter() {
			if !skipped.contains(key)
				&& self
					.registry
					.inherited
					.shared
					.insert_if_absent(key.clone(), factory.clone())
			{
				self.record_imported_metadata(key, &mut imported);
			}
		}
		for (key, factory) in partition.affinity.iter() {
			if !skipped.contains(key)
				&& self
					.registry
					.inherited
					.affinity
					.insert_if_absent(key.clone(), factory.clone())
			{
				self.record_imported_metadata(key, &mut imported);
			}
		}
		exported
	}

	fn record_imported_metadata(&mut self, key: &Key, imported: &mut Registry) {
		let slot = (Locality::Inherited, key.clone());
		if let Some(metadata) = imported.metadata.remove(&slot) {
			self.registry.metadata.insert(slot, metadata.imported());
		}
	}

	pub(crate) fn is_imported(&self, key: &Key) -> bool {
		self.mock.imported_keys.contains(key)
	}
}

impl RegistrationSink for Builder {
	fn accept(&mut self, registration: PendingRegistration) -> DiResult<()> {
		let PendingRegistration {
			key,
			locality,
			overriding,
			factory,
			metadata,
		} = registration;

		let partition = self.registry.partition(locality);
		if !overriding && partition.contains(&key) {
			return Err(DiError::RegistrationExists {
				key: key.to_string(),
			});
		}
		if !overriding {
			self.check_shadowing(&key, locality);
		}

		let scope = factory.scope();
		let partition = self.registry.partition_mut(locality);
		match factory {
			AnyFactory::Shared(factory) => partition.shared.insert(key.clone(), factory, overriding)?,
			AnyFactory::Affinity(factory) => {
				partition.affinity.insert(key.clone(), factory, overriding)?
			}
		}
		tracing::trace!(
			key = %key,
			scope = %scope,
			locality = %locality,
			overriding,
			container = %self.label,
			"registered dependency"
		);
		self.registry.metadata.insert((locality, key), metadata);
		Ok(())
	}
}

impl std::fmt::Debug for Builder {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Builder")
			.field("label", &self.label)
			.field("mode", &self.settings.mode)
			.field("local", &self.registry.local.len())
			.field("inherited", &self.registry.inherited.len())
			.field("inputs", &self.registry.inputs.len())
			.field("has_parent", &self.parent.is_some())
			.finish()
	}
}

/// Fields shared by both binding kinds.
struct BindingOptions {
	discriminator: Option<Discriminator>,
	locality: Locality,
	overriding: bool,
	description: Option<Cow<'static, str>>,
	location: &'static Location<'static>,
}

impl BindingOptions {
	fn new(location: &'static Location<'static>) -> Self {
		Self {
			discriminator: None,
			locality: Locality::Inherited,
			overriding: false,
			description: None,
			location,
		}
	}

	fn pending(self, type_identity: TypeIdentity, domain: Domain, factory: AnyFactory) -> PendingRegistration {
		let metadata = RegistrationMetadata::registration(
			factory.scope(),
			self.locality,
			self.location,
			self.description,
		);
		PendingRegistration {
			key: Key::from_parts(type_identity, self.discriminator, domain),
			locality: self.locality,
			overriding: self.overriding,
			factory,
			metadata,
		}
	}
}

/// Default-domain registration in progress.
///
/// Nothing is registered until one of the scope terminals
/// ([`transient`](Self::transient), [`singleton`](Self::singleton),
/// [`scoped`](Self::scoped)) is called.
#[must_use = "a binding registers nothing until a scope terminal such as `.singleton(..)` is called"]
pub struct Binding<'b, T> {
	sink: &'b mut dyn RegistrationSink,
	options: BindingOptions,
	_marker: PhantomData<fn() -> T>,
}

impl<'b, T: Send + Sync + 'static> Binding<'b, T> {
	pub(crate) fn new(sink: &'b mut dyn RegistrationSink, location: &'static Location<'static>) -> Self {
		Self {
			sink,
			options: BindingOptions::new(location),
			_marker: PhantomData,
		}
	}

	pub fn keyed(mut self, discriminator: impl Into<Discriminator>) -> Self {
		self.options.discriminator = Some(discriminator.into());
		self
	}

	/// Restricts visibility to the declaring container.
	pub fn local(mut self) -> Self {
		self.options.locality = Locality::Local;
		self
	}

	/// Replaces an existing registration of the same key instead of failing.
	pub fn overriding(mut self) -> Self {
		self.options.overriding = true;
		self
	}

	pub fn described(mut self, description: impl Into<Cow<'static, str>>) -> Self {
		self.options.description = Some(description.into());
		self
	}

	pub fn transient<F>(self, factory: F) -> DiResult<()>
	where
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		self.with_scope(Scope::Transient, factory)
	}

	pub fn singleton<F>(self, factory: F) -> DiResult<()>
	where
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		self.with_scope(Scope::Singleton, factory)
	}

	pub fn scoped<F>(self, factory: F) -> DiResult<()>
	where
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		self.with_scope(Scope::Scoped, factory)
	}

	pub fn with_scope<F>(self, scope: Scope, factory: F) -> DiResult<()>
	where
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		let factory = AnyFactory::Shared(Factory::from_fn(scope, factory));
		let pending = self
			.options
			.pending(TypeIdentity::of::<T>(), Domain::Default, factory);
		self.sink.accept(pending)
	}
}

/// Affinity-domain registration in progress.
///
/// Produced values stay on the container's affinity thread and need not be
/// `Send` or `Sync`; the factory closure itself must be.
#[must_use = "a binding registers nothing until a scope terminal such as `.singleton(..)` is called"]
pub struct AffinityBinding<'b, T> {
	sink: &'b mut dyn RegistrationSink,
	options: BindingOptions,
	_marker: PhantomData<fn() -> T>,
}

impl<'b, T: 'static> AffinityBinding<'b, T> {
	pub(crate) fn new(sink: &'b mut dyn RegistrationSink, location: &'static Location<'static>) -> Self {
		Self {
			sink,
			options: BindingOptions::new(location),
			_marker: PhantomData,
		}
	}

	pub fn keyed(mut self, discriminator: impl Into<Discriminator>) -> Self {
		self.options.discriminator = Some(discriminator.into());
		self
	}

	pub fn local(mut self) -> Self {
		self.options.locality = Locality::Local;
		self
	}

	pub fn overriding(mut self) -> Self {
		self.options.overriding = true;
		self
	}

	pub fn described(mut self, description: impl Into<Cow<'static, str>>) -> Self {
		self.options.description = Some(description.into());
		self
	}

	pub fn transient<F>(self, factory: F) -> DiResult<()>
	where
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		self.with_scope(Scope::Transient, factory)
	}

	pub fn singleton<F>(self, factory: F) -> DiResult<()>
	where
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		self.with_scope(Scope::Singleton, factory)
	}

	pub fn scoped<F>(self, factory: F) -> DiResult<()>
	where
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		self.with_scope(Scope::Scoped, factory)
	}

	pub fn with_scope<F>(self, scope: Scope, factory: F) -> DiResult<()>
	where
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		let factory = AnyFactory::Affinity(AffinityFactory::from_fn(scope, factory));
		let pending = self
			.options
			.pending(TypeIdentity::of::<T>(), Domain::Affinity, factory);
		self.sink.accept(pending)
	}
}
