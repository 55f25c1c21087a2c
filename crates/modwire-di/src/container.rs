//! Frozen containers and the resolution algorithm
//!
//! A [`Container`] is an immutable snapshot of a [`Builder`]: the only state
//! that changes after freezing is the memoization in its caches. Containers
//! are cheap to clone and can be resolved against from any thread, except for
//! affinity-domain keys, which are confined to the designated thread.
//!
//! ## Resolution order
//!
//! 1. Local stores of this container (never visible to children)
//! 2. Inherited stores of this container
//! 3. Inherited stores of each ancestor, nearest first
//!
//! The factory runs with the container whose store matched, and memoized
//! values live in that container's caches.

use crate::builder::Builder;
use crate::cycle_detection::{ResolutionGuard, ResolutionNode, begin_resolution};
use crate::diagnostics::Diagnostics;
use crate::error::{DiError, DiResult};
use crate::factory::{AffinityFactory, ErasedFactory, Factory, FactoryStore};
use crate::key::{Discriminator, Domain, Key, TypeIdentity};
use crate::metadata::RegistrationMetadata;
use crate::mock::{self, MockBuilder};
use crate::module::{Component, Module};
use crate::registry::{Partition, Registry};
use crate::scope::{LocalValue, Locality, Scope, ScopeCaches, SharedValue};
use crate::settings::{ContainerSettings, Mode};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

struct ContainerInner {
	registry: Registry,
	parent: Option<Container>,
	settings: ContainerSettings,
	affinity_thread: ThreadId,
	depth: usize,
	label: Cow<'static, str>,
}

/// Immutable, shareable result of freezing a [`Builder`].
#[derive(Clone)]
pub struct Container {
	inner: Arc<ContainerInner>,
	/// Replaced by [`Container::new_scope`].
	scoped: Arc<ScopeCaches>,
	/// Shared with every `new_scope` sibling.
	singletons: Arc<ScopeCaches>,
}

impl Container {
	pub(crate) fn from_parts(
		registry: Registry,
		parent: Option<Container>,
		settings: ContainerSettings,
		affinity_thread: ThreadId,
		label: Cow<'static, str>,
	) -> Self {
		let depth = parent.as_ref().map_or(0, |parent| parent.depth() + 1);
		Self {
			inner: Arc::new(ContainerInner {
				registry,
				parent,
				settings,
				affinity_thread,
				depth,
				label,
			}),
			scoped: Arc::new(ScopeCaches::new(affinity_thread)),
			singletons: Arc::new(ScopeCaches::new(affinity_thread)),
		}
	}

	// Default domain

	/// Resolves the unkeyed default-domain registration of `T`.
	pub fn resolve<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
		self.resolve_by_key(&Key::of::<T>())
	}

	pub fn resolve_keyed<T: Send + Sync + 'static>(
		&self,
		discriminator: impl Into<Discriminator>,
	) -> DiResult<Arc<T>> {
		self.resolve_by_key(&Key::keyed::<T>(discriminator))
	}

	/// Resolves `key` and downcasts the stored value to `T`.
	///
	/// # Errors
	///
	/// - `ResolutionFailed(WrongDomain)` if `key` is an affinity-domain key
	/// - `ResolutionFailed(NotFound)` if nothing in the chain provides `key`
	/// - `ResolutionFailed(TypeMismatch)` if the stored value is not a `T`
	pub fn resolve_by_key<T: Send + Sync + 'static>(&self, key: &Key) -> DiResult<Arc<T>> {
		if key.domain() != Domain::Default {
			return Err(DiError::wrong_domain(key, Domain::Default));
		}
		self.resolve_shared(key)?
			.downcast::<T>()
			.map_err(|_| DiError::type_mismatch(key, std::any::type_name::<T>()))
	}

	fn resolve_shared(&self, key: &Key) -> DiResult<SharedValue> {
		let Some((owner, locality, factory)) = self.locate(key, |partition| &partition.shared) else {
			return Err(self.not_found(key));
		};
		let _guard = self.enter(owner, locality, key)?;
		owner.produce_shared(locality, key, factory)
	}

	fn produce_shared(&self, locality: Locality, key: &Key, factory: &Factory) -> DiResult<SharedValue> {
		let construct = || {
			tracing::trace!(key = %key, scope = %factory.scope(), container = %self.inner.label, "constructing dependency");
			factory.produce(self)
		};
		match factory.scope() {
			Scope::Transient => construct(),
			Scope::Singleton => self
				.singletons
				.shared
				.get_or_try_init((locality, key.clone()), construct),
			Scope::Scoped => self
				.scoped
				.shared
				.get_or_try_init((locality, key.clone()), construct),
		}
	}

	// Affinity domain

	/// Resolves the unkeyed affinity-domain registration of `T`.
	///
	/// Must be called on the container's affinity thread.
	pub fn resolve_affinity<T: 'static>(&self) -> DiResult<Rc<T>> {
		self.resolve_affinity_by_key(&Key::of::<T>().with_domain(Domain::Affinity))
	}

	pub fn resolve_affinity_keyed<T: 'static>(
		&self,
		discriminator: impl Into<Discriminator>,
	) -> DiResult<Rc<T>> {
		self.resolve_affinity_by_key(&Key::keyed::<T>(discriminator).with_domain(Domain::Affinity))
	}

	pub fn resolve_affinity_by_key<T: 'static>(&self, key: &Key) -> DiResult<Rc<T>> {
		if key.domain() != Domain::Affinity {
			return Err(DiError::wrong_domain(key, Domain::Affinity));
		}
		if thread::current().id() != self.inner.affinity_thread {
			return Err(DiError::AffinityViolation {
				key: key.to_string(),
			});
		}
		self.resolve_local(key)?
			.downcast::<T>()
			.map_err(|_| DiError::type_mismatch(key, std::any::type_name::<T>()))
	}

	fn resolve_local(&self, key: &Key) -> DiResult<LocalValue> {
		let Some((owner, locality, factory)) = self.locate(key, |partition| &partition.affinity) else {
			return Err(self.not_found(key));
		};
		let _guard = self.enter(owner, locality, key)?;
		owner.produce_affinity(locality, key, factory)
	}

	fn produce_affinity(
		&self,
		locality: Locality,
		key: &Key,
		factory: &AffinityFactory,
	) -> DiResult<LocalValue> {
		let construct = || {
			tracing::trace!(key = %key, scope = %factory.scope(), container = %self.inner.label, "constructing affinity dependency");
			factory.produce(self)
		};
		match factory.scope() {
			Scope::Transient => construct(),
			Scope::Singleton => self
				.singletons
				.affinity
				.get_or_try_init((locality, key.clone()), construct),
			Scope::Scoped => self
				.scoped
				.affinity
				.get_or_try_init((locality, key.clone()), construct),
		}
	}

	/// Marks `key` as being resolved from `owner`'s `locality` store.
	fn enter(&self, owner: &Container, locality: Locality, key: &Key) -> DiResult<ResolutionGuard> {
		let node = ResolutionNode::new(Arc::as_ptr(&owner.inner) as usize, locality, key);
		begin_resolution(node, self.inner.settings.max_resolution_depth)
	}

	/// Finds the factory for `key`: local stores of this container first, then
	/// the inherited stores up the parent chain.
	fn locate<'c, V>(
		&'c self,
		key: &Key,
		store: impl Fn(&Partition) -> &FactoryStore<V>,
	) -> Option<(&'c Container, Locality, &'c ErasedFactory<V>)> {
		if let Some(factory) = store(&self.inner.registry.local).get(key) {
			return Some((self, Locality::Local, factory));
		}
		let mut current = Some(self);
		while let Some(container) = current {
			if let Some(factory) = store(&container.inner.registry.inherited).get(key) {
				return Some((container, Locality::Inherited, factory));
			}
			current = container.inner.parent.as_ref();
		}
		None
	}

	fn not_found(&self, key: &Key) -> DiError {
		let type_identity = key.type_identity();
		let mut alternatives =
			self.inner
				.registry
				.describe_type(type_identity, &self.inner.label, &[Locality::Local]);
		alternatives.extend(self.describe_type_in_chain(type_identity));
		alternatives.extend(
			self.inner
				.registry
				.describe_inputs(type_identity, &self.inner.label),
		);
		alternatives.sort();
		DiError::not_found(key, alternatives)
	}

	/// Inherited registrations of the type on this container and its ancestors.
	pub(crate) fn describe_type_in_chain(&self, type_identity: TypeIdentity) -> Vec<String> {
		let mut found = Vec::new();
		let mut current = Some(self);
		while let Some(container) = current {
			found.extend(container.inner.registry.describe_type(
				type_identity,
				&container.inner.label,
				&[Locality::Inherited],
			));
			current = container.inner.parent.as_ref();
		}
		found
	}

	// Inputs

	pub fn resolve_input<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
		self.resolve_input_by_key(&Key::of::<T>())
	}

	pub fn resolve_input_keyed<T: Send + Sync + 'static>(
		&self,
		discriminator: impl Into<Discriminator>,
	) -> DiResult<Arc<T>> {
		self.resolve_input_by_key(&Key::keyed::<T>(discriminator))
	}

	pub fn resolve_input_by_key<T: Send + Sync + 'static>(&self, key: &Key) -> DiResult<Arc<T>> {
		let value = self
			.inner
			.registry
			.inputs
			.get(key)
			.cloned()
			.ok_or_else(|| DiError::InputNotFound {
				key: key.to_string(),
			})?;
		value
			.downcast::<T>()
			.map_err(|_| DiError::type_mismatch(key, std::any::type_name::<T>()))
	}

	pub(crate) fn input_snapshot(
		&self,
	) -> (HashMap<Key, SharedValue>, HashMap<Key, RegistrationMetadata>) {
		(
			self.inner.registry.inputs.clone(),
			self.inner.registry.input_metadata.clone(),
		)
	}

	// Accessors for generated facades. Freezing already validated these, so a
	// failure here is a bug in the composition.

	#[track_caller]
	pub fn require<T: Send + Sync + 'static>(&self) -> Arc<T> {
		match self.resolve::<T>() {
			Ok(value) => value,
			Err(error) => panic!("required dependency unavailable in {}: {error}", self.inner.label),
		}
	}

	#[track_caller]
	pub fn require_keyed<T: Send + Sync + 'static>(&self, discriminator: impl Into<Discriminator>) -> Arc<T> {
		match self.resolve_keyed::<T>(discriminator) {
			Ok(value) => value,
			Err(error) => panic!("required dependency unavailable in {}: {error}", self.inner.label),
		}
	}

	#[track_caller]
	pub fn require_affinity<T: 'static>(&self) -> Rc<T> {
		match self.resolve_affinity::<T>() {
			Ok(value) => value,
			Err(error) => panic!("required dependency unavailable in {}: {error}", self.inner.label),
		}
	}

	#[track_caller]
	pub fn require_input<T: Send + Sync + 'static>(&self) -> Arc<T> {
		match self.resolve_input::<T>() {
			Ok(value) => value,
			Err(error) => panic!("required input unavailable in {}: {error}", self.inner.label),
		}
	}

	/// `None` when nothing provides `T`.
	///
	/// # Panics
	///
	/// Panics on any other failure (cycles, type mismatches, factory errors),
	/// which an absent optional dependency must not hide.
	#[track_caller]
	pub fn optional<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
		match self.resolve::<T>() {
			Ok(value) => Some(value),
			Err(error) if error.is_not_found() => None,
			Err(error) => panic!("optional dependency failed in {}: {error}", self.inner.label),
		}
	}

	// Children and scopes

	/// Builds the container for module `M` beneath this one.
	///
	/// In [`Mode::Testing`] the module's mock registration is used.
	pub fn build_child<M: Module>(&self) -> DiResult<M> {
		self.build_child_with::<M, _>(|_| Ok(()))
	}

	/// Like [`Container::build_child`], with `configure` run first to provide inputs.
	///
	/// # Panics
	///
	/// Panics if the child does not satisfy `M::requirements()`.
	pub fn build_child_with<M, F>(&self, configure: F) -> DiResult<M>
	where
		M: Module,
		F: FnOnce(&mut Builder) -> DiResult<()>,
	{
		let mut builder = Builder::child_of(self, module_label::<M>());
		configure(&mut builder)?;
		let container = match self.inner.settings.mode {
			Mode::Production => {
				M::register_dependencies(&mut builder)?;
				builder.freeze(&M::requirements())
			}
			Mode::Testing => mock::compose::<M, fn(&mut MockBuilder<'_>) -> DiResult<()>>(builder, None)?,
		};
		tracing::debug!(
			module = %container.label(),
			depth = container.depth(),
			mode = ?self.inner.settings.mode,
			"built child container"
		);
		Ok(M::from_component(Component::new(container)))
	}

	/// Builds module `M` through the mock pathway regardless of mode, then
	/// applies `overrides`, whose registrations always win.
	pub fn build_child_mocked<M, F, O>(&self, configure: F, overrides: O) -> DiResult<M>
	where
		M: Module,
		F: FnOnce(&mut Builder) -> DiResult<()>,
		O: FnOnce(&mut MockBuilder<'_>) -> DiResult<()>,
	{
		let mut builder = Builder::child_of(self, module_label::<M>());
		configure(&mut builder)?;
		let container = mock::compose::<M, O>(builder, Some(overrides))?;
		tracing::debug!(
			module = %container.label(),
			depth = container.depth(),
			"built mocked child container"
		);
		Ok(M::from_component(Component::new(container)))
	}

	/// Sibling container sharing every registration, input and singleton with
	/// this one, but with empty scoped caches.
	pub fn new_scope(&self) -> Container {
		Self {
			inner: Arc::clone(&self.inner),
			scoped: Arc::new(ScopeCaches::new(self.inner.affinity_thread)),
			singletons: Arc::clone(&self.singletons),
		}
	}

	// Introspection

	pub fn parent(&self) -> Option<&Container> {
		self.inner.parent.as_ref()
	}

	pub fn mode(&self) -> Mode {
		self.inner.settings.mode
	}

	pub fn settings(&self) -> &ContainerSettings {
		&self.inner.settings
	}

	/// Number of ancestors; the root is at depth 0.
	pub fn depth(&self) -> usize {
		self.inner.depth
	}

	pub fn label(&self) -> &str {
		&self.inner.label
	}

	pub(crate) fn affinity_thread(&self) -> ThreadId {
		self.inner.affinity_thread
	}

	pub(crate) fn registry(&self) -> &Registry {
		&self.inner.registry
	}

	/// True when this container itself registers `key` or holds it as an input.
	pub fn contains(&self, key: &Key) -> bool {
		self.inner.registry.contains(key) || self.inner.registry.inputs.contains_key(key)
	}

	/// Whether `key` is visible to children of this container.
	pub(crate) fn provides_inherited(&self, key: &Key) -> bool {
		let mut current = Some(self);
		while let Some(container) = current {
			if container.inner.registry.inherited.contains(key) {
				return true;
			}
			current = container.inner.parent.as_ref();
		}
		false
	}

	pub fn is_same_scope(&self, other: &Container) -> bool {
		Arc::ptr_eq(&self.scoped, &other.scoped)
	}

	/// Report of every registration and input from the root down to this container.
	pub fn diagnose(&self) -> Diagnostics {
		Diagnostics::collect(self)
	}

	pub fn log_diagnostics(&self) {
		tracing::info!(container = %self.inner.label, "dependency graph:\n{}", self.diagnose());
	}
}

fn module_label<M: 'static>() -> Cow<'static, str> {
	Cow::Owned(TypeIdentity::of::<M>().short_name())
}

impl fmt::Debug for Container {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Container")
			.field("label", &self.inner.label)
			.field("depth", &self.inner.depth)
			.field("mode", &self.inner.settings.mode)
			.field("local", &self.inner.registry.local.len())
			.field("inherited", &self.inner.registry.inherited.len())
			.field("inputs", &self.inner.registry.inputs.len())
			.field("scoped_cached", &self.scoped.shared.len())
			.field("scoped_affinity_cached", &self.scoped.affinity.len())
			.finish()
	}
}
