//! Type-erased factories and the stores holding them

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::scope::{LocalValue, Scope, SharedValue};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Signature of the deferred constructor behind a factory.
pub(crate) type ProduceFn<V> = dyn Fn(&Container) -> DiResult<V> + Send + Sync;

/// Deferred constructor paired with its declared scope.
///
/// The closure is always `Send + Sync` so frozen containers can be shared
/// between threads; only the produced value `V` differs between domains.
pub struct ErasedFactory<V> {
	scope: Scope,
	produce: Arc<ProduceFn<V>>,
}

/// Factory for the default domain; produced values are `Send + Sync`.
pub type Factory = ErasedFactory<SharedValue>;

/// Factory for the affinity domain; produced values may be thread-confined.
pub type AffinityFactory = ErasedFactory<LocalValue>;

impl<V> ErasedFactory<V> {
	pub(crate) fn new(scope: Scope, produce: Arc<ProduceFn<V>>) -> Self {
		Self { scope, produce }
	}

	pub fn scope(&self) -> Scope {
		self.scope
	}

	pub(crate) fn produce(&self, container: &Container) -> DiResult<V> {
		(self.produce)(container)
	}
}

impl Factory {
	pub(crate) fn from_fn<T, F>(scope: Scope, factory: F) -> Self
	where
		T: Send + Sync + 'static,
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		Self::new(
			scope,
			Arc::new(move |container: &Container| {
				factory(container).map(|value| Arc::new(value) as SharedValue)
			}),
		)
	}
}

impl AffinityFactory {
	pub(crate) fn from_fn<T, F>(scope: Scope, factory: F) -> Self
	where
		T: 'static,
		F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
	{
		Self::new(
			scope,
			Arc::new(move |container: &Container| {
				factory(container).map(|value| Rc::new(value) as LocalValue)
			}),
		)
	}
}

impl<V> Clone for ErasedFactory<V> {
	fn clone(&self) -> Self {
		Self {
			scope: self.scope,
			produce: Arc::clone(&self.produce),
		}
	}
}

impl<V> fmt::Debug for ErasedFactory<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ErasedFactory")
			.field("scope", &self.scope)
			.finish_non_exhaustive()
	}
}

/// Factories of one domain, split into the transient/singleton store and the
/// scoped store. A key lives in at most one of the two.
pub(crate) struct FactoryStore<V> {
	standard: HashMap<Key, ErasedFactory<V>>,
	scoped: HashMap<Key, ErasedFactory<V>>,
}

impl<V> FactoryStore<V> {
	pub(crate) fn get(&self, key: &Key) -> Option<&ErasedFactory<V>> {
		self.standard.get(key).or_else(|| self.scoped.get(key))
	}

	pub(crate) fn contains(&self, key: &Key) -> bool {
		self.standard.contains_key(key) || self.scoped.contains_key(key)
	}

	/// Inserts `factory`, rejecting duplicates unless `overriding`.
	///
	/// An override first removes the key from both stores so it never ends up
	/// in the standard and scoped store at once.
	pub(crate) fn insert(
		&mut self,
		key: Key,
		factory: ErasedFactory<V>,
		overriding: bool,
	) -> DiResult<()> {
		if self.contains(&key) {
			if !overriding {
				return Err(DiError::RegistrationExists {
					key: key.to_string(),
				});
			}
			self.standard.remove(&key);
			self.scoped.remove(&key);
		}
		match factory.scope() {
			Scope::Scoped => self.scoped.insert(key, factory),
			Scope::Transient | Scope::Singleton => self.standard.insert(key, factory),
		};
		Ok(())
	}

	/// Inserts `factory` only when the key is absent in both stores.
	pub(crate) fn insert_if_absent(&mut self, key: Key, factory: ErasedFactory<V>) -> bool {
		if self.contains(&key) {
			return false;
		}
		// Cannot fail: the key is absent.
		let _ = self.insert(key, factory, false);
		true
	}

	pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &ErasedFactory<V>)> {
		self.standard.iter().chain(self.scoped.iter())
	}

	#[cfg(test)]
	pub(crate) fn in_scoped_store(&self, key: &Key) -> bool {
		self.scoped.contains_key(key)
	}

	pub(crate) fn len(&self) -> usize {
		self.standard.len() + self.scoped.len()
	}
}

impl<V> Default for FactoryStore<V> {
	fn default() -> Self {
		Self {
			standard: HashMap::new(),
			scoped: HashMap::new(),
		}
	}
}

impl<V> Clone for FactoryStore<V> {
	fn clone(&self) -> Self {
		Self {
			standard: self.standard.clone(),
			scoped: self.scoped.clone(),
		}
	}
}
