//! Dependency scopes and the caches backing them

use crate::error::DiResult;
use crate::key::Key;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

/// Type-erased default-domain value.
pub(crate) type SharedValue = Arc<dyn Any + Send + Sync>;

/// Type-erased affinity-domain value.
pub(crate) type LocalValue = Rc<dyn Any>;

/// Lifetime policy of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
	/// A new instance per resolution.
	Transient,
	/// One instance for the life of the owning container and its `new_scope` siblings.
	Singleton,
	/// One instance per logical scope; reset by `Container::new_scope`.
	Scoped,
}

impl Scope {
	pub fn label(&self) -> &'static str {
		match self {
			Scope::Transient => "transient",
			Scope::Singleton => "singleton",
			Scope::Scoped => "scoped",
		}
	}
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// Visibility of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locality {
	/// Visible on the declaring container and all of its descendants.
	Inherited,
	/// Visible only on the declaring container (and its `new_scope` siblings).
	Local,
}

impl Locality {
	pub fn label(&self) -> &'static str {
		match self {
			Locality::Inherited => "inherited",
			Locality::Local => "local",
		}
	}
}

impl fmt::Display for Locality {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// Cache entries are split by locality: a container may hold a local and an
/// inherited registration under the same key.
pub(crate) type CacheKey = (Locality, Key);

/// Compute-once cache for default-domain values.
///
/// The map lock is only held long enough to fetch the per-key cell; the cell
/// itself serializes concurrent first resolution so a factory runs at most once.
pub(crate) struct ScopedCache {
	cells: Mutex<HashMap<CacheKey, Arc<OnceCell<SharedValue>>>>,
}

impl ScopedCache {
	pub(crate) fn new() -> Self {
		Self {
			cells: Mutex::new(HashMap::new()),
		}
	}

	pub(crate) fn get_or_try_init(
		&self,
		key: CacheKey,
		init: impl FnOnce() -> DiResult<SharedValue>,
	) -> DiResult<SharedValue> {
		let cell = {
			let mut cells = self.cells.lock();
			cells.entry(key).or_default().clone()
		};
		cell.get_or_try_init(init).cloned()
	}

	/// Number of initialized entries.
	pub(crate) fn len(&self) -> usize {
		self.cells
			.lock()
			.values()
			.filter(|cell| cell.get().is_some())
			.count()
	}
}

static NEXT_AFFINITY_CACHE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
	/// Affinity values never leave the thread that produced them.
	static AFFINITY_SLOTS: RefCell<HashMap<(u64, CacheKey), LocalValue>> =
		RefCell::new(HashMap::new());
}

/// Caches dropped away from their owner thread, purged by the owner on its
/// next cache access.
static RELEASED_OFF_THREAD: Mutex<Vec<(ThreadId, u64)>> = parking_lot::const_mutex(Vec::new());

/// Removes this thread's slots whose cache id matches `released`.
///
/// The removed values are returned so callers drop them after the slot map is
/// released.
fn take_slots(released: impl Fn(u64) -> bool) -> Vec<LocalValue> {
	AFFINITY_SLOTS
		.try_with(|slots| match slots.try_borrow_mut() {
			Ok(mut slots) => {
				let stale: Vec<_> = slots
					.keys()
					.filter(|(id, _)| released(*id))
					.cloned()
					.collect();
				stale
					.into_iter()
					.filter_map(|slot| slots.remove(&slot))
					.collect()
			}
			Err(_) => Vec::new(),
		})
		.unwrap_or_default()
}

/// Cache for affinity-domain values, stored in a thread-local slot map on the
/// designated thread.
///
/// The handle itself holds no values, so containers owning it stay `Send + Sync`.
pub(crate) struct AffinityCache {
	id: u64,
	owner: ThreadId,
}

impl AffinityCache {
	pub(crate) fn new(owner: ThreadId) -> Self {
		Self {
			id: NEXT_AFFINITY_CACHE_ID.fetch_add(1, Ordering::Relaxed),
			owner,
		}
	}

	/// Drops the slots of caches released on other threads. Must run on the
	/// owner thread.
	fn purge_released(&self) {
		let released: Vec<u64> = {
			let mut pending = RELEASED_OFF_THREAD.lock();
			if pending.is_empty() {
				return;
			}
			let mut mine = Vec::new();
			pending.retain(|(thread, id)| {
				if *thread == self.owner {
					mine.push(*id);
					false
				} else {
					true
				}
			});
			mine
		};
		if released.is_empty() {
			return;
		}
		tracing::trace!(caches = released.len(), "purging affinity caches released off-thread");
		drop(take_slots(|id| released.contains(&id)));
	}

	/// Callers must already be on the owner thread.
	pub(crate) fn get_or_try_init(
		&self,
		key: CacheKey,
		init: impl FnOnce() -> DiResult<LocalValue>,
	) -> DiResult<LocalValue> {
		self.purge_released();
		let slot = (self.id, key);
		let cached = AFFINITY_SLOTS.with(|slots| slots.borrow().get(&slot).cloned());
		if let Some(value) = cached {
			return Ok(value);
		}

		// The slot map is not borrowed while the factory runs; it may resolve
		// further affinity values.
		let value = init()?;
		let (stored, unused) = AFFINITY_SLOTS.with(|slots| {
			let mut slots = slots.borrow_mut();
			match slots.entry(slot) {
				Entry::Occupied(entry) => (entry.get().clone(), Some(value)),
				Entry::Vacant(entry) => (entry.insert(value).clone(), None),
			}
		});
		drop(unused);
		Ok(stored)
	}

	pub(crate) fn len(&self) -> usize {
		if thread::current().id() != self.owner {
			return 0;
		}
		self.purge_released();
		AFFINITY_SLOTS.with(|slots| {
			slots
				.borrow()
				.keys()
				.filter(|(id, _)| *id == self.id)
				.count()
		})
	}
}

impl Drop for AffinityCache {
	fn drop(&mut self) {
		if thread::current().id() != self.owner {
			RELEASED_OFF_THREAD.lock().push((self.owner, self.id));
			return;
		}
		let id = self.id;
		// Values are dropped after the slot map is released.
		drop(take_slots(|slot_id| slot_id == id));
	}
}

/// Pair of caches backing one lifetime (singleton or scoped).
pub(crate) struct ScopeCaches {
	pub(crate) shared: ScopedCache,
	pub(crate) affinity: AffinityCache,
}

impl ScopeCaches {
	pub(crate) fn new(affinity_thread: ThreadId) -> Self {
		Self {
			shared: ScopedCache::new(),
			affinity: AffinityCache::new(affinity_thread),
		}
	}
}
