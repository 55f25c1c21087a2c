//! Thread-local circular dependency detection
//!
//! Resolution is synchronous, so the stack of registrations currently being
//! resolved follows the calling thread. A factory that (directly or
//! indirectly) resolves its own registration would otherwise block forever on
//! the compute-once cell of a cached scope.
//!
//! The stack records [`ResolutionNode`]s rather than bare keys: a child
//! override that resolves the same key from its parent reaches a different
//! registration and is not a cycle.
//!
//! - **O(1) Circular Detection**: `HashSet<ResolutionNode>` lookup on every entry
//! - **Depth Limiting**: bounded by `ContainerSettings::max_resolution_depth`
//! - **RAII**: cleanup via [`ResolutionGuard`], including on unwind

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::scope::Locality;
use std::cell::RefCell;
use std::collections::HashSet;

/// One registration: the container that owns it, the store it lives in, and
/// its key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ResolutionNode {
	owner: usize,
	locality: Locality,
	key: Key,
}

impl ResolutionNode {
	/// `owner` is the address of the owning container's shared state.
	pub(crate) fn new(owner: usize, locality: Locality, key: &Key) -> Self {
		Self {
			owner,
			locality,
			key: key.clone(),
		}
	}
}

#[derive(Default)]
struct CycleDetectionState {
	/// Registrations currently being resolved
	resolution_set: HashSet<ResolutionNode>,
	/// Resolution path (for displaying circular paths)
	resolution_path: Vec<ResolutionNode>,
}

thread_local! {
	static CYCLE_STATE: RefCell<CycleDetectionState> = RefCell::new(CycleDetectionState::default());
}

/// Records the start of resolving `node` on the current thread.
///
/// Fails when `node` is already being resolved further up the stack, or when
/// the stack is `max_depth` deep.
pub(crate) fn begin_resolution(node: ResolutionNode, max_depth: usize) -> DiResult<ResolutionGuard> {
	CYCLE_STATE.with(|state| {
		let mut state = state.borrow_mut();
		let depth = state.resolution_path.len() + 1;
		if depth > max_depth {
			return Err(DiError::MaxDepthExceeded(depth));
		}
		if state.resolution_set.contains(&node) {
			return Err(DiError::CircularDependency {
				type_name: node.key.to_string(),
				path: cycle_path(&state.resolution_path, &node),
			});
		}
		state.resolution_set.insert(node.clone());
		state.resolution_path.push(node.clone());
		Ok(ResolutionGuard { node })
	})
}

/// RAII guard: removes its node from the resolution stack on drop.
#[derive(Debug)]
pub(crate) struct ResolutionGuard {
	node: ResolutionNode,
}

impl Drop for ResolutionGuard {
	fn drop(&mut self) {
		let _ = CYCLE_STATE.try_with(|state| {
			if let Ok(mut state) = state.try_borrow_mut() {
				state.resolution_set.remove(&self.node);
				if let Some(pos) = state.resolution_path.iter().rposition(|n| *n == self.node) {
					state.resolution_path.remove(pos);
				}
			}
		});
	}
}

/// Current resolution depth of this thread.
#[cfg(test)]
pub(crate) fn resolution_depth() -> usize {
	CYCLE_STATE.with(|state| state.borrow().resolution_path.len())
}

fn cycle_path(path: &[ResolutionNode], node: &ResolutionNode) -> String {
	match path.iter().position(|n| n == node) {
		Some(start) => {
			let cycle: Vec<String> = path[start..].iter().map(|n| n.key.to_string()).collect();
			format!("{} -> {}", cycle.join(" -> "), node.key)
		}
		None => format!("Unknown cycle involving {}", node.key),
	}
}
