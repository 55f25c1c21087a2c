//! # modwire
//!
//! Hierarchical dependency injection for modular Rust applications.
//!
//! Each module of an application declares what it needs (a
//! [`RequirementSet`]) and how to build what it provides
//! ([`Module::register_dependencies`]). The application freezes a root
//! container once at start-up and builds one child container per module
//! beneath it, so every module sees its own registrations plus whatever its
//! ancestors make visible.
//!
//! ## Quick Example
//!
//! ```rust
//! use modwire::prelude::*;
//! use std::sync::Arc;
//!
//! struct HttpClient {
//! 	base_url: String,
//! }
//!
//! struct Feed {
//! 	source: String,
//! }
//!
//! struct FeedModule(Component<FeedModule>);
//!
//! impl FeedModule {
//! 	fn feed(&self) -> Arc<Feed> {
//! 		self.0.require::<Feed>()
//! 	}
//! }
//!
//! impl Module for FeedModule {
//! 	fn requirements() -> RequirementSet {
//! 		RequirementSet::new()
//! 			.require::<HttpClient>()
//! 			.local::<Feed>()
//! 			.input::<u32>()
//! 	}
//!
//! 	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
//! 		builder.bind::<Feed>().local().transient(|c| {
//! 			let client = c.resolve::<HttpClient>()?;
//! 			let page = c.resolve_input::<u32>()?;
//! 			Ok(Feed {
//! 				source: format!("{}/feed?page={page}", client.base_url),
//! 			})
//! 		})
//! 	}
//!
//! 	fn from_component(component: Component<Self>) -> Self {
//! 		Self(component)
//! 	}
//! }
//!
//! let mut root = Root::production().builder();
//! root.singleton::<HttpClient>(|_| {
//! 	Ok(HttpClient {
//! 		base_url: "https://api.example.com".into(),
//! 	})
//! })?;
//! let root = root.freeze(&RequirementSet::new());
//!
//! let feed = root.build_child_with::<FeedModule, _>(|builder| {
//! 	builder.provide_input(2u32);
//! 	Ok(())
//! })?;
//! assert_eq!(feed.feed().source, "https://api.example.com/feed?page=2");
//! # Ok::<(), modwire::DiError>(())
//! ```

// Re-export the container runtime
pub use modwire_di::*;

pub mod prelude {
	pub use crate::{
		Builder,
		Component,
		Container,
		ContainerSettings,
		DiError,
		DiResult,
		Key,
		MockBuilder,
		Mode,
		Module,
		RequirementSet,
		Root,
		Scope,
	};
}
