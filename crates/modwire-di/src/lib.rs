//! # modwire dependency injection
//!
//! Hierarchical, typed dependency injection for modular applications.
//!
//! ## Features
//!
//! - **Two-phase**: registrations accumulate on a mutable [`Builder`], which is
//!   validated and frozen into an immutable [`Container`]
//! - **Hierarchical**: every module gets its own child container; inherited
//!   registrations are visible to descendants, local ones are not
//! - **Scoped**: transient, singleton and scoped lifetimes, with
//!   [`Container::new_scope`] restarting scoped values
//! - **Thread-aware**: default-domain values are `Send + Sync`; affinity-domain
//!   values stay on one designated thread
//! - **Testable**: a mock registration pathway with overrides and imports
//!
//! ## Example
//!
//! ```rust
//! use modwire_di::{Builder, Component, DiResult, Module, RequirementSet, Root};
//! use std::sync::Arc;
//!
//! struct Config {
//! 	env: &'static str,
//! }
//!
//! struct Repository {
//! 	env: &'static str,
//! }
//!
//! struct ProfileModule(Component<ProfileModule>);
//!
//! impl ProfileModule {
//! 	fn repository(&self) -> Arc<Repository> {
//! 		self.0.require::<Repository>()
//! 	}
//! }
//!
//! impl Module for ProfileModule {
//! 	fn requirements() -> RequirementSet {
//! 		RequirementSet::new().require::<Config>().local::<Repository>()
//! 	}
//!
//! 	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
//! 		builder.bind::<Repository>().local().scoped(|c| {
//! 			let config = c.resolve::<Config>()?;
//! 			Ok(Repository { env: config.env })
//! 		})
//! 	}
//!
//! 	fn from_component(component: Component<Self>) -> Self {
//! 		Self(component)
//! 	}
//! }
//!
//! let mut root = Root::production().builder();
//! root.singleton::<Config>(|_| Ok(Config { env: "prod" }))?;
//! let root = root.freeze(&RequirementSet::new().require::<Config>());
//!
//! let profile = root.build_child::<ProfileModule>()?;
//! assert_eq!(profile.repository().env, "prod");
//! # Ok::<(), modwire_di::DiError>(())
//! ```
//!
//! ## Tests
//!
//! With [`Root::testing`], `build_child` calls [`Module::mock_registration`]
//! instead, and [`Container::build_child_mocked`] applies per-test overrides
//! on top. See [`MockBuilder`].

pub mod builder;
pub mod container;
mod cycle_detection;
pub mod diagnostics;
pub mod error;
pub mod factory;
pub mod key;
pub mod metadata;
pub mod mock;
pub mod module;
mod registry;
pub mod requirement;
pub mod scope;
pub mod settings;

pub use builder::{AffinityBinding, Binding, Builder, Root};
pub use container::Container;
pub use diagnostics::{DiagnosticStatistics, Diagnostics};
pub use error::{DiError, DiResult, ResolutionFailure};
pub use factory::{AffinityFactory, ErasedFactory, Factory};
pub use key::{Discriminator, Domain, Key, TypeIdentity};
pub use metadata::{Origin, RegistrationMetadata};
pub use mock::MockBuilder;
pub use module::{Component, Module};
pub use requirement::{InputRequirement, Requirement, RequirementSet};
pub use scope::{Locality, Scope};
pub use settings::{ContainerSettings, DEFAULT_MAX_RESOLUTION_DEPTH, Mode, ShadowingPolicy};
