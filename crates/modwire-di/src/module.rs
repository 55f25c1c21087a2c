//! Module boundary: the registration routines a module exposes and the facade
//! handle it is built from

use crate::builder::Builder;
use crate::container::Container;
use crate::error::DiResult;
use crate::mock::MockBuilder;
use crate::requirement::RequirementSet;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

/// A unit of composition with its own container.
///
/// Implementations are usually small facades holding a [`Component`] and
/// exposing one accessor per declared dependency.
///
/// # Examples
///
/// ```
/// use modwire_di::{Builder, Component, DiResult, Module, RequirementSet, Root};
/// use std::sync::Arc;
///
/// struct Config(&'static str);
/// struct Checkout(String);
///
/// struct CheckoutModule(Component<CheckoutModule>);
///
/// impl CheckoutModule {
/// 	fn checkout(&self) -> Arc<Checkout> {
/// 		self.0.require::<Checkout>()
/// 	}
/// }
///
/// impl Module for CheckoutModule {
/// 	fn requirements() -> RequirementSet {
/// 		RequirementSet::new().require::<Config>().local::<Checkout>()
/// 	}
///
/// 	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
/// 		builder.bind::<Checkout>().local().singleton(|c| {
/// 			Ok(Checkout(format!("checkout ({})", c.resolve::<Config>()?.0)))
/// 		})
/// 	}
///
/// 	fn from_component(component: Component<Self>) -> Self {
/// 		Self(component)
/// 	}
/// }
///
/// let mut root = Root::production().builder();
/// root.singleton::<Config>(|_| Ok(Config("prod")))?;
/// let root = root.freeze(&RequirementSet::new());
///
/// let checkout = root.build_child::<CheckoutModule>()?;
/// assert_eq!(checkout.checkout().0, "checkout (prod)");
/// # Ok::<(), modwire_di::DiError>(())
/// ```
pub trait Module: Sized + 'static {
	/// Whether testing mode uses [`Module::mock_registration`].
	///
	/// Set this together with overriding `mock_registration`. When `false`,
	/// testing mode falls back to [`Module::register_dependencies`] and skips
	/// optional requirements in the coverage check. When `true`, the default
	/// `mock_registration` registers nothing, so every requirement the mock
	/// leaves uncovered is reported by that check.
	const MOCKABLE: bool = false;

	/// Dependencies validated when the module's builder is frozen.
	fn requirements() -> RequirementSet {
		RequirementSet::new()
	}

	fn register_dependencies(builder: &mut Builder) -> DiResult<()>;

	/// Test registration, used only when [`Module::MOCKABLE`] is `true`.
	fn mock_registration(builder: &mut MockBuilder<'_>) -> DiResult<()> {
		let _ = builder;
		Ok(())
	}

	fn from_component(component: Component<Self>) -> Self;
}

/// Frozen container of module `M`.
///
/// The marker keeps handles of different modules apart at compile time.
/// Dereferences to [`Container`].
pub struct Component<M> {
	container: Container,
	_module: PhantomData<fn() -> M>,
}

impl<M> Component<M> {
	pub(crate) fn new(container: Container) -> Self {
		Self {
			container,
			_module: PhantomData,
		}
	}

	pub fn container(&self) -> &Container {
		&self.container
	}

	pub fn into_container(self) -> Container {
		self.container
	}
}

impl<M> Deref for Component<M> {
	type Target = Container;

	fn deref(&self) -> &Container {
		&self.container
	}
}

impl<M> Clone for Component<M> {
	fn clone(&self) -> Self {
		Self::new(self.container.clone())
	}
}

impl<M> fmt::Debug for Component<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Component").field(&self.container).finish()
	}
}
