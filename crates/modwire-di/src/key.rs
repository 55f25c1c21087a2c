//! Identity keys for registrations
//!
//! A [`Key`] names "what is being registered": a type, an optional
//! discriminator for keyed registrations, and the concurrency [`Domain`] the
//! value lives in. Two keys are equal only when all three parts match.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Concurrency domain of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Domain {
	/// Values shareable across threads (`Send + Sync`).
	#[default]
	Default,
	/// Values confined to the container's designated affinity thread.
	Affinity,
}

impl Domain {
	pub fn label(&self) -> &'static str {
		match self {
			Domain::Default => "default",
			Domain::Affinity => "affinity",
		}
	}
}

impl fmt::Display for Domain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// Runtime identity of a registered type.
///
/// Equality and hashing only consider the [`TypeId`]; the name is carried for
/// error messages and diagnostics.
#[derive(Clone, Copy)]
pub struct TypeIdentity {
	id: TypeId,
	name: &'static str,
}

impl TypeIdentity {
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	/// Fully qualified type name, as reported by [`std::any::type_name`].
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Type name with module paths stripped (`alloc::sync::Arc<app::Db>` becomes `Arc<Db>`).
	pub fn short_name(&self) -> String {
		short_type_name(self.name)
	}
}

impl PartialEq for TypeIdentity {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeIdentity {}

impl Hash for TypeIdentity {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for TypeIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

fn short_type_name(name: &str) -> String {
	let mut out = String::with_capacity(name.len());
	let mut segment = String::new();
	for ch in name.chars() {
		if ch.is_alphanumeric() || ch == '_' || ch == ':' {
			segment.push(ch);
			continue;
		}
		out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
		segment.clear();
		out.push(ch);
	}
	out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
	out
}

/// Object-safe view of a hashable discriminator value.
trait DiscriminatorValue: Any + Send + Sync {
	fn as_any(&self) -> &dyn Any;
	fn eq_value(&self, other: &dyn DiscriminatorValue) -> bool;
	fn hash_value(&self, state: &mut dyn Hasher);
	fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> DiscriminatorValue for T
where
	T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn eq_value(&self, other: &dyn DiscriminatorValue) -> bool {
		other
			.as_any()
			.downcast_ref::<T>()
			.is_some_and(|other| other == self)
	}

	fn hash_value(&self, mut state: &mut dyn Hasher) {
		TypeId::of::<T>().hash(&mut state);
		self.hash(&mut state);
	}

	fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// Secondary tag distinguishing several registrations of the same type.
///
/// Any `Hash + Eq + Debug + Send + Sync + 'static` value can be used. String
/// slices are normalized to `String`, so `"primary"` and `String::from("primary")`
/// name the same registration. Values of different types never compare equal.
///
/// # Examples
///
/// ```
/// use modwire_di::Discriminator;
///
/// #[derive(Debug, Hash, PartialEq, Eq)]
/// enum Backend {
/// 	Amplitude,
/// 	Segment,
/// }
///
/// assert_eq!(Discriminator::from("primary"), Discriminator::from(String::from("primary")));
/// assert_ne!(Discriminator::new(Backend::Amplitude), Discriminator::new(Backend::Segment));
/// assert_ne!(Discriminator::new(1u32), Discriminator::new(1u64));
/// ```
#[derive(Clone)]
pub struct Discriminator(Arc<dyn DiscriminatorValue>);

impl Discriminator {
	pub fn new<T>(value: T) -> Self
	where
		T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
	{
		Self(Arc::new(value))
	}

	/// Returns the underlying value if it has type `T`.
	pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
		self.0.as_any().downcast_ref::<T>()
	}
}

impl PartialEq for Discriminator {
	fn eq(&self, other: &Self) -> bool {
		self.0.eq_value(other.0.as_ref())
	}
}

impl Eq for Discriminator {}

impl Hash for Discriminator {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.hash_value(state);
	}
}

impl fmt::Debug for Discriminator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt_value(f)
	}
}

impl fmt::Display for Discriminator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt_value(f)
	}
}

impl From<&str> for Discriminator {
	fn from(value: &str) -> Self {
		Self::new(value.to_owned())
	}
}

impl From<String> for Discriminator {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

/// Composite identity of a registration.
///
/// # Examples
///
/// ```
/// use modwire_di::{Domain, Key};
///
/// struct Analytics;
///
/// let plain = Key::of::<Analytics>();
/// let keyed = Key::keyed::<Analytics>("amplitude");
/// let affinity = plain.with_domain(Domain::Affinity);
///
/// assert_ne!(plain, keyed);
/// assert_ne!(plain, affinity);
/// assert_eq!(plain.domain(), Domain::Default);
/// assert_eq!(plain.type_identity(), keyed.type_identity());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
	type_identity: TypeIdentity,
	discriminator: Option<Discriminator>,
	domain: Domain,
}

impl Key {
	/// Unkeyed, default-domain key for `T`.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			type_identity: TypeIdentity::of::<T>(),
			discriminator: None,
			domain: Domain::Default,
		}
	}

	/// Keyed, default-domain key for `T`.
	pub fn keyed<T: ?Sized + 'static>(discriminator: impl Into<Discriminator>) -> Self {
		Self {
			type_identity: TypeIdentity::of::<T>(),
			discriminator: Some(discriminator.into()),
			domain: Domain::Default,
		}
	}

	pub(crate) fn from_parts(
		type_identity: TypeIdentity,
		discriminator: Option<Discriminator>,
		domain: Domain,
	) -> Self {
		Self {
			type_identity,
			discriminator,
			domain,
		}
	}

	/// Returns a copy of this key tagged with `domain`; `self` is left untouched.
	pub fn with_domain(&self, domain: Domain) -> Self {
		Self {
			domain,
			..self.clone()
		}
	}

	pub fn type_identity(&self) -> TypeIdentity {
		self.type_identity
	}

	pub fn type_name(&self) -> &'static str {
		self.type_identity.name()
	}

	pub fn discriminator(&self) -> Option<&Discriminator> {
		self.discriminator.as_ref()
	}

	pub fn domain(&self) -> Domain {
		self.domain
	}

	pub fn is_keyed(&self) -> bool {
		self.discriminator.is_some()
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.type_identity.short_name())?;
		if let Some(discriminator) = &self.discriminator {
			write!(f, "[{discriminator:?}]")?;
		}
		if self.domain == Domain::Affinity {
			f.write_str("@affinity")?;
		}
		Ok(())
	}
}

impl fmt::Debug for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Key")
			.field("type", &self.type_identity.name())
			.field("discriminator", &self.discriminator)
			.field("domain", &self.domain)
			.finish()
	}
}
