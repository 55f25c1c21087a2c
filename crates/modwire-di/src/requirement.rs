//! Declarative requirement lists validated when a builder is frozen

use crate::key::{Discriminator, Domain, Key};
use crate::scope::Locality;
use std::borrow::Cow;

/// A dependency a module expects to be resolvable once frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
	key: Key,
	optional: bool,
	description: Cow<'static, str>,
}

impl Requirement {
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self::for_key(Key::of::<T>())
	}

	pub fn keyed<T: ?Sized + 'static>(discriminator: impl Into<Discriminator>) -> Self {
		Self::for_key(Key::keyed::<T>(discriminator))
	}

	pub fn for_key(key: Key) -> Self {
		let description = Cow::Owned(key.to_string());
		Self {
			key,
			optional: false,
			description,
		}
	}

	/// Marks the requirement optional; freezing succeeds without it.
	pub fn optional(mut self) -> Self {
		self.optional = true;
		self
	}

	pub fn described(mut self, description: impl Into<Cow<'static, str>>) -> Self {
		self.description = description.into();
		self
	}

	pub(crate) fn in_domain(mut self, domain: Domain) -> Self {
		self.key = self.key.with_domain(domain);
		self
	}

	pub fn key(&self) -> &Key {
		&self.key
	}

	pub fn is_optional(&self) -> bool {
		self.optional
	}

	pub fn description(&self) -> &str {
		&self.description
	}
}

/// An input value a module expects its caller to provide.
///
/// Inputs have no optionality: a missing input always fails the freeze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRequirement {
	key: Key,
	description: Cow<'static, str>,
}

impl InputRequirement {
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self::for_key(Key::of::<T>())
	}

	pub fn keyed<T: ?Sized + 'static>(discriminator: impl Into<Discriminator>) -> Self {
		Self::for_key(Key::keyed::<T>(discriminator))
	}

	pub fn for_key(key: Key) -> Self {
		let description = Cow::Owned(key.to_string());
		Self { key, description }
	}

	pub fn described(mut self, description: impl Into<Cow<'static, str>>) -> Self {
		self.description = description.into();
		self
	}

	pub fn key(&self) -> &Key {
		&self.key
	}

	pub fn description(&self) -> &str {
		&self.description
	}
}

/// The five requirement lists of a module.
///
/// Affinity lists retag their keys with [`Domain::Affinity`], so callers can
/// build requirements with plain `Requirement::of::<T>()`.
///
/// # Examples
///
/// ```
/// use modwire_di::{Domain, Requirement, RequirementSet};
///
/// struct Api;
/// struct Tracker;
/// struct Theme;
/// struct Session;
///
/// let requirements = RequirementSet::new()
/// 	.require::<Api>()
/// 	.optional::<Tracker>()
/// 	.affinity::<Theme>()
/// 	.input::<Session>();
///
/// assert_eq!(requirements.requirements().len(), 2);
/// assert!(requirements.requirements()[1].is_optional());
/// assert_eq!(requirements.affinity_requirements()[0].key().domain(), Domain::Affinity);
/// assert_eq!(requirements.input_requirements().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequirementSet {
	requirements: Vec<Requirement>,
	affinity: Vec<Requirement>,
	local: Vec<Requirement>,
	local_affinity: Vec<Requirement>,
	inputs: Vec<InputRequirement>,
}

impl RequirementSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn require<T: ?Sized + 'static>(self) -> Self {
		self.with_requirement(Requirement::of::<T>())
	}

	pub fn require_keyed<T: ?Sized + 'static>(self, discriminator: impl Into<Discriminator>) -> Self {
		self.with_requirement(Requirement::keyed::<T>(discriminator))
	}

	pub fn optional<T: ?Sized + 'static>(self) -> Self {
		self.with_requirement(Requirement::of::<T>().optional())
	}

	pub fn local<T: ?Sized + 'static>(self) -> Self {
		self.with_local_requirement(Requirement::of::<T>())
	}

	pub fn affinity<T: ?Sized + 'static>(self) -> Self {
		self.with_affinity_requirement(Requirement::of::<T>())
	}

	pub fn local_affinity<T: ?Sized + 'static>(self) -> Self {
		self.with_local_affinity_requirement(Requirement::of::<T>())
	}

	pub fn input<T: ?Sized + 'static>(self) -> Self {
		self.with_input_requirement(InputRequirement::of::<T>())
	}

	pub fn with_requirement(mut self, requirement: Requirement) -> Self {
		self.requirements.push(requirement.in_domain(Domain::Default));
		self
	}

	pub fn with_affinity_requirement(mut self, requirement: Requirement) -> Self {
		self.affinity.push(requirement.in_domain(Domain::Affinity));
		self
	}

	pub fn with_local_requirement(mut self, requirement: Requirement) -> Self {
		self.local.push(requirement.in_domain(Domain::Default));
		self
	}

	pub fn with_local_affinity_requirement(mut self, requirement: Requirement) -> Self {
		self.local_affinity
			.push(requirement.in_domain(Domain::Affinity));
		self
	}

	pub fn with_input_requirement(mut self, requirement: InputRequirement) -> Self {
		self.inputs.push(requirement);
		self
	}

	pub fn requirements(&self) -> &[Requirement] {
		&self.requirements
	}

	pub fn affinity_requirements(&self) -> &[Requirement] {
		&self.affinity
	}

	pub fn local_requirements(&self) -> &[Requirement] {
		&self.local
	}

	pub fn local_affinity_requirements(&self) -> &[Requirement] {
		&self.local_affinity
	}

	pub fn input_requirements(&self) -> &[InputRequirement] {
		&self.inputs
	}

	/// All four requirement lists, tagged with the locality they are checked against.
	pub fn iter(&self) -> impl Iterator<Item = (Locality, &Requirement)> {
		let inherited = self
			.requirements
			.iter()
			.chain(&self.affinity)
			.map(|requirement| (Locality::Inherited, requirement));
		let local = self
			.local
			.iter()
			.chain(&self.local_affinity)
			.map(|requirement| (Locality::Local, requirement));
		inherited.chain(local)
	}

	pub fn is_empty(&self) -> bool {
		self.requirements.is_empty()
			&& self.affinity.is_empty()
			&& self.local.is_empty()
			&& self.local_affinity.is_empty()
			&& self.inputs.is_empty()
	}
}
