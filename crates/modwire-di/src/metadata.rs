//! Source metadata recorded alongside registrations and inputs

use crate::scope::{Locality, Scope};
use std::borrow::Cow;
use std::fmt;
use std::panic::Location;

/// How an entry got into a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
	/// Registered by the module itself or a test override.
	Explicit,
	/// Merged from another module by `MockBuilder::import_dependencies`.
	Imported,
	/// Provided as an input value.
	Input,
}

impl Origin {
	pub fn label(&self) -> &'static str {
		match self {
			Origin::Explicit => "explicit",
			Origin::Imported => "imported",
			Origin::Input => "input",
		}
	}
}

/// Where and how a key was registered.
#[derive(Debug, Clone)]
pub struct RegistrationMetadata {
	scope: Option<Scope>,
	locality: Option<Locality>,
	file: &'static str,
	line: u32,
	description: Option<Cow<'static, str>>,
	origin: Origin,
}

impl RegistrationMetadata {
	pub(crate) fn registration(
		scope: Scope,
		locality: Locality,
		location: &'static Location<'static>,
		description: Option<Cow<'static, str>>,
	) -> Self {
		Self {
			scope: Some(scope),
			locality: Some(locality),
			file: location.file(),
			line: location.line(),
			description,
			origin: Origin::Explicit,
		}
	}

	pub(crate) fn input(location: &'static Location<'static>) -> Self {
		Self {
			scope: None,
			locality: None,
			file: location.file(),
			line: location.line(),
			description: None,
			origin: Origin::Input,
		}
	}

	pub(crate) fn imported(mut self) -> Self {
		self.origin = Origin::Imported;
		self
	}

	/// `None` for inputs.
	pub fn scope(&self) -> Option<Scope> {
		self.scope
	}

	/// `None` for inputs.
	pub fn locality(&self) -> Option<Locality> {
		self.locality
	}

	pub fn file(&self) -> &'static str {
		self.file
	}

	pub fn line(&self) -> u32 {
		self.line
	}

	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	pub fn origin(&self) -> Origin {
		self.origin
	}

	/// `file:line` of the registration call site.
	pub fn location(&self) -> String {
		format!("{}:{}", self.file, self.line)
	}
}

impl fmt::Display for RegistrationMetadata {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.file, self.line)?;
		if let Some(description) = &self.description {
			write!(f, " ({description})")?;
		}
		Ok(())
	}
}
