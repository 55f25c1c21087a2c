//! Error types for registration and resolution

use crate::key::{Domain, Key};
use std::fmt;

/// Result type for container operations
pub type DiResult<T> = Result<T, DiError>;

/// Why a resolution attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
	/// Nothing in the container or its ancestors provides the key.
	///
	/// `alternatives` lists every other registration of the same type that was
	/// found, to help pick the right discriminator.
	NotFound { alternatives: Vec<String> },
	/// The stored value is not of the requested type.
	TypeMismatch { expected: &'static str },
	/// The key was passed to the resolution path of the other domain.
	WrongDomain { requested: Domain },
}

impl fmt::Display for ResolutionFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResolutionFailure::NotFound { alternatives } if alternatives.is_empty() => {
				f.write_str("no registration found")
			}
			ResolutionFailure::NotFound { alternatives } => write!(
				f,
				"no registration found; registrations of the same type: {}",
				alternatives.join(", ")
			),
			ResolutionFailure::TypeMismatch { expected } => {
				write!(f, "stored value is not of the requested type `{expected}`")
			}
			ResolutionFailure::WrongDomain { requested } => {
				write!(f, "key does not belong to the {requested} domain")
			}
		}
	}
}

/// Container errors
#[derive(Debug, thiserror::Error)]
pub enum DiError {
	/// A registration for the key already exists and no override was requested
	#[error("registration already exists for {key}; use `.overriding()` to replace it")]
	RegistrationExists { key: String },

	/// The key could not be resolved
	#[error("failed to resolve {key}: {failure}")]
	ResolutionFailed {
		key: String,
		failure: ResolutionFailure,
	},

	/// No input value was provided for the key
	#[error("input not provided: {key}")]
	InputNotFound { key: String },

	/// Requirement validation failed while freezing a builder
	#[error("{0}")]
	MissingRequirements(String),

	/// Circular dependency detected
	#[error("Circular dependency detected: {type_name}\n  Path: {path}")]
	CircularDependency { type_name: String, path: String },

	/// Maximum resolution depth exceeded
	#[error(
		"Maximum resolution depth exceeded: {0}\nThis likely indicates an extremely deep or circular dependency chain."
	)]
	MaxDepthExceeded(usize),

	/// An affinity-domain key was resolved off the designated thread
	#[error("{key} is confined to the container's affinity thread")]
	AffinityViolation { key: String },

	/// A factory reported its own failure
	#[error("factory failed: {0}")]
	Factory(String),
}

impl DiError {
	/// Builds a [`DiError::Factory`] from any displayable message.
	pub fn factory(message: impl fmt::Display) -> Self {
		Self::Factory(message.to_string())
	}

	/// True for [`ResolutionFailure::NotFound`] and [`DiError::InputNotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			DiError::ResolutionFailed {
				failure: ResolutionFailure::NotFound { .. },
				..
			} | DiError::InputNotFound { .. }
		)
	}

	pub(crate) fn not_found(key: &Key, alternatives: Vec<String>) -> Self {
		Self::ResolutionFailed {
			key: key.to_string(),
			failure: ResolutionFailure::NotFound { alternatives },
		}
	}

	pub(crate) fn type_mismatch(key: &Key, expected: &'static str) -> Self {
		Self::ResolutionFailed {
			key: key.to_string(),
			failure: ResolutionFailure::TypeMismatch { expected },
		}
	}

	pub(crate) fn wrong_domain(key: &Key, requested: Domain) -> Self {
		Self::ResolutionFailed {
			key: key.to_string(),
			failure: ResolutionFailure::WrongDomain { requested },
		}
	}
}
