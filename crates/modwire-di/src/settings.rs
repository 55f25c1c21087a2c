//! Container configuration
//!
//! Settings are fixed when the root builder is created and propagate to every
//! descendant. They derive `Deserialize` so applications can embed them in
//! their own configuration files:
//!
//! ```
//! use modwire_di::{ContainerSettings, Mode, ShadowingPolicy};
//!
//! let settings: ContainerSettings =
//! 	serde_json::from_str(r#"{ "mode": "testing", "shadowing": "ignore" }"#).unwrap();
//!
//! assert_eq!(settings.mode, Mode::Testing);
//! assert_eq!(settings.shadowing, ShadowingPolicy::Ignore);
//! assert_eq!(settings.max_resolution_depth, 100);
//! ```

use serde::{Deserialize, Serialize};

/// Default limit on nested resolutions.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 100;

/// Which registration routine `build_child` dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
	/// `Module::register_dependencies`
	#[default]
	Production,
	/// `Module::mock_registration`, falling back to production registration
	Testing,
}

/// Reaction to a non-override registration of a key an ancestor already provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowingPolicy {
	/// Emit a `tracing` warning.
	#[default]
	Warn,
	/// Warn, and panic in debug builds.
	Deny,
	/// Say nothing.
	Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
	pub mode: Mode,
	pub shadowing: ShadowingPolicy,
	pub max_resolution_depth: usize,
}

impl ContainerSettings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn production() -> Self {
		Self::default()
	}

	pub fn testing() -> Self {
		Self::default().with_mode(Mode::Testing)
	}

	pub fn with_mode(mut self, mode: Mode) -> Self {
		self.mode = mode;
		self
	}

	pub fn with_shadowing(mut self, shadowing: ShadowingPolicy) -> Self {
		self.shadowing = shadowing;
		self
	}

	pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
		self.max_resolution_depth = depth;
		self
	}
}

impl Default for ContainerSettings {
	fn default() -> Self {
		Self {
			mode: Mode::Production,
			shadowing: ShadowingPolicy::Warn,
			max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
		}
	}
}
