//! Dependency graph reports for development and debugging
//!
//! [`Container::diagnose`] snapshots every registration and input from the
//! root down to a container. The report prints as text and can be exported in
//! DOT format, which can be rendered using Graphviz.
//!
//! ## Example
//!
//! ```rust
//! use modwire_di::{RequirementSet, Root};
//!
//! struct Database;
//!
//! let mut builder = Root::production().builder();
//! builder.bind::<Database>().described("primary pool").singleton(|_| Ok(Database))?;
//! let container = builder.freeze(&RequirementSet::new());
//!
//! let report = container.diagnose();
//! assert!(report.to_string().contains("Database"));
//! assert!(report.to_dot().starts_with("digraph Containers {"));
//! assert_eq!(report.statistics().singleton_count, 1);
//! # Ok::<(), modwire_di::DiError>(())
//! ```

use crate::container::Container;
use crate::key::{Domain, Key};
use crate::metadata::{Origin, RegistrationMetadata};
use crate::scope::{Locality, Scope};
use std::fmt;
use std::sync::Arc;

/// One registration as seen by the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationEntry {
	pub key: String,
	pub type_name: &'static str,
	pub discriminator: Option<String>,
	pub domain: Domain,
	pub scope: Scope,
	pub locality: Locality,
	pub origin: Origin,
	/// `file:line` of the registration call site
	pub location: Option<String>,
	pub description: Option<String>,
}

/// An input provided at this level (not merely inherited from the parent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEntry {
	pub key: String,
	pub location: Option<String>,
}

/// Everything one container in the chain contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelReport {
	pub label: String,
	pub depth: usize,
	pub registrations: Vec<RegistrationEntry>,
	pub inputs: Vec<InputEntry>,
}

/// Snapshot of a container chain, root first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
	levels: Vec<LevelReport>,
}

impl Diagnostics {
	pub(crate) fn collect(container: &Container) -> Self {
		let mut levels = Vec::new();
		let mut current = Some(container);
		while let Some(level) = current {
			levels.push(level_report(level));
			current = level.parent();
		}
		levels.reverse();
		Self { levels }
	}

	pub fn levels(&self) -> &[LevelReport] {
		&self.levels
	}

	/// Generate DOT format output for Graphviz
	///
	/// Each container is a cluster; nodes are coloured by scope, local
	/// registrations are dashed and inputs are drawn as notes.
	pub fn to_dot(&self) -> String {
		let mut output = String::from("digraph Containers {\n");
		output.push_str("  rankdir=TB;\n");
		output.push_str("  node [shape=box, style=rounded];\n\n");

		for level in &self.levels {
			let depth = level.depth;
			output.push_str(&format!("  subgraph cluster_{depth} {{\n"));
			output.push_str(&format!(
				"    label=\"{} (depth {depth})\";\n",
				escape(&level.label)
			));
			output.push_str(&format!(
				"    \"level{depth}\" [label=\"{}\", shape=folder];\n",
				escape(&level.label)
			));

			for entry in &level.registrations {
				let color = match entry.scope {
					Scope::Singleton => "lightblue",
					Scope::Scoped => "lightgreen",
					Scope::Transient => "lightyellow",
				};
				let style = match entry.locality {
					Locality::Local => "\"filled,dashed\"",
					Locality::Inherited => "filled",
				};
				output.push_str(&format!(
					"    \"{depth}:{}\" [label=\"{}\\n({} {})\", fillcolor={color}, style={style}];\n",
					escape(&entry.key),
					escape(&entry.key),
					entry.locality,
					entry.scope,
				));
			}
			for input in &level.inputs {
				output.push_str(&format!(
					"    \"{depth}:input:{}\" [label=\"{}\\n(input)\", shape=note];\n",
					escape(&input.key),
					escape(&input.key),
				));
			}
			output.push_str("  }\n");
		}

		output.push('\n');
		for pair in self.levels.windows(2) {
			output.push_str(&format!(
				"  \"level{}\" -> \"level{}\";\n",
				pair[0].depth, pair[1].depth
			));
		}

		output.push_str("}\n");
		output
	}

	/// Get statistics about the reported chain
	pub fn statistics(&self) -> DiagnosticStatistics {
		let registrations = || self.levels.iter().flat_map(|level| &level.registrations);
		let with_scope = |scope: Scope| registrations().filter(|entry| entry.scope == scope).count();

		DiagnosticStatistics {
			level_count: self.levels.len(),
			registration_count: registrations().count(),
			input_count: self.levels.iter().map(|level| level.inputs.len()).sum(),
			transient_count: with_scope(Scope::Transient),
			singleton_count: with_scope(Scope::Singleton),
			scoped_count: with_scope(Scope::Scoped),
			local_count: registrations()
				.filter(|entry| entry.locality == Locality::Local)
				.count(),
			affinity_count: registrations()
				.filter(|entry| entry.domain == Domain::Affinity)
				.count(),
		}
	}
}

/// Statistics about a container chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticStatistics {
	/// Number of containers from the root down
	pub level_count: usize,
	pub registration_count: usize,
	pub input_count: usize,
	pub transient_count: usize,
	pub singleton_count: usize,
	pub scoped_count: usize,
	pub local_count: usize,
	pub affinity_count: usize,
}

impl fmt::Display for Diagnostics {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for level in &self.levels {
			let indent = "  ".repeat(level.depth);
			writeln!(f, "{indent}{} (depth {})", level.label, level.depth)?;
			if level.registrations.is_empty() && level.inputs.is_empty() {
				writeln!(f, "{indent}  (empty)")?;
			}
			for entry in &level.registrations {
				write!(
					f,
					"{indent}  {:<9} {:<9} {}",
					entry.scope.label(),
					entry.locality.label(),
					entry.key
				)?;
				if entry.origin == Origin::Imported {
					f.write_str(" [imported]")?;
				}
				if let Some(location) = &entry.location {
					write!(f, " at {location}")?;
				}
				if let Some(description) = &entry.description {
					write!(f, ": {description}")?;
				}
				writeln!(f)?;
			}
			for input in &level.inputs {
				write!(f, "{indent}  {:<19} {}", "input", input.key)?;
				if let Some(location) = &input.location {
					write!(f, " at {location}")?;
				}
				writeln!(f)?;
			}
		}
		Ok(())
	}
}

fn level_report(container: &Container) -> LevelReport {
	let registry = container.registry();
	let mut registrations = Vec::new();
	for locality in [Locality::Inherited, Locality::Local] {
		let partition = registry.partition(locality);
		let shared = partition
			.shared
			.iter()
			.map(|(key, factory)| (key, factory.scope()));
		let affinity = partition
			.affinity
			.iter()
			.map(|(key, factory)| (key, factory.scope()));
		for (key, scope) in shared.chain(affinity) {
			let metadata = registry.metadata.get(&(locality, key.clone()));
			registrations.push(registration_entry(key, scope, locality, metadata));
		}
	}
	registrations.sort_by(|a, b| (a.locality, &a.key).cmp(&(b.locality, &b.key)));

	let parent_inputs = container.parent().map(|parent| &parent.registry().inputs);
	let mut inputs: Vec<InputEntry> = registry
		.inputs
		.iter()
		.filter(|(key, value)| {
			!parent_inputs
				.and_then(|inputs| inputs.get(*key))
				.is_some_and(|inherited| Arc::ptr_eq(inherited, *value))
		})
		.map(|(key, _)| InputEntry {
			key: key.to_string(),
			location: registry.input_metadata.get(key).map(RegistrationMetadata::location),
		})
		.collect();
	inputs.sort_by(|a, b| a.key.cmp(&b.key));

	LevelReport {
		label: container.label().to_string(),
		depth: container.depth(),
		registrations,
		inputs,
	}
}

fn registration_entry(
	key: &Key,
	scope: Scope,
	locality: Locality,
	metadata: Option<&RegistrationMetadata>,
) -> RegistrationEntry {
	RegistrationEntry {
		key: key.to_string(),
		type_name: key.type_name(),
		discriminator: key.discriminator().map(|d| format!("{d:?}")),
		domain: key.domain(),
		scope,
		locality,
		origin: metadata.map_or(Origin::Explicit, RegistrationMetadata::origin),
		location: metadata.map(RegistrationMetadata::location),
		description: metadata
			.and_then(RegistrationMetadata::description)
			.map(str::to_owned),
	}
}

fn escape(text: &str) -> String {
	text.replace('\\', "\\\\").replace('"', "\\\"")
}
