//! Diagnostics report tests
//!
//! These tests verify that:
//! 1. A report covers every container from the root down
//! 2. Imported registrations and call sites are visible
//! 3. DOT export links the levels in order

use modwire_di::{
	Builder, Component, DiResult, Domain, MockBuilder, Module, Origin, RequirementSet, Root,
	Scope,
};
use rstest::rstest;

struct Database;

struct Profile;

struct Avatar;

struct UserId(u64);

struct StorageModule;

impl Module for StorageModule {
	const MOCKABLE: bool = true;

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		builder.singleton::<Avatar>(|_| Ok(Avatar))
	}

	fn mock_registration(builder: &mut MockBuilder<'_>) -> DiResult<()> {
		builder
			.bind::<Avatar>()
			.described("in-memory avatars")
			.singleton(|_| Ok(Avatar))
	}

	fn from_component(_: Component<Self>) -> Self {
		StorageModule
	}
}

struct ProfileModule(Component<ProfileModule>);

impl Module for ProfileModule {
	const MOCKABLE: bool = true;

	fn requirements() -> RequirementSet {
		RequirementSet::new()
			.require::<Database>()
			.require::<Avatar>()
			.local::<Profile>()
			.input::<UserId>()
	}

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		builder.singleton::<Avatar>(|_| Ok(Avatar))?;
		builder.bind::<Profile>().local().scoped(|_| Ok(Profile))
	}

	fn mock_registration(builder: &mut MockBuilder<'_>) -> DiResult<()> {
		builder.import_dependencies::<StorageModule>()?;
		builder.bind::<Profile>().local().scoped(|_| Ok(Profile))
	}

	fn from_component(component: Component<Self>) -> Self {
		Self(component)
	}
}

fn profile(root: Root) -> ProfileModule {
	let mut builder = root.builder();
	builder
		.bind::<Database>()
		.described("primary pool")
		.singleton(|_| Ok(Database))
		.unwrap();
	let root = builder.freeze(&RequirementSet::new().require::<Database>());
	root.build_child_with::<ProfileModule, _>(|builder| {
		builder.provide_input(UserId(11));
		Ok(())
	})
	.unwrap()
}

#[rstest]
fn test_report_covers_the_whole_chain() {
	// Arrange
	let module = profile(Root::production());

	// Act
	let report = module.0.diagnose();

	// Assert
	let levels = report.levels();
	assert_eq!(levels.len(), 2);
	assert_eq!((levels[0].label.as_str(), levels[0].depth), ("root", 0));
	assert_eq!((levels[1].label.as_str(), levels[1].depth), ("ProfileModule", 1));
	assert_eq!(levels[1].inputs.len(), 1);
	assert_eq!(levels[1].inputs[0].key, "UserId");
	assert_eq!(module.0.require_input::<UserId>().0, 11);

	let database = &levels[0].registrations[0];
	assert_eq!(database.key, "Database");
	assert_eq!(database.scope, Scope::Singleton);
	assert_eq!(database.domain, Domain::Default);
	assert_eq!(database.description.as_deref(), Some("primary pool"));
	assert!(
		database
			.location
			.as_deref()
			.is_some_and(|location| location.contains("diagnostics_tests.rs"))
	);
}

#[rstest]
fn test_statistics_count_the_chain() {
	let module = profile(Root::production());

	let stats = module.0.diagnose().statistics();

	assert_eq!(stats.level_count, 2);
	assert_eq!(stats.registration_count, 3);
	assert_eq!(stats.singleton_count, 2);
	assert_eq!(stats.scoped_count, 1);
	assert_eq!(stats.transient_count, 0);
	assert_eq!(stats.local_count, 1);
	assert_eq!(stats.input_count, 1);
	assert_eq!(stats.affinity_count, 0);
}

#[rstest]
fn test_imported_registrations_are_marked() {
	// Arrange
	let module = profile(Root::testing());

	// Act
	let report = module.0.diagnose();

	// Assert
	let avatar = report.levels()[1]
		.registrations
		.iter()
		.find(|entry| entry.key == "Avatar")
		.unwrap();
	assert_eq!(avatar.origin, Origin::Imported);
	assert_eq!(avatar.description.as_deref(), Some("in-memory avatars"));
	assert!(report.to_string().contains("[imported]"));
}

#[rstest]
fn test_text_report_indents_by_depth() {
	// Arrange
	let module = profile(Root::production());

	// Act
	let text = module.0.diagnose().to_string();

	// Assert
	assert!(text.starts_with("root (depth 0)\n"));
	assert!(text.contains("\n  ProfileModule (depth 1)\n"));
	assert!(text.contains("primary pool"));
	assert!(text.contains("input"));
}

#[rstest]
fn test_dot_export_links_levels() {
	// Arrange
	let module = profile(Root::production());

	// Act
	let dot = module.0.diagnose().to_dot();

	// Assert
	assert!(dot.starts_with("digraph Containers {"));
	assert!(dot.contains("subgraph cluster_0"));
	assert!(dot.contains("subgraph cluster_1"));
	assert!(dot.contains("\"level0\" -> \"level1\";"));
	assert!(dot.contains("fillcolor=lightgreen, style=\"filled,dashed\""));
	assert!(dot.contains("shape=note"));
	assert!(dot.trim_end().ends_with('}'));
}
