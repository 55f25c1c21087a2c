//! Mock composition tests
//!
//! These tests verify that:
//! 1. Testing mode builds children from their mock registration
//! 2. Override closures win over mock and production registrations
//! 3. Imports are first-in-wins and explicit registrations replace them
//! 4. Plain mock mode defers to values an ancestor already provides
//! 5. Missing mock requirements panic unless suppressed
//! 6. Modules without a mock are validated like a production freeze

use modwire_di::{
	Builder, Component, DiResult, Key, MockBuilder, Mode, Module, RequirementSet, Root,
};
use rstest::rstest;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_test_writer()
		.with_env_filter(EnvFilter::from_default_env())
		.try_init();
}

#[derive(Debug)]
struct ApiClient {
	name: &'static str,
}

struct ResponseCache;

struct Feed {
	source: &'static str,
}

struct Legacy(&'static str);

struct Missing;

struct Extra;

/// Provides a live `ApiClient`, or a canned one in tests.
struct NetworkModule;

impl Module for NetworkModule {
	const MOCKABLE: bool = true;

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		builder.singleton::<ApiClient>(|_| Ok(ApiClient { name: "live" }))
	}

	fn mock_registration(builder: &mut MockBuilder<'_>) -> DiResult<()> {
		builder.singleton::<ApiClient>(|_| Ok(ApiClient { name: "mock" }))
	}

	fn from_component(_: Component<Self>) -> Self {
		NetworkModule
	}
}

/// A second network stack exporting a conflicting `ApiClient`.
struct OfflineModule;

impl Module for OfflineModule {
	const MOCKABLE: bool = true;

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		builder.singleton::<ResponseCache>(|_| Ok(ResponseCache))
	}

	fn mock_registration(builder: &mut MockBuilder<'_>) -> DiResult<()> {
		builder.singleton::<ApiClient>(|_| Ok(ApiClient { name: "offline" }))?;
		builder.singleton::<ResponseCache>(|_| Ok(ResponseCache))
	}

	fn from_component(_: Component<Self>) -> Self {
		OfflineModule
	}
}

struct FeedModule(Component<FeedModule>);

/// Registers the local `Feed` through either builder.
trait FeedSink {
	fn feed(&mut self) -> DiResult<()>;
}

impl FeedSink for Builder {
	fn feed(&mut self) -> DiResult<()> {
		self.bind::<Feed>().local().transient(|c| {
			Ok(Feed {
				source: c.resolve::<ApiClient>()?.name,
			})
		})
	}
}

impl FeedSink for MockBuilder<'_> {
	fn feed(&mut self) -> DiResult<()> {
		self.bind::<Feed>().local().transient(|c| {
			Ok(Feed {
				source: c.resolve::<ApiClient>()?.name,
			})
		})
	}
}

impl Module for FeedModule {
	const MOCKABLE: bool = true;

	fn requirements() -> RequirementSet {
		RequirementSet::new().require::<ApiClient>().local::<Feed>()
	}

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		NetworkModule::register_dependencies(builder)?;
		builder.feed()
	}

	fn mock_registration(builder: &mut MockBuilder<'_>) -> DiResult<()> {
		builder.import_dependencies::<NetworkModule>()?;
		builder.feed()
	}

	fn from_component(component: Component<Self>) -> Self {
		Self(component)
	}
}

/// Imports both network stacks; the first import owns `ApiClient`.
struct ComboModule(Component<ComboModule>);

impl Module for ComboModule {
	const MOCKABLE: bool = true;

	fn requirements() -> RequirementSet {
		RequirementSet::new()
			.require::<ApiClient>()
			.require::<ResponseCache>()
	}

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		NetworkModule::register_dependencies(builder)?;
		OfflineModule::register_dependencies(builder)
	}

	fn mock_registration(builder: &mut MockBuilder<'_>) -> DiResult<()> {
		builder.import_dependencies::<NetworkModule>()?;
		builder.import_dependencies::<OfflineModule>()
	}

	fn from_component(component: Component<Self>) -> Self {
		Self(component)
	}
}

/// Imports `NetworkModule` and then registers `ApiClient` itself.
struct ExplicitModule(Component<ExplicitModule>);

impl Module for ExplicitModule {
	const MOCKABLE: bool = true;

	fn requirements() -> RequirementSet {
		RequirementSet::new().require::<ApiClient>()
	}

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		NetworkModule::register_dependencies(builder)
	}

	fn mock_registration(builder: &mut MockBuilder<'_>) -> DiResult<()> {
		builder.import_dependencies::<NetworkModule>()?;
		builder.singleton::<ApiClient>(|_| Ok(ApiClient { name: "explicit" }))
	}

	fn from_component(component: Component<Self>) -> Self {
		Self(component)
	}
}

/// Has no mock registration. `Extra` is optional and never provided.
struct LegacyModule(Component<LegacyModule>);

impl Module for LegacyModule {
	fn requirements() -> RequirementSet {
		RequirementSet::new().require::<Legacy>().optional::<Extra>()
	}

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		builder.singleton::<Legacy>(|_| Ok(Legacy("production")))
	}

	fn from_component(component: Component<Self>) -> Self {
		Self(component)
	}
}

/// Requires `Missing` but its mock registers nothing.
struct IncompleteModule(Component<IncompleteModule>);

impl Module for IncompleteModule {
	const MOCKABLE: bool = true;

	fn requirements() -> RequirementSet {
		RequirementSet::new().require::<Missing>()
	}

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		builder.singleton::<Missing>(|_| Ok(Missing))
	}

	fn from_component(component: Component<Self>) -> Self {
		Self(component)
	}
}

struct SuppressedModule(Component<SuppressedModule>);

impl Module for SuppressedModule {
	const MOCKABLE: bool = true;

	fn requirements() -> RequirementSet {
		RequirementSet::new().require::<Missing>()
	}

	fn register_dependencies(builder: &mut Builder) -> DiResult<()> {
		builder.singleton::<Missing>(|_| Ok(Missing))
	}

	fn mock_registration(builder: &mut MockBuilder<'_>) -> DiResult<()> {
		builder.suppress_missing_requirement_assertions();
		Ok(())
	}

	fn from_component(component: Component<Self>) -> Self {
		Self(component)
	}
}

/// Optional `Extra` is checked in mock mode too.
struct OptionalExtraModule(Component<OptionalExtraModule>);

impl Module for OptionalExtraModule {
	const MOCKABLE: bool = true;

	fn requirements() -> RequirementSet {
		RequirementSet::new().optional::<Extra>()
	}

	fn register_dependencies(_builder: &mut Builder) -> DiResult<()> {
		Ok(())
	}

	fn from_component(component: Component<Self>) -> Self {
		Self(component)
	}
}

#[rstest]
fn test_testing_mode_uses_mock_registration() {
	// Arrange
	init_tracing();
	let root = Root::testing().builder().freeze_unchecked();

	// Act
	let feed = root.build_child::<FeedModule>().unwrap();

	// Assert
	assert_eq!(root.mode(), Mode::Testing);
	assert_eq!(feed.0.resolve::<Feed>().unwrap().source, "mock");
}

#[rstest]
fn test_production_mode_uses_production_registration() {
	let root = Root::production().builder().freeze_unchecked();

	let feed = root.build_child::<FeedModule>().unwrap();

	assert_eq!(feed.0.resolve::<Feed>().unwrap().source, "live");
}

#[rstest]
fn test_override_beats_mock_registration() {
	// Arrange
	init_tracing();
	let root = Root::testing().builder().freeze_unchecked();

	// Act
	let feed = root
		.build_child_mocked::<FeedModule, _, _>(
			|_| Ok(()),
			|mock| {
				assert!(mock.is_override_mode());
				mock.singleton::<ApiClient>(|_| Ok(ApiClient { name: "override" }))
			},
		)
		.unwrap();

	// Assert
	assert_eq!(feed.0.resolve::<ApiClient>().unwrap().name, "override");
	assert_eq!(feed.0.resolve::<Feed>().unwrap().source, "override");
}

#[rstest]
fn test_override_beats_parent_production_value() {
	// Arrange
	let mut builder = Root::testing().builder();
	builder
		.singleton::<ApiClient>(|_| Ok(ApiClient { name: "root" }))
		.unwrap();
	let root = builder.freeze_unchecked();

	// Act
	let feed = root
		.build_child_mocked::<FeedModule, _, _>(
			|_| Ok(()),
			|mock| mock.singleton::<ApiClient>(|_| Ok(ApiClient { name: "override" })),
		)
		.unwrap();

	// Assert
	assert_eq!(root.resolve::<ApiClient>().unwrap().name, "root");
	assert_eq!(feed.0.resolve::<Feed>().unwrap().source, "override");
}

#[rstest]
fn test_plain_mock_mode_keeps_parent_value() {
	// Arrange
	let mut builder = Root::testing().builder();
	builder
		.singleton::<ApiClient>(|_| Ok(ApiClient { name: "root" }))
		.unwrap();
	let root = builder.freeze_unchecked();

	// Act
	let feed = root.build_child::<FeedModule>().unwrap();

	// Assert: the import of NetworkModule does not shadow the root client
	assert_eq!(feed.0.resolve::<Feed>().unwrap().source, "root");
	assert!(!feed.0.contains(&Key::of::<ApiClient>()));
}

#[rstest]
fn test_import_is_first_in_wins() {
	// Arrange
	let root = Root::testing().builder().freeze_unchecked();

	// Act
	let combo = root
		.build_child_mocked::<ComboModule, _, _>(
			|_| Ok(()),
			|mock| {
				assert!(mock.imported_keys().contains(&Key::of::<ApiClient>()));
				assert!(mock.imported_keys().contains(&Key::of::<ResponseCache>()));
				assert!(mock.explicit_keys().is_empty());
				Ok(())
			},
		)
		.unwrap();

	// Assert
	assert_eq!(combo.0.resolve::<ApiClient>().unwrap().name, "mock");
	assert!(combo.0.resolve::<ResponseCache>().is_ok());
}

#[rstest]
fn test_explicit_registration_replaces_import() {
	// Arrange
	init_tracing();
	let root = Root::testing().builder().freeze_unchecked();

	// Act
	let module = root
		.build_child_mocked::<ExplicitModule, _, _>(
			|_| Ok(()),
			|mock| {
				assert_eq!(mock.redundant_registrations(), vec![Key::of::<ApiClient>()]);
				Ok(())
			},
		)
		.unwrap();

	// Assert
	assert_eq!(module.0.resolve::<ApiClient>().unwrap().name, "explicit");
}

#[rstest]
fn test_module_without_mock_falls_back_to_production() {
	// Arrange
	init_tracing();
	let root = Root::testing().builder().freeze_unchecked();

	// Act
	let legacy = root.build_child::<LegacyModule>().unwrap();

	// Assert
	assert_eq!(legacy.0.resolve::<Legacy>().unwrap().0, "production");
}

#[rstest]
fn test_fallback_ignores_missing_optional_requirement() {
	// Arrange
	init_tracing();
	let root = Root::testing().builder().freeze_unchecked();

	// Act
	let legacy = root.build_child::<LegacyModule>().unwrap();

	// Assert
	assert!(legacy.0.optional::<Extra>().is_none());
	assert_eq!(legacy.0.require::<Legacy>().0, "production");
}

#[rstest]
#[should_panic(expected = "missing inherited requirement Missing")]
fn test_missing_mock_requirement_panics() {
	let root = Root::testing().builder().freeze_unchecked();

	let _ = root.build_child::<IncompleteModule>();
}

#[rstest]
fn test_suppressed_missing_requirements_still_build() {
	// Arrange
	init_tracing();
	let root = Root::testing().builder().freeze_unchecked();

	// Act
	let module = root.build_child::<SuppressedModule>().unwrap();

	// Assert
	let error = module.0.resolve::<Missing>().err().unwrap();
	assert!(error.is_not_found());
}

#[rstest]
#[should_panic(expected = "Extra")]
fn test_optional_requirement_checked_in_mock_mode() {
	let root = Root::testing().builder().freeze_unchecked();

	let _ = root.build_child::<OptionalExtraModule>();
}

#[rstest]
fn test_optional_requirement_ignored_in_production() {
	let root = Root::production().builder().freeze_unchecked();

	let module = root.build_child::<OptionalExtraModule>().unwrap();

	assert!(module.0.optional::<Extra>().is_none());
}

#[rstest]
fn test_override_closure_sees_parent() {
	// Arrange
	let root = Root::testing().builder().freeze_unchecked();

	// Act
	let result = root.build_child_mocked::<LegacyModule, _, _>(
		|_| Ok(()),
		|mock| {
			assert_eq!(mock.parent().map(|parent| parent.depth()), Some(0));
			mock.bind::<Legacy>()
				.singleton(|_| Ok(Legacy("override")))
		},
	);

	// Assert
	assert_eq!(result.unwrap().0.resolve::<Legacy>().unwrap().0, "override");
}
