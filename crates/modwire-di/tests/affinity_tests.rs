//! Affinity domain and resolution safety tests
//!
//! These tests verify that:
//! 1. Affinity values resolve as `Rc` on the affinity thread only
//! 2. Keys are checked against the domain of the resolution path
//! 3. Downcast failures surface as type mismatches
//! 4. Cycles and runaway depth are reported instead of hanging

use modwire_di::{ContainerSettings, DiError, Domain, Key, ResolutionFailure, Root};
use rstest::rstest;
use std::cell::Cell;
use std::rc::Rc;
use std::thread;

/// UI-style handle that must stay on one thread.
struct Widget {
	clicks: Cell<u32>,
}

struct Theme(&'static str);

struct Ping;

#[derive(Debug)]
struct Pong;

struct Layer1;
struct Layer2;
struct Layer3;

fn widget_container() -> modwire_di::Container {
	let mut builder = Root::production().builder();
	builder
		.bind_affinity::<Widget>()
		.singleton(|_| {
			Ok(Widget {
				clicks: Cell::new(0),
			})
		})
		.unwrap();
	builder
		.bind_affinity::<Theme>()
		.keyed("dark")
		.transient(|_| Ok(Theme("dark")))
		.unwrap();
	builder.freeze_unchecked()
}

#[rstest]
fn test_affinity_singleton_is_shared_on_its_thread() {
	// Arrange
	let container = widget_container();

	// Act
	let first = container.resolve_affinity::<Widget>().unwrap();
	first.clicks.set(first.clicks.get() + 1);
	let second = container.resolve_affinity::<Widget>().unwrap();

	// Assert
	assert!(Rc::ptr_eq(&first, &second));
	assert_eq!(second.clicks.get(), 1);
	assert_eq!(
		container.resolve_affinity_keyed::<Theme>("dark").unwrap().0,
		"dark"
	);
}

#[rstest]
fn test_affinity_resolution_off_thread_is_rejected() {
	// Arrange
	let container = widget_container();
	let remote = container.clone();

	// Act
	let result = thread::spawn(move || match remote.resolve_affinity::<Widget>() {
		Err(error) => Some(error),
		Ok(_) => None,
	})
	.join()
	.unwrap();

	// Assert
	match result {
		Some(DiError::AffinityViolation { key }) => assert_eq!(key, "Widget@affinity"),
		other => panic!("Expected AffinityViolation, got {:?}", other),
	}
}

#[rstest]
fn test_explicit_affinity_thread_is_honored() {
	// Arrange: the designated thread is one that has already finished
	let elsewhere = thread::spawn(|| thread::current().id()).join().unwrap();
	let mut builder = Root::production()
		.with_affinity_thread(elsewhere)
		.builder();
	builder
		.bind_affinity::<Widget>()
		.transient(|_| {
			Ok(Widget {
				clicks: Cell::new(0),
			})
		})
		.unwrap();
	let container = builder.freeze_unchecked();

	// Act
	let result = container.resolve_affinity::<Widget>();

	// Assert
	assert!(matches!(result, Err(DiError::AffinityViolation { .. })));
}

#[rstest]
fn test_shared_domain_still_resolves_off_thread() {
	// Arrange
	let mut builder = Root::production().builder();
	builder.singleton::<u64>(|_| Ok(7)).unwrap();
	let container = builder.freeze_unchecked();
	let remote = container.clone();

	// Act
	let value = thread::spawn(move || *remote.resolve::<u64>().unwrap())
		.join()
		.unwrap();

	// Assert
	assert_eq!(value, 7);
}

#[rstest]
#[case(Key::keyed::<Theme>("dark").with_domain(Domain::Affinity), Domain::Default)]
#[case(Key::of::<Widget>(), Domain::Affinity)]
fn test_key_from_other_domain_is_rejected(#[case] key: Key, #[case] requested: Domain) {
	// Arrange
	let container = widget_container();

	// Act
	let error = match requested {
		Domain::Default => container.resolve_by_key::<Theme>(&key).err(),
		Domain::Affinity => container.resolve_affinity_by_key::<Widget>(&key).err(),
	};

	// Assert
	match error {
		Some(DiError::ResolutionFailed {
			failure: ResolutionFailure::WrongDomain { requested: reported },
			..
		}) => assert_eq!(reported, requested),
		other => panic!("Expected WrongDomain, got {:?}", other),
	}
}

#[rstest]
fn test_typed_path_through_wrong_domain_is_not_found() {
	let container = widget_container();

	let error = container.resolve_keyed::<Theme>("dark").err().unwrap();

	assert!(error.is_not_found());
}

#[rstest]
fn test_resolve_by_key_with_wrong_type_is_a_mismatch() {
	// Arrange
	let mut builder = Root::production().builder();
	builder.singleton::<u32>(|_| Ok(3)).unwrap();
	let container = builder.freeze_unchecked();

	// Act
	let error = container.resolve_by_key::<String>(&Key::of::<u32>()).unwrap_err();

	// Assert
	match error {
		DiError::ResolutionFailed {
			key,
			failure: ResolutionFailure::TypeMismatch { expected },
		} => {
			assert_eq!(key, "u32");
			assert_eq!(expected, std::any::type_name::<String>());
		}
		other => panic!("Expected TypeMismatch, got {:?}", other),
	}
}

#[rstest]
fn test_circular_dependency_reports_its_path() {
	// Arrange
	let mut builder = Root::production().builder();
	builder
		.transient::<Ping>(|c| {
			c.resolve::<Pong>()?;
			Ok(Ping)
		})
		.unwrap();
	builder
		.transient::<Pong>(|c| {
			c.resolve::<Ping>()?;
			Ok(Pong)
		})
		.unwrap();
	let container = builder.freeze_unchecked();

	// Act
	let error = container.resolve::<Pong>().unwrap_err();

	// Assert
	match error {
		DiError::CircularDependency { type_name, path } => {
			assert_eq!(type_name, "Pong");
			assert_eq!(path, "Pong -> Ping -> Pong");
		}
		other => panic!("Expected CircularDependency, got {:?}", other),
	}
	// The guard stack is unwound, so unrelated resolutions still work
	assert!(container.resolve::<Layer1>().err().unwrap().is_not_found());
}

#[rstest]
fn test_singleton_cycle_does_not_deadlock() {
	// Arrange
	let mut builder = Root::production().builder();
	builder
		.singleton::<Ping>(|c| {
			c.resolve::<Pong>()?;
			Ok(Ping)
		})
		.unwrap();
	builder
		.scoped::<Pong>(|c| {
			c.resolve::<Ping>()?;
			Ok(Pong)
		})
		.unwrap();
	let container = builder.freeze_unchecked();

	// Act
	let result = container.resolve::<Ping>();

	// Assert
	assert!(matches!(result, Err(DiError::CircularDependency { .. })));
}

#[rstest]
#[case(2, false)]
#[case(3, true)]
fn test_max_resolution_depth(#[case] max_depth: usize, #[case] resolves: bool) {
	// Arrange
	let settings = ContainerSettings::production().with_max_resolution_depth(max_depth);
	let mut builder = Root::with_settings(settings).builder();
	builder
		.transient::<Layer1>(|c| {
			c.resolve::<Layer2>()?;
			Ok(Layer1)
		})
		.unwrap();
	builder
		.transient::<Layer2>(|c| {
			c.resolve::<Layer3>()?;
			Ok(Layer2)
		})
		.unwrap();
	builder.transient::<Layer3>(|_| Ok(Layer3)).unwrap();
	let container = builder.freeze_unchecked();

	// Act
	let result = container.resolve::<Layer1>();

	// Assert
	if resolves {
		assert!(result.is_ok());
	} else {
		assert!(matches!(result, Err(DiError::MaxDepthExceeded(3))));
	}
}
