//! Registration maps shared by builders and frozen containers

use crate::factory::{AffinityFactory, Factory, FactoryStore};
use crate::key::{Domain, Key, TypeIdentity};
use crate::metadata::RegistrationMetadata;
use crate::scope::{LocalValue, Locality, Scope, SharedValue};
use std::collections::HashMap;

/// Factories of one locality, per domain.
#[derive(Default, Clone)]
pub(crate) struct Partition {
	pub(crate) shared: FactoryStore<SharedValue>,
	pub(crate) affinity: FactoryStore<LocalValue>,
}

impl Partition {
	pub(crate) fn contains(&self, key: &Key) -> bool {
		match key.domain() {
			Domain::Default => self.shared.contains(key),
			Domain::Affinity => self.affinity.contains(key),
		}
	}

	pub(crate) fn scope_of(&self, key: &Key) -> Option<Scope> {
		match key.domain() {
			Domain::Default => self.shared.get(key).map(Factory::scope),
			Domain::Affinity => self.affinity.get(key).map(AffinityFactory::scope),
		}
	}

	pub(crate) fn keys(&self) -> impl Iterator<Item = &Key> {
		self.shared
			.iter()
			.map(|(key, _)| key)
			.chain(self.affinity.iter().map(|(key, _)| key))
	}

	pub(crate) fn len(&self) -> usize {
		self.shared.len() + self.affinity.len()
	}
}

/// Everything a builder accumulates and a container freezes.
#[derive(Default, Clone)]
pub(crate) struct Registry {
	pub(crate) local: Partition,
	pub(crate) inherited: Partition,
	pub(crate) inputs: HashMap<Key, SharedValue>,
	pub(crate) metadata: HashMap<(Locality, Key), RegistrationMetadata>,
	pub(crate) input_metadata: HashMap<Key, RegistrationMetadata>,
}

impl Registry {
	pub(crate) fn partition(&self, locality: Locality) -> &Partition {
		match locality {
			Locality::Inherited => &self.inherited,
			Locality::Local => &self.local,
		}
	}

	pub(crate) fn partition_mut(&mut self, locality: Locality) -> &mut Partition {
		match locality {
			Locality::Inherited => &mut self.inherited,
			Locality::Local => &mut self.local,
		}
	}

	pub(crate) fn contains(&self, key: &Key) -> bool {
		self.local.contains(key) || self.inherited.contains(key)
	}

	/// Registrations of the given type in the listed localities, any domain,
	/// described for error messages.
	pub(crate) fn describe_type(
		&self,
		type_identity: TypeIdentity,
		owner: &str,
		localities: &[Locality],
	) -> Vec<String> {
		let mut found = Vec::new();
		for &locality in localities {
			let partition = self.partition(locality);
			for key in partition.keys() {
				if key.type_identity() != type_identity {
					continue;
				}
				let scope = partition
					.scope_of(key)
					.map(|scope| scope.label())
					.unwrap_or("unknown");
				found.push(format!("{key} ({locality} {scope} in {owner})"));
			}
		}
		found
	}

	/// Inputs of the given type, described for error messages.
	pub(crate) fn describe_inputs(&self, type_identity: TypeIdentity, owner: &str) -> Vec<String> {
		self.inputs
			.keys()
			.filter(|key| key.type_identity() == type_identity)
			.map(|key| format!("{key} (input in {owner})"))
			.collect()
	}
}
