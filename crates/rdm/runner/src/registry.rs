//! Test registry: every test available to a runner
//!
//! Registration enforces that each device property has a single provider.
//! Registering a test does not mean it will run; a run may select a subset.

use crate::{RunnerError, RunnerResult, TestDefinition};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Registry of test definitions, in registration order
#[derive(Clone, Debug, Default)]
pub struct TestRegistry {
    definitions: Vec<Arc<TestDefinition>>,
    by_name: HashMap<String, usize>,
    /// Property name → name of the test that provides it
    providers: HashMap<String, String>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a test
    ///
    /// Fails without modifying the registry if the name is taken or any
    /// provided property already has a provider.
    pub fn register(&mut self, definition: TestDefinition) -> RunnerResult<()> {
        if self.by_name.contains_key(definition.name()) {
            return Err(RunnerError::DuplicateTest(definition.name().to_string()));
        }
        for property in definition.provided() {
            if let Some(existing) = self.providers.get(property) {
                return Err(RunnerError::DuplicateProperty {
                    property: property.clone(),
                    existing: existing.clone(),
                    declared_by: definition.name().to_string(),
                });
            }
        }

        for property in definition.provided() {
            self.providers
                .insert(property.clone(), definition.name().to_string());
        }
        self.by_name
            .insert(definition.name().to_string(), self.definitions.len());
        tracing::debug!(test = %definition.name(), "Test registered");
        self.definitions.push(Arc::new(definition));
        Ok(())
    }

    /// Register a batch of tests, stopping at the first failure
    pub fn register_all(
        &mut self,
        definitions: impl IntoIterator<Item = TestDefinition>,
    ) -> RunnerResult<usize> {
        let mut count = 0;
        for definition in definitions {
            self.register(definition)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TestDefinition>> {
        self.by_name.get(name).map(|&i| &self.definitions[i])
    }

    /// Look up a test, failing if it is not registered
    pub fn require(&self, name: &str) -> RunnerResult<&Arc<TestDefinition>> {
        self.get(name)
            .ok_or_else(|| RunnerError::UnknownTest(name.to_string()))
    }

    /// The test that provides `property`
    pub fn provider_of(&self, property: &str) -> Option<&Arc<TestDefinition>> {
        self.providers.get(property).and_then(|name| self.get(name))
    }

    /// All property names some test provides
    pub fn provided_properties(&self) -> BTreeSet<String> {
        self.providers.keys().cloned().collect()
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<TestDefinition>> {
        self.definitions.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
