//! The per-run device property store
//!
//! Tests publish what they learn about the responder here (its DMX footprint,
//! supported parameters, software version...) and later tests read it back.
//! Each property is expected to be written once. A second write is accepted
//! but logged, because it means two tests believe they provide the same fact.

use crate::{PropertyError, PropertyResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Key/value facts discovered about the responder under test
#[derive(Clone, Debug, Default)]
pub struct DeviceProperties {
    /// Every property name some registered test declares it provides
    declared: BTreeSet<String>,
    values: BTreeMap<String, Value>,
}

impl DeviceProperties {
    /// Create an empty store for the given catalog of provided property names
    pub fn new<I, S>(declared: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declared: declared.into_iter().map(Into::into).collect(),
            values: BTreeMap::new(),
        }
    }

    /// Read a property
    pub fn get(&self, name: &str) -> PropertyResult<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| PropertyError::Missing(name.to_string()))
    }

    /// Read a property and decode it into `T`
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> PropertyResult<T> {
        let value = self.get(name)?;
        serde_json::from_value(value.clone()).map_err(|e| PropertyError::WrongType {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Write a property, warning if it was already set
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if self.values.contains_key(&name) {
            tracing::warn!(property = %name, "Multiple sets of property {}", name);
        }
        if !self.declared.contains(&name) {
            tracing::debug!(property = %name, "Property set but not declared by any test");
        }
        self.values.insert(name, value.into());
    }

    /// Serialize `value` and write it as a property
    pub fn set_serialized<T: Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> PropertyResult<()> {
        let name = name.into();
        let value = serde_json::to_value(value).map_err(|e| PropertyError::WrongType {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        self.set(name, value);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The first name in `names` that has not been set
    pub fn first_missing<'a, I>(&self, names: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().find(|name| !self.contains(name))
    }

    /// Names some registered test declares it provides
    pub fn declared(&self) -> &BTreeSet<String> {
        &self.declared
    }

    /// Copy of every property set so far
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values.clone()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Display for DeviceProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let map: serde_json::Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        write!(f, "{}", Value::Object(map))
    }
}
