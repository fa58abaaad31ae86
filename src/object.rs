//! Scaled object snapshots and the keys the controller tracks them by.
//!
//! The controller treats a [`ScaledObject`] as opaque apart from its
//! namespace/name (to derive a [`ResourceKey`]) and its resource version
//! (used at the event source boundary to drop no-op updates).

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::KeyError;

/// Identity of a scaled object: `namespace/name`, or just `name` for objects
/// without a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Derives the key for an object the same way the cluster's meta-namespace
    /// key function does.
    ///
    /// # Errors
    /// Returns [`KeyError::MissingName`] when the object carries no name.
    pub fn from_object(object: &ScaledObject) -> Result<Self, KeyError> {
        let meta = &object.metadata;
        if meta.name.is_empty() {
            return Err(KeyError::MissingName);
        }

        match meta.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => Ok(Self(format!("{}/{}", ns, meta.name))),
            _ => Ok(Self(meta.name.clone())),
        }
    }

    /// Splits a key back into `(namespace, name)`.
    ///
    /// # Errors
    /// Returns [`KeyError::InvalidKey`] for keys with more than one separator
    /// or an empty segment.
    pub fn parse(key: &str) -> Result<(Option<&str>, &str), KeyError> {
        let mut parts = key.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) if !name.is_empty() => Ok((None, name)),
            (Some(ns), Some(name), None) if !ns.is_empty() && !name.is_empty() => Ok((Some(ns), name)),
            _ => Err(KeyError::InvalidKey(key.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Opaque change token assigned by the control plane
    #[serde(default)]
    pub resource_version: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTargetRef {
    #[serde(default)]
    pub deployment_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTrigger {
    #[serde(rename = "type")]
    pub trigger_type: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectSpec {
    #[serde(default)]
    pub scale_target_ref: ScaleTargetRef,

    /// Seconds between trigger polls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u64>,

    /// Seconds to wait after the last active trigger before scaling to zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_period: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replica_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replica_count: Option<i32>,

    #[serde(default)]
    pub triggers: Vec<ScaleTrigger>,
}

/// Snapshot of a scaled object as delivered by a notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObject {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: ScaledObjectSpec,
}

impl ScaledObject {
    pub fn new(
        namespace: &str,
        name: &str,
        resource_version: &str,
    ) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: Some(namespace.to_string()),
                resource_version: resource_version.to_string(),
                labels: BTreeMap::new(),
            },
            spec: ScaledObjectSpec::default(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn resource_version(&self) -> &str {
        &self.metadata.resource_version
    }
}
