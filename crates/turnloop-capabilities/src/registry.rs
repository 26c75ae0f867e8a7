//! The read-only capability catalog (C3).

use std::collections::{BTreeMap, HashSet};

use crate::capability::{Capability, CapabilityKind, Layer};

/// A tool schema projection suitable for handing straight to an LLM API's
/// tool-definition list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolSchema {
    /// The capability's name.
    pub name: String,
    /// Human-readable description, sourced from the skill/tool subtype.
    pub description: String,
    /// JSON schema for the tool's input, defaulting to an empty object
    /// schema when the capability declares none.
    pub input_schema: serde_json::Value,
}

/// Errors raised while loading a registry from configuration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The configuration could not be parsed as YAML.
    #[error("invalid capability config: {0}")]
    InvalidConfig(#[from] serde_yaml::Error),
    /// Two capabilities declared the same name.
    #[error("duplicate capability name: {0}")]
    DuplicateName(String),
}

/// Loaded once per process from declarative config. Immutable after load;
/// filtering produces a new registry rather than mutating the source.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    by_name: BTreeMap<String, Capability>,
}

impl CapabilityRegistry {
    /// Build a registry from a list of capabilities already parsed by the
    /// caller.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateName`] if two capabilities share a
    /// name.
    pub fn from_capabilities(capabilities: Vec<Capability>) -> Result<Self, RegistryError> {
        let mut by_name = BTreeMap::new();
        for cap in capabilities {
            if by_name.insert(cap.name.clone(), cap).is_some() {
                return Err(RegistryError::DuplicateName(
                    by_name.keys().last().cloned().unwrap_or_default(),
                ));
            }
        }
        Ok(Self { by_name })
    }

    /// Parse a YAML document of capability declarations.
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidConfig`] on malformed YAML, or
    /// [`RegistryError::DuplicateName`] on a duplicate name.
    pub fn from_yaml(source: &str) -> Result<Self, RegistryError> {
        let capabilities: Vec<Capability> = serde_yaml::from_str(source)?;
        Self::from_capabilities(capabilities)
    }

    /// Look up a capability by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.by_name.get(name)
    }

    /// All capabilities carrying `tag`.
    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Vec<&Capability> {
        self.by_name
            .values()
            .filter(|c| c.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// All capabilities of a given kind.
    #[must_use]
    pub fn find_by_kind(&self, kind: CapabilityKind) -> Vec<&Capability> {
        self.by_name.values().filter(|c| c.kind == kind).collect()
    }

    /// All capabilities at a given layer.
    #[must_use]
    pub fn find_by_layer(&self, layer: Layer) -> Vec<&Capability> {
        self.by_name.values().filter(|c| c.layer == layer).collect()
    }

    /// Every capability in the registry.
    #[must_use]
    pub fn all(&self) -> Vec<&Capability> {
        self.by_name.values().collect()
    }

    /// Names of capabilities that must never run concurrently with another
    /// capability within the same turn, read once at start-up by the
    /// orchestrator's scheduler.
    #[must_use]
    pub fn serial_only_tools(&self) -> HashSet<String> {
        self.by_name
            .values()
            .filter(|c| c.serial_only)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Produce a new registry containing only capabilities admitted by
    /// `enabled`, except layer-1 capabilities which are always retained
    /// regardless of the map — the layer-1-always-on invariant.
    #[must_use]
    pub fn filter_by_enabled(&self, enabled: &BTreeMap<String, bool>) -> Self {
        let by_name = self
            .by_name
            .iter()
            .filter(|(name, cap)| {
                cap.layer == Layer::Core || enabled.get(*name).copied().unwrap_or(false)
            })
            .map(|(name, cap)| (name.clone(), cap.clone()))
            .collect();
        Self { by_name }
    }

    /// Project every `Tool`-kind capability into an LLM-facing schema
    /// listing.
    #[must_use]
    pub fn get_tool_schemas(&self) -> Vec<ToolSchema> {
        self.by_name
            .values()
            .filter(|c| c.kind == CapabilityKind::Tool)
            .map(|c| ToolSchema {
                name: c.name.clone(),
                description: c.subtype.clone(),
                input_schema: c
                    .input_schema
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}})),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Constraints, Cost};

    fn cap(name: &str, layer: Layer) -> Capability {
        Capability {
            name: name.into(),
            kind: CapabilityKind::Tool,
            subtype: "test".into(),
            provider: "system".into(),
            tags: vec![],
            priority: 0,
            cost: Cost::default(),
            constraints: Constraints::default(),
            input_schema: None,
            fallback_tool: None,
            skill_path: None,
            layer,
            cache_stable: false,
            serial_only: false,
        }
    }

    #[test]
    fn layer_one_survives_any_filter() {
        let registry = CapabilityRegistry::from_capabilities(vec![
            cap("core_tool", Layer::Core),
            cap("optional_tool", Layer::Dynamic),
        ])
        .unwrap();

        let enabled = BTreeMap::new();
        let filtered = registry.filter_by_enabled(&enabled);

        assert!(filtered.get("core_tool").is_some());
        assert!(filtered.get("optional_tool").is_none());
    }

    #[test]
    fn filter_respects_explicit_enablement() {
        let registry = CapabilityRegistry::from_capabilities(vec![cap("optional_tool", Layer::Dynamic)])
            .unwrap();
        let mut enabled = BTreeMap::new();
        enabled.insert("optional_tool".to_string(), true);
        let filtered = registry.filter_by_enabled(&enabled);
        assert!(filtered.get("optional_tool").is_some());
    }

    #[test]
    fn duplicate_names_rejected() {
        let result =
            CapabilityRegistry::from_capabilities(vec![cap("dup", Layer::Core), cap("dup", Layer::Core)]);
        assert!(matches!(result, Err(RegistryError::DuplicateName(_))));
    }

    #[test]
    fn tool_schemas_default_to_empty_object_schema() {
        let registry = CapabilityRegistry::from_capabilities(vec![cap("bare", Layer::Core)]).unwrap();
        let schemas = registry.get_tool_schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].input_schema["type"], "object");
    }
}
