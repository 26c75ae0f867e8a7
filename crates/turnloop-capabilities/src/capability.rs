//! The capability data model (C3).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What kind of thing a capability represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// A direct function call exposed to the model.
    Tool,
    /// A contributor of domain prompts/workflows rather than a function call.
    Skill,
    /// An inline code runner.
    Code,
}

/// Loading tier. Layer-1 capabilities are always admitted into a filtered
/// registry regardless of instance configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Core, always-loaded capability.
    Core = 1,
    /// Dynamically enabled capability.
    Dynamic = 2,
}

/// Estimated cost of invoking a capability, used for adaptive ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    /// Rough wall-clock seconds.
    pub time: f64,
    /// Rough cost in fractional dollars.
    pub money: f64,
}

/// Preconditions a capability requires before it can run in a given
/// context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// Named external API that must be listed in the context's available
    /// APIs, if any.
    #[serde(default)]
    pub requires_api: Option<String>,
    /// Whether the capability needs outbound network access.
    #[serde(default)]
    pub requires_network: bool,
    /// Whether the capability needs an authenticated session.
    #[serde(default)]
    pub requires_auth: bool,
    /// Whether the capability is for internal orchestration only and must
    /// never be exposed directly to the model.
    #[serde(default)]
    pub internal_use_only: bool,
}

/// A unifying descriptor for a tool, a skill, or an inline code runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    /// Unique name.
    pub name: String,
    /// What kind of capability this is.
    pub kind: CapabilityKind,
    /// A finer-grained classification within `kind` (e.g. `"web_search"`).
    pub subtype: String,
    /// Which provider implements this capability (e.g. `"system"`,
    /// `"builtin"`, a plugin name).
    pub provider: String,
    /// Free-form tags used for `find_by_tag`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// 0-100; higher runs first when multiple capabilities compete for a
    /// phase slot.
    #[serde(default)]
    pub priority: u8,
    /// Estimated cost of invocation.
    #[serde(default)]
    pub cost: Cost,
    /// Preconditions for admissibility.
    #[serde(default)]
    pub constraints: Constraints,
    /// JSON schema describing the tool's input, if it takes structured
    /// input.
    #[serde(default)]
    pub input_schema: Option<serde_json::Value>,
    /// A tool to fall back to for models without native support for this
    /// capability (mainly relevant to skills).
    #[serde(default)]
    pub fallback_tool: Option<String>,
    /// Filesystem path to a skill's prompt/workflow definition.
    #[serde(default)]
    pub skill_path: Option<String>,
    /// Loading tier.
    pub layer: Layer,
    /// Whether this capability's prompt contribution is cache-stable
    /// (unlikely to change turn-to-turn).
    #[serde(default)]
    pub cache_stable: bool,
    /// Whether this capability should run serially, never concurrently
    /// with another capability in the same turn.
    #[serde(default)]
    pub serial_only: bool,
}

impl Capability {
    /// Whether this capability is admissible in a context, per the
    /// constraint evaluation rule: `requires_api`, `requires_network`,
    /// `requires_auth`, and `internal_use_only` must all hold against the
    /// supplied context.
    #[must_use]
    pub fn is_admissible(&self, ctx: &AdmissionContext) -> bool {
        if let Some(api) = &self.constraints.requires_api {
            if !ctx.available_apis.contains(api.as_str()) {
                return false;
            }
        }
        if self.constraints.requires_network && !ctx.network_available {
            return false;
        }
        if self.constraints.requires_auth && !ctx.authenticated {
            return false;
        }
        if self.constraints.internal_use_only && !ctx.allow_internal {
            return false;
        }
        true
    }
}

/// Runtime facts a capability's constraints are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct AdmissionContext {
    /// APIs the current instance has credentials/config for.
    pub available_apis: BTreeSet<String>,
    /// Whether outbound network access is currently permitted.
    pub network_available: bool,
    /// Whether the current session is authenticated.
    pub authenticated: bool,
    /// Whether internal-only capabilities may be admitted (true only for
    /// orchestrator-internal callers, never for model-facing listings).
    pub allow_internal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability() -> Capability {
        Capability {
            name: "web_search".into(),
            kind: CapabilityKind::Tool,
            subtype: "search".into(),
            provider: "system".into(),
            tags: vec!["web".into()],
            priority: 50,
            cost: Cost::default(),
            constraints: Constraints {
                requires_api: Some("search_api".into()),
                requires_network: true,
                requires_auth: false,
                internal_use_only: false,
            },
            input_schema: None,
            fallback_tool: None,
            skill_path: None,
            layer: Layer::Dynamic,
            cache_stable: false,
            serial_only: false,
        }
    }

    #[test]
    fn admissible_requires_all_constraints() {
        let cap = capability();
        let mut ctx = AdmissionContext {
            network_available: true,
            ..Default::default()
        };
        assert!(!cap.is_admissible(&ctx));
        ctx.available_apis.insert("search_api".into());
        assert!(cap.is_admissible(&ctx));
    }

    #[test]
    fn internal_only_blocked_by_default() {
        let mut cap = capability();
        cap.constraints = Constraints {
            internal_use_only: true,
            ..Default::default()
        };
        let ctx = AdmissionContext::default();
        assert!(!cap.is_admissible(&ctx));
        let ctx = AdmissionContext {
            allow_internal: true,
            ..Default::default()
        };
        assert!(cap.is_admissible(&ctx));
    }
}
