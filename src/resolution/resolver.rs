use serde::{Deserialize, Serialize};

use crate::models::SpecValue;

/// Layer an effective value was taken from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Explicit override on the field itself
    Override,
    /// Derived from the linked component
    Component,
    /// Stored on the configuration without being an override
    Config,
    /// Model-level fallback
    Model,
    /// No layer has a value
    Missing,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Override => write!(f, "override"),
            ValueSource::Component => write!(f, "component"),
            ValueSource::Config => write!(f, "config"),
            ValueSource::Model => write!(f, "model"),
            ValueSource::Missing => write!(f, "missing"),
        }
    }
}

/// Outcome of resolving one field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldResolution {
    pub effective_value: Option<SpecValue>,
    pub source: ValueSource,
    /// Override and component value are both set and disagree
    pub has_conflict: bool,
    /// Component value shadowed by the override, kept for reconciliation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_value: Option<SpecValue>,
}

impl FieldResolution {
    /// Text rendered for the field
    pub fn display_value(&self) -> String {
        match &self.effective_value {
            Some(value) => value.to_string(),
            None => "not specified".to_string(),
        }
    }
}

fn present(value: Option<&SpecValue>) -> Option<&SpecValue> {
    value.filter(|v| v.is_present())
}

/// Resolve a field from its four candidate layers.
///
/// Precedence is override, component, config, model. The first present
/// candidate wins. A conflict is flagged when the override and the
/// component value are both present and differ; the override still wins.
pub fn resolve(
    direct_value: Option<&SpecValue>,
    component_value: Option<&SpecValue>,
    config_value: Option<&SpecValue>,
    model_value: Option<&SpecValue>,
) -> FieldResolution {
    let direct = present(direct_value);
    let component = present(component_value);

    let has_conflict = matches!((direct, component), (Some(d), Some(c)) if d != c);

    let (effective_value, source) = if let Some(value) = direct {
        (Some(value.clone()), ValueSource::Override)
    } else if let Some(value) = component {
        (Some(value.clone()), ValueSource::Component)
    } else if let Some(value) = present(config_value) {
        (Some(value.clone()), ValueSource::Config)
    } else if let Some(value) = present(model_value) {
        (Some(value.clone()), ValueSource::Model)
    } else {
        (None, ValueSource::Missing)
    };

    FieldResolution {
        effective_value,
        source,
        has_conflict,
        component_value: if has_conflict { component.cloned() } else { None },
    }
}
