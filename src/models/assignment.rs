use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::ComponentId;
use super::component::ComponentType;

/// Kind of entity an assignment is attached to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Model-level default, inherited by every configuration of the model
    Model,
    /// Configuration-level override
    Configuration,
}

/// Entity an assignment is attached to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope {
    pub kind: ScopeKind,
    pub id: String,
}

impl Scope {
    pub fn model(id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Model,
            id: id.into(),
        }
    }

    pub fn configuration(id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Configuration,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ScopeKind::Model => write!(f, "model '{}'", self.id),
            ScopeKind::Configuration => write!(f, "configuration '{}'", self.id),
        }
    }
}

/// Link between a scope and a component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub scope: Scope,
    pub component_type: ComponentType,
    pub component_id: ComponentId,
    pub assigned_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(
        scope: Scope,
        component_type: ComponentType,
        component_id: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            component_type,
            component_id: component_id.into(),
            assigned_at: Utc::now(),
        }
    }
}

/// Where a configuration's component for a type comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComponentOrigin {
    /// Assigned directly on the configuration
    Configuration,
    /// Inherited from the model default
    Model,
}

/// Component in effect for a configuration and type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveAssignment {
    pub component_type: ComponentType,
    pub component_id: ComponentId,
    pub origin: ComponentOrigin,
}
