use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::component::{ComponentType, SpecField, SpecValue};

pub type ModelId = String;
pub type ModelYearId = String;
pub type ConfigurationId = String;
pub type ComponentId = String;

/// Spec values keyed by field
pub type SpecMap = BTreeMap<SpecField, SpecValue>;

/// Component references keyed by type (at most one per type)
pub type ComponentSlots = BTreeMap<ComponentType, ComponentId>;

/// A motorcycle model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    pub brand: Option<String>,
    /// Model-level spec values, the lowest precedence fallback
    #[serde(default)]
    pub specs: SpecMap,
    /// Default components, hydrated from model-scope assignments
    #[serde(default)]
    pub components: ComponentSlots,
}

/// Lifecycle state of a model year
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum YearStatus {
    #[default]
    Available,
    Discontinued,
}

/// A model year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelYear {
    pub id: ModelYearId,
    pub model_id: ModelId,
    pub year: i32,
    #[serde(default)]
    pub status: YearStatus,
    /// Free-form year level attributes (colors, launch notes, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Basic info group of a configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BasicInfo {
    pub market_region: Option<String>,
    /// MSRP in the region's currency
    pub price: Option<f64>,
    pub trim_level: Option<String>,
    pub description: Option<String>,
}

/// Dimensions group of a configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Dimensions {
    pub seat_height_mm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub wheelbase_mm: Option<f64>,
    pub fuel_capacity_l: Option<f64>,
    pub ground_clearance_mm: Option<f64>,
}

impl Dimensions {
    /// Each dimension with its label, in display order
    pub fn entries(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("seat height", self.seat_height_mm),
            ("weight", self.weight_kg),
            ("wheelbase", self.wheelbase_mm),
            ("fuel capacity", self.fuel_capacity_l),
            ("ground clearance", self.ground_clearance_mm),
        ]
    }
}

/// A trim level of a model year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    pub id: ConfigurationId,
    pub model_year_id: ModelYearId,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub basic: BasicInfo,
    #[serde(default)]
    pub dimensions: Dimensions,
    /// Configuration-scope component overrides, hydrated from assignments
    #[serde(default)]
    pub components: ComponentSlots,
    /// Explicit per-field overrides
    #[serde(default)]
    pub overrides: SpecMap,
    /// Values stored on the configuration without being an override
    #[serde(default)]
    pub specs: SpecMap,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Configuration {
    /// Create an empty configuration
    pub fn new(
        id: impl Into<String>,
        model_year_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            model_year_id: model_year_id.into(),
            name: name.into(),
            is_default: false,
            basic: BasicInfo::default(),
            dimensions: Dimensions::default(),
            components: ComponentSlots::new(),
            overrides: SpecMap::new(),
            specs: SpecMap::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch. Groups absent from the patch are left untouched,
    /// groups present replace the current group wholesale.
    pub fn apply_patch(&mut self, patch: &ConfigurationPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(is_default) = patch.is_default {
            self.is_default = is_default;
        }
        if let Some(basic) = &patch.basic {
            self.basic = basic.clone();
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(components) = &patch.components {
            self.components = components.clone();
        }
        if let Some(overrides) = &patch.overrides {
            self.overrides = overrides.clone();
        }
        if let Some(specs) = &patch.specs {
            self.specs = specs.clone();
        }
        if let Some(dimensions) = &patch.dimensions {
            self.dimensions = dimensions.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Field groups that can be copied between configurations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CopyGroups {
    pub basic_info: bool,
    pub components: bool,
    pub dimensions: bool,
}

impl CopyGroups {
    pub fn any(&self) -> bool {
        self.basic_info || self.components || self.dimensions
    }
}

impl Default for CopyGroups {
    fn default() -> Self {
        Self {
            basic_info: true,
            components: true,
            dimensions: true,
        }
    }
}

/// Create/update payload for a configuration. `None` groups are not part of
/// the payload at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfigurationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicInfo>,
    /// `Some(None)` clears the notes, serialized as `null`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentSlots>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<SpecMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specs: Option<SpecMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

/// A field that is present in the payload, possibly as `null`
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl ConfigurationPatch {
    /// Build a copy payload from a source configuration. Only the enabled
    /// groups are included; `is_default` is never copied.
    pub fn copy_from(source: &Configuration, groups: CopyGroups) -> Self {
        let mut patch = ConfigurationPatch {
            name: Some(source.name.clone()),
            ..Default::default()
        };

        if groups.basic_info {
            patch.basic = Some(source.basic.clone());
            patch.notes = Some(source.notes.clone());
        }
        if groups.components {
            patch.components = Some(source.components.clone());
            patch.overrides = Some(source.overrides.clone());
            patch.specs = Some(source.specs.clone());
        }
        if groups.dimensions {
            patch.dimensions = Some(source.dimensions.clone());
        }

        patch
    }
}
