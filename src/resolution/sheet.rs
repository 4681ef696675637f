use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::resolver::{resolve, FieldResolution, ValueSource};
use crate::models::{
    Component, ComponentOrigin, ComponentSlots, ComponentType, Configuration, EffectiveAssignment,
    Model, SpecField,
};

/// Components in effect for a configuration, one per type at most
pub type ComponentSet = BTreeMap<ComponentType, Component>;

/// Work out which component applies per type: the configuration's own
/// assignment if it has one, otherwise the model default.
pub fn effective_assignments(
    configuration_slots: &ComponentSlots,
    model_slots: &ComponentSlots,
) -> Vec<EffectiveAssignment> {
    ComponentType::ALL
        .iter()
        .filter_map(|component_type| {
            if let Some(id) = configuration_slots.get(component_type) {
                Some(EffectiveAssignment {
                    component_type: *component_type,
                    component_id: id.clone(),
                    origin: ComponentOrigin::Configuration,
                })
            } else {
                model_slots.get(component_type).map(|id| EffectiveAssignment {
                    component_type: *component_type,
                    component_id: id.clone(),
                    origin: ComponentOrigin::Model,
                })
            }
        })
        .collect()
}

/// One resolved row of a spec sheet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedField {
    pub field: SpecField,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(flatten)]
    pub resolution: FieldResolution,
    /// Where the supplying component came from, for component-derived fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_origin: Option<ComponentOrigin>,
}

/// Every spec field of a configuration, resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecSheet {
    pub configuration_id: String,
    pub fields: Vec<ResolvedField>,
}

impl SpecSheet {
    pub fn get(&self, field: SpecField) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.field == field)
    }

    /// Fields where an override disagrees with its component
    pub fn conflicts(&self) -> Vec<&ResolvedField> {
        self.fields
            .iter()
            .filter(|f| f.resolution.has_conflict)
            .collect()
    }

    pub fn missing(&self) -> Vec<&ResolvedField> {
        self.fields
            .iter()
            .filter(|f| f.resolution.source == ValueSource::Missing)
            .collect()
    }
}

/// Resolve every known spec field of a configuration.
///
/// `components` holds the effective component per type; callers usually
/// build it from [`effective_assignments`]. A component registered under
/// the wrong type key is ignored for fields it does not own.
pub fn resolve_spec_sheet(
    configuration: &Configuration,
    model: &Model,
    components: &ComponentSet,
) -> SpecSheet {
    let origins: BTreeMap<ComponentType, ComponentOrigin> =
        effective_assignments(&configuration.components, &model.components)
            .into_iter()
            .map(|a| (a.component_type, a.origin))
            .collect();

    let fields = SpecField::ALL
        .iter()
        .map(|field| {
            let mapping = field.mapping();
            let component_value = mapping
                .component_type
                .and_then(|t| components.get(&t))
                .and_then(|c| c.spec_value(mapping.field));

            let resolution = resolve(
                configuration.overrides.get(&mapping.field),
                component_value.as_ref(),
                configuration.specs.get(&mapping.field),
                model.specs.get(&mapping.field),
            );

            ResolvedField {
                field: mapping.field,
                label: mapping.label.to_string(),
                unit: mapping.unit.map(str::to_string),
                component_origin: mapping
                    .component_type
                    .and_then(|t| origins.get(&t).copied()),
                resolution,
            }
        })
        .collect::<Vec<_>>();

    let sheet = SpecSheet {
        configuration_id: configuration.id.clone(),
        fields,
    };

    debug!(
        configuration = %configuration.id,
        conflicts = sheet.conflicts().len(),
        missing = sheet.missing().len(),
        "resolved spec sheet"
    );

    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Engine, SpecValue, Wheel};

    fn model() -> Model {
        let mut model = Model {
            id: "mt-07".to_string(),
            name: "MT-07".to_string(),
            brand: Some("Yamaha".to_string()),
            specs: Default::default(),
            components: Default::default(),
        };
        model.specs.insert(SpecField::TopSpeed, SpecValue::Number(214.0));
        model.components.insert(ComponentType::Wheel, "whl-17".to_string());
        model
    }

    fn engine(power: f64) -> Component {
        Component::Engine(Engine {
            id: "eng-cp2".to_string(),
            name: "CP2".to_string(),
            displacement_cc: Some(689.0),
            power_hp: Some(power),
            ..Default::default()
        })
    }

    #[test]
    fn test_configuration_assignment_beats_model_default() {
        let mut config_slots = ComponentSlots::new();
        config_slots.insert(ComponentType::Wheel, "whl-spoked".to_string());
        let mut model_slots = ComponentSlots::new();
        model_slots.insert(ComponentType::Wheel, "whl-17".to_string());
        model_slots.insert(ComponentType::Engine, "eng-cp2".to_string());

        let effective = effective_assignments(&config_slots, &model_slots);
        assert_eq!(effective.len(), 2);
        assert_eq!(effective[0].component_type, ComponentType::Engine);
        assert_eq!(effective[0].origin, ComponentOrigin::Model);
        assert_eq!(effective[1].component_id, "whl-spoked");
        assert_eq!(effective[1].origin, ComponentOrigin::Configuration);
    }

    #[test]
    fn test_spec_sheet_resolves_each_layer() {
        let mut config = Configuration::new("cfg-1", "my-2024", "Base");
        config.components.insert(ComponentType::Engine, "eng-cp2".to_string());
        config.overrides.insert(SpecField::Power, SpecValue::Number(80.0));
        config.specs.insert(SpecField::FuelEconomy, SpecValue::Number(4.2));

        let mut components = ComponentSet::new();
        components.insert(ComponentType::Engine, engine(73.4));
        components.insert(
            ComponentType::Wheel,
            Component::Wheel(Wheel {
                id: "whl-17".to_string(),
                name: "Cast 17".to_string(),
                front_size_in: Some(17.0),
                ..Default::default()
            }),
        );

        let sheet = resolve_spec_sheet(&config, &model(), &components);

        let power = sheet.get(SpecField::Power).unwrap();
        assert_eq!(power.resolution.source, ValueSource::Override);
        assert!(power.resolution.has_conflict);

        let displacement = sheet.get(SpecField::Displacement).unwrap();
        assert_eq!(displacement.resolution.source, ValueSource::Component);
        assert_eq!(displacement.component_origin, Some(ComponentOrigin::Configuration));

        let wheel = sheet.get(SpecField::FrontWheel).unwrap();
        assert_eq!(wheel.component_origin, Some(ComponentOrigin::Model));

        assert_eq!(
            sheet.get(SpecField::FuelEconomy).unwrap().resolution.source,
            ValueSource::Config
        );
        assert_eq!(sheet.get(SpecField::TopSpeed).unwrap().resolution.source, ValueSource::Model);
        assert_eq!(sheet.get(SpecField::Rake).unwrap().resolution.source, ValueSource::Missing);

        assert_eq!(sheet.conflicts().len(), 1);
        assert_eq!(sheet.fields.len(), SpecField::ALL.len());
    }
}
