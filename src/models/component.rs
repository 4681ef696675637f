use serde::{Deserialize, Serialize};

/// Kinds of components that can be linked to a model or configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Engine,
    BrakeSystem,
    Frame,
    Suspension,
    Wheel,
}

impl ComponentType {
    /// All component types in display order
    pub const ALL: [ComponentType; 5] = [
        ComponentType::Engine,
        ComponentType::BrakeSystem,
        ComponentType::Frame,
        ComponentType::Suspension,
        ComponentType::Wheel,
    ];

    /// Stable key used in payloads and CLI arguments
    pub fn key(&self) -> &'static str {
        match self {
            ComponentType::Engine => "engine",
            ComponentType::BrakeSystem => "brake_system",
            ComponentType::Frame => "frame",
            ComponentType::Suspension => "suspension",
            ComponentType::Wheel => "wheel",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            ComponentType::Engine => "engine",
            ComponentType::BrakeSystem => "brake system",
            ComponentType::Frame => "frame",
            ComponentType::Suspension => "suspension",
            ComponentType::Wheel => "wheels",
        }
    }

    /// Whether a configuration is incomplete without this component
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            ComponentType::Engine | ComponentType::BrakeSystem | ComponentType::Frame
        )
    }

    /// Parse a component type from its key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.key() == key)
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| {
            format!(
                "unknown component type '{}' \
                 (expected one of: engine, brake_system, frame, suspension, wheel)",
                s
            )
        })
    }
}

/// A single spec value as stored on models, configurations and components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SpecValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl SpecValue {
    /// Whether the value counts as set. Only an empty string is unset;
    /// numeric zero and `false` are real values.
    pub fn is_present(&self) -> bool {
        match self {
            SpecValue::Text(text) => !text.is_empty(),
            SpecValue::Number(_) | SpecValue::Flag(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SpecValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for SpecValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecValue::Number(n) => write!(f, "{}", n),
            SpecValue::Flag(true) => write!(f, "yes"),
            SpecValue::Flag(false) => write!(f, "no"),
            SpecValue::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<f64> for SpecValue {
    fn from(value: f64) -> Self {
        SpecValue::Number(value)
    }
}

impl From<bool> for SpecValue {
    fn from(value: bool) -> Self {
        SpecValue::Flag(value)
    }
}

impl From<&str> for SpecValue {
    fn from(value: &str) -> Self {
        SpecValue::Text(value.to_string())
    }
}

impl From<String> for SpecValue {
    fn from(value: String) -> Self {
        SpecValue::Text(value)
    }
}

/// Spec fields that can be resolved for a configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpecField {
    // Engine
    Displacement,
    Power,
    Torque,
    Cylinders,
    EngineType,
    // Brake system
    FrontBrake,
    RearBrake,
    Abs,
    // Frame
    FrameMaterial,
    Rake,
    Trail,
    // Suspension
    FrontSuspension,
    RearSuspension,
    FrontTravel,
    RearTravel,
    // Wheels
    FrontWheel,
    RearWheel,
    FrontTire,
    RearTire,
    // Not derived from any component
    TopSpeed,
    FuelEconomy,
}

/// Mapping of a spec field to the component type that can supply it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldMapping {
    pub field: SpecField,
    pub component_type: Option<ComponentType>,
    pub label: &'static str,
    pub unit: Option<&'static str>,
}

impl SpecField {
    /// Every resolvable spec field, in display order
    pub const ALL: [SpecField; 21] = [
        SpecField::Displacement,
        SpecField::Power,
        SpecField::Torque,
        SpecField::Cylinders,
        SpecField::EngineType,
        SpecField::FrontBrake,
        SpecField::RearBrake,
        SpecField::Abs,
        SpecField::FrameMaterial,
        SpecField::Rake,
        SpecField::Trail,
        SpecField::FrontSuspension,
        SpecField::RearSuspension,
        SpecField::FrontTravel,
        SpecField::RearTravel,
        SpecField::FrontWheel,
        SpecField::RearWheel,
        SpecField::FrontTire,
        SpecField::RearTire,
        SpecField::TopSpeed,
        SpecField::FuelEconomy,
    ];

    /// Owning component type, label and unit of this field
    pub fn mapping(&self) -> FieldMapping {
        use ComponentType as C;

        let (component_type, label, unit) = match self {
            SpecField::Displacement => (Some(C::Engine), "Displacement", Some("cc")),
            SpecField::Power => (Some(C::Engine), "Power", Some("hp")),
            SpecField::Torque => (Some(C::Engine), "Torque", Some("Nm")),
            SpecField::Cylinders => (Some(C::Engine), "Cylinders", None),
            SpecField::EngineType => (Some(C::Engine), "Engine type", None),
            SpecField::FrontBrake => (Some(C::BrakeSystem), "Front brake", None),
            SpecField::RearBrake => (Some(C::BrakeSystem), "Rear brake", None),
            SpecField::Abs => (Some(C::BrakeSystem), "ABS", None),
            SpecField::FrameMaterial => (Some(C::Frame), "Frame material", None),
            SpecField::Rake => (Some(C::Frame), "Rake", Some("deg")),
            SpecField::Trail => (Some(C::Frame), "Trail", Some("mm")),
            SpecField::FrontSuspension => (Some(C::Suspension), "Front suspension", None),
            SpecField::RearSuspension => (Some(C::Suspension), "Rear suspension", None),
            SpecField::FrontTravel => (Some(C::Suspension), "Front travel", Some("mm")),
            SpecField::RearTravel => (Some(C::Suspension), "Rear travel", Some("mm")),
            SpecField::FrontWheel => (Some(C::Wheel), "Front wheel", Some("in")),
            SpecField::RearWheel => (Some(C::Wheel), "Rear wheel", Some("in")),
            SpecField::FrontTire => (Some(C::Wheel), "Front tire", None),
            SpecField::RearTire => (Some(C::Wheel), "Rear tire", None),
            SpecField::TopSpeed => (None, "Top speed", Some("km/h")),
            SpecField::FuelEconomy => (None, "Fuel economy", Some("l/100km")),
        };

        FieldMapping {
            field: *self,
            component_type,
            label,
            unit,
        }
    }

    /// Component type that supplies this field, if any
    pub fn component_type(&self) -> Option<ComponentType> {
        self.mapping().component_type
    }

    pub fn label(&self) -> &'static str {
        self.mapping().label
    }

    /// Fields supplied by the given component type
    pub fn for_component(component_type: ComponentType) -> impl Iterator<Item = SpecField> {
        Self::ALL
            .into_iter()
            .filter(move |f| f.component_type() == Some(component_type))
    }
}

/// Engine component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Engine {
    pub id: String,
    pub name: String,
    /// Displacement in cc
    pub displacement_cc: Option<f64>,
    /// Peak power in hp
    pub power_hp: Option<f64>,
    /// Peak torque in Nm
    pub torque_nm: Option<f64>,
    pub cylinders: Option<f64>,
    /// e.g. "parallel twin", "inline four"
    pub engine_type: Option<String>,
}

/// Brake system component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrakeSystem {
    pub id: String,
    pub name: String,
    pub front: Option<String>,
    pub rear: Option<String>,
    pub abs: Option<bool>,
}

/// Frame component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Frame {
    pub id: String,
    pub name: String,
    pub material: Option<String>,
    pub rake_deg: Option<f64>,
    pub trail_mm: Option<f64>,
}

/// Suspension component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Suspension {
    pub id: String,
    pub name: String,
    pub front: Option<String>,
    pub rear: Option<String>,
    pub front_travel_mm: Option<f64>,
    pub rear_travel_mm: Option<f64>,
}

/// Wheel set component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Wheel {
    pub id: String,
    pub name: String,
    /// Rim diameter in inches
    pub front_size_in: Option<f64>,
    pub rear_size_in: Option<f64>,
    pub front_tire: Option<String>,
    pub rear_tire: Option<String>,
}

/// A component record from the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Engine(Engine),
    BrakeSystem(BrakeSystem),
    Frame(Frame),
    Suspension(Suspension),
    Wheel(Wheel),
}

fn number(value: Option<f64>) -> Option<SpecValue> {
    value.map(SpecValue::Number)
}

fn text(value: &Option<String>) -> Option<SpecValue> {
    value.as_ref().map(|t| SpecValue::Text(t.clone()))
}

impl Component {
    pub fn id(&self) -> &str {
        match self {
            Component::Engine(c) => &c.id,
            Component::BrakeSystem(c) => &c.id,
            Component::Frame(c) => &c.id,
            Component::Suspension(c) => &c.id,
            Component::Wheel(c) => &c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Component::Engine(c) => &c.name,
            Component::BrakeSystem(c) => &c.name,
            Component::Frame(c) => &c.name,
            Component::Suspension(c) => &c.name,
            Component::Wheel(c) => &c.name,
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            Component::Engine(_) => ComponentType::Engine,
            Component::BrakeSystem(_) => ComponentType::BrakeSystem,
            Component::Frame(_) => ComponentType::Frame,
            Component::Suspension(_) => ComponentType::Suspension,
            Component::Wheel(_) => ComponentType::Wheel,
        }
    }

    /// Value this component supplies for a spec field. Fields owned by a
    /// different component type always yield `None`.
    pub fn spec_value(&self, field: SpecField) -> Option<SpecValue> {
        match (self, field) {
            (Component::Engine(e), SpecField::Displacement) => number(e.displacement_cc),
            (Component::Engine(e), SpecField::Power) => number(e.power_hp),
            (Component::Engine(e), SpecField::Torque) => number(e.torque_nm),
            (Component::Engine(e), SpecField::Cylinders) => number(e.cylinders),
            (Component::Engine(e), SpecField::EngineType) => text(&e.engine_type),
            (Component::BrakeSystem(b), SpecField::FrontBrake) => text(&b.front),
            (Component::BrakeSystem(b), SpecField::RearBrake) => text(&b.rear),
            (Component::BrakeSystem(b), SpecField::Abs) => b.abs.map(SpecValue::Flag),
            (Component::Frame(fr), SpecField::FrameMaterial) => text(&fr.material),
            (Component::Frame(fr), SpecField::Rake) => number(fr.rake_deg),
            (Component::Frame(fr), SpecField::Trail) => number(fr.trail_mm),
            (Component::Suspension(s), SpecField::FrontSuspension) => text(&s.front),
            (Component::Suspension(s), SpecField::RearSuspension) => text(&s.rear),
            (Component::Suspension(s), SpecField::FrontTravel) => number(s.front_travel_mm),
            (Component::Suspension(s), SpecField::RearTravel) => number(s.rear_travel_mm),
            (Component::Wheel(w), SpecField::FrontWheel) => number(w.front_size_in),
            (Component::Wheel(w), SpecField::RearWheel) => number(w.rear_size_in),
            (Component::Wheel(w), SpecField::FrontTire) => text(&w.front_tire),
            (Component::Wheel(w), SpecField::RearTire) => text(&w.rear_tire),
            _ => None,
        }
    }
}
