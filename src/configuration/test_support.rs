//! Shared fixtures for store-backed tests

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::batch::CancellationToken;
use super::store::{CatalogData, CatalogStore, JsonCatalogStore, StoreError};
use crate::models::{
    Assignment, BrakeSystem, Component, ComponentType, Configuration, ConfigurationPatch, Engine,
    Frame, Model, ModelYear, Scope, SpecField, SpecValue, Suspension, Wheel, YearStatus,
};

fn year(id: &str, year: i32) -> ModelYear {
    ModelYear {
        id: id.to_string(),
        model_id: "mt-07".to_string(),
        year,
        status: YearStatus::Available,
        attributes: Default::default(),
    }
}

fn config(id: &str, model_year_id: &str, name: &str, is_default: bool) -> Configuration {
    let mut config = Configuration::new(id, model_year_id, name);
    config.is_default = is_default;
    config
}

/// MT-07 catalog: 2022 has "Sport" (default) and "Base", 2023 has only
/// "Base" (default), 2024 has "Sport", 2025 is empty.
pub fn seeded_data() -> CatalogData {
    let mut data = CatalogData::default();

    let components = vec![
        Component::Engine(Engine {
            id: "eng-cp2".to_string(),
            name: "CP2 689cc".to_string(),
            displacement_cc: Some(689.0),
            power_hp: Some(73.4),
            torque_nm: Some(67.0),
            cylinders: Some(2.0),
            engine_type: Some("parallel twin".to_string()),
        }),
        Component::Engine(Engine {
            id: "eng-cp2-tuned".to_string(),
            name: "CP2 689cc (tuned)".to_string(),
            displacement_cc: Some(689.0),
            power_hp: Some(80.0),
            ..Default::default()
        }),
        Component::BrakeSystem(BrakeSystem {
            id: "brk-dual".to_string(),
            name: "Dual 298mm discs".to_string(),
            front: Some("dual 298mm disc".to_string()),
            rear: Some("245mm disc".to_string()),
            abs: Some(true),
        }),
        Component::Frame(Frame {
            id: "frm-steel".to_string(),
            name: "Steel backbone".to_string(),
            material: Some("steel".to_string()),
            rake_deg: Some(24.8),
            trail_mm: Some(90.0),
        }),
        Component::Suspension(Suspension {
            id: "sus-kyb".to_string(),
            name: "KYB 41mm".to_string(),
            front: Some("41mm telescopic fork".to_string()),
            rear: Some("link-type monoshock".to_string()),
            front_travel_mm: Some(130.0),
            rear_travel_mm: Some(130.0),
        }),
        Component::Wheel(Wheel {
            id: "whl-17".to_string(),
            name: "Cast 17in".to_string(),
            front_size_in: Some(17.0),
            rear_size_in: Some(17.0),
            front_tire: Some("120/70ZR17".to_string()),
            rear_tire: Some("180/55ZR17".to_string()),
        }),
    ];
    for component in components {
        data.components.insert(component.id().to_string(), component);
    }

    data.models.insert(
        "mt-07".to_string(),
        Model {
            id: "mt-07".to_string(),
            name: "MT-07".to_string(),
            brand: Some("Yamaha".to_string()),
            specs: [(SpecField::TopSpeed, SpecValue::Number(214.0))].into_iter().collect(),
            components: Default::default(),
        },
    );

    for (id, y) in [("my-2022", 2022), ("my-2023", 2023), ("my-2024", 2024), ("my-2025", 2025)] {
        data.model_years.insert(id.to_string(), year(id, y));
    }

    let mut sport = config("cfg-2022-sport", "my-2022", "Sport", true);
    sport.basic.market_region = Some("EU".to_string());
    sport.basic.price = Some(8_499.0);
    sport.basic.trim_level = Some("Sport".to_string());
    sport.dimensions.seat_height_mm = Some(805.0);
    sport.dimensions.weight_kg = Some(184.0);
    sport.overrides.insert(SpecField::Power, SpecValue::Number(75.0));
    sport.notes = Some("Launch colors only".to_string());
    sport.components.insert(ComponentType::Engine, "eng-cp2".to_string());
    sport.components.insert(ComponentType::BrakeSystem, "brk-dual".to_string());
    sport.components.insert(ComponentType::Frame, "frm-steel".to_string());

    let configurations = vec![
        sport,
        config("cfg-2022-base", "my-2022", "Base", false),
        config("cfg-2023-base", "my-2023", "Base", true),
        config("cfg-2024-sport", "my-2024", "Sport", true),
    ];
    for configuration in configurations {
        data.configurations.insert(configuration.id.clone(), configuration);
    }

    data
}

pub fn seeded_store() -> JsonCatalogStore {
    JsonCatalogStore::in_memory(seeded_data())
}

/// Store wrapper that fails mutations aimed at chosen ids and records every
/// mutation that reached the inner store.
pub struct FailingStore {
    pub inner: JsonCatalogStore,
    failing_ids: BTreeSet<String>,
    pub mutations: Mutex<Vec<String>>,
    cancel_on_mutation: Option<CancellationToken>,
}

impl FailingStore {
    pub fn new(inner: JsonCatalogStore, failing_ids: &[&str]) -> Self {
        Self {
            inner,
            failing_ids: failing_ids.iter().map(|id| id.to_string()).collect(),
            mutations: Mutex::new(Vec::new()),
            cancel_on_mutation: None,
        }
    }

    /// Cancel `token` as soon as the first mutation arrives, as a user
    /// interrupting a running batch would
    pub fn cancelling(mut self, token: &CancellationToken) -> Self {
        self.cancel_on_mutation = Some(token.clone());
        self
    }

    fn record(&self, entry: String) {
        self.mutations.lock().unwrap().push(entry);
        if let Some(token) = &self.cancel_on_mutation {
            token.cancel();
        }
    }

    pub fn mutation_log(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    fn check(&self, id: &str) -> Result<(), StoreError> {
        if self.failing_ids.contains(id) {
            Err(StoreError::Unavailable(format!("write to '{}' timed out", id)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogStore for FailingStore {
    async fn get_component(
        &self,
        component_type: ComponentType,
        id: &str,
    ) -> Result<Option<Component>, StoreError> {
        self.inner.get_component(component_type, id).await
    }

    async fn get_assignments_for_scope(
        &self,
        scope: &Scope,
    ) -> Result<Vec<Assignment>, StoreError> {
        self.inner.get_assignments_for_scope(scope).await
    }

    async fn upsert_assignment(
        &self,
        scope: &Scope,
        component_type: ComponentType,
        component_id: &str,
    ) -> Result<Assignment, StoreError> {
        self.record(format!("upsert {}", scope.id));
        self.check(&scope.id)?;
        self.inner
            .upsert_assignment(scope, component_type, component_id)
            .await
    }

    async fn delete_assignment(
        &self,
        scope: &Scope,
        component_type: ComponentType,
    ) -> Result<(), StoreError> {
        self.record(format!("delete {}", scope.id));
        self.check(&scope.id)?;
        self.inner.delete_assignment(scope, component_type).await
    }

    async fn find_configuration_by_name(
        &self,
        model_year_id: &str,
        name: &str,
    ) -> Result<Option<Configuration>, StoreError> {
        self.inner.find_configuration_by_name(model_year_id, name).await
    }

    async fn create_configuration(
        &self,
        model_year_id: &str,
        patch: &ConfigurationPatch,
    ) -> Result<Configuration, StoreError> {
        self.record(format!("create {}", model_year_id));
        self.check(model_year_id)?;
        self.inner.create_configuration(model_year_id, patch).await
    }

    async fn update_configuration(
        &self,
        configuration_id: &str,
        patch: &ConfigurationPatch,
    ) -> Result<Configuration, StoreError> {
        self.record(format!("update {}", configuration_id));
        self.check(configuration_id)?;
        self.inner.update_configuration(configuration_id, patch).await
    }

    async fn list_sibling_configurations(
        &self,
        model_year_id: &str,
    ) -> Result<Vec<Configuration>, StoreError> {
        self.inner.list_sibling_configurations(model_year_id).await
    }

    async fn get_model(&self, id: &str) -> Result<Option<Model>, StoreError> {
        self.inner.get_model(id).await
    }

    async fn get_model_year(&self, id: &str) -> Result<Option<ModelYear>, StoreError> {
        self.inner.get_model_year(id).await
    }

    async fn get_configuration(&self, id: &str) -> Result<Option<Configuration>, StoreError> {
        self.inner.get_configuration(id).await
    }
}
