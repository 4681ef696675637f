use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::{
    generate_id, Assignment, Component, ComponentId, ComponentSlots, ComponentType, Configuration,
    ConfigurationId, ConfigurationPatch, Model, ModelId, ModelYear, ModelYearId, Scope, ScopeKind,
};

/// Failures reported by the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Data access contract the engine consumes
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up a component of the given type
    async fn get_component(
        &self,
        component_type: ComponentType,
        id: &str,
    ) -> Result<Option<Component>, StoreError>;

    /// Current assignments of a scope, at most one per component type
    async fn get_assignments_for_scope(&self, scope: &Scope) -> Result<Vec<Assignment>, StoreError>;

    /// Replace the assignment of (scope, type) in one step
    async fn upsert_assignment(
        &self,
        scope: &Scope,
        component_type: ComponentType,
        component_id: &str,
    ) -> Result<Assignment, StoreError>;

    /// Remove the assignment of (scope, type). Succeeds when absent.
    async fn delete_assignment(
        &self,
        scope: &Scope,
        component_type: ComponentType,
    ) -> Result<(), StoreError>;

    async fn find_configuration_by_name(
        &self,
        model_year_id: &str,
        name: &str,
    ) -> Result<Option<Configuration>, StoreError>;

    async fn create_configuration(
        &self,
        model_year_id: &str,
        patch: &ConfigurationPatch,
    ) -> Result<Configuration, StoreError>;

    async fn update_configuration(
        &self,
        configuration_id: &str,
        patch: &ConfigurationPatch,
    ) -> Result<Configuration, StoreError>;

    /// All configurations of a model year
    async fn list_sibling_configurations(
        &self,
        model_year_id: &str,
    ) -> Result<Vec<Configuration>, StoreError>;

    async fn get_model(&self, id: &str) -> Result<Option<Model>, StoreError>;

    async fn get_model_year(&self, id: &str) -> Result<Option<ModelYear>, StoreError>;

    async fn get_configuration(&self, id: &str) -> Result<Option<Configuration>, StoreError>;
}

/// Store metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Default for StoreMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: "1.0.0".to_string(),
            created_at: now,
            last_modified: now,
        }
    }
}

/// Serialized catalog contents
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogData {
    #[serde(default)]
    pub models: BTreeMap<ModelId, Model>,
    #[serde(default)]
    pub model_years: BTreeMap<ModelYearId, ModelYear>,
    #[serde(default)]
    pub configurations: BTreeMap<ConfigurationId, Configuration>,
    #[serde(default)]
    pub components: BTreeMap<ComponentId, Component>,
    /// Source of truth for component slots of models and configurations
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub metadata: StoreMetadata,
}

impl CatalogData {
    /// Move component slots written inline on models and configurations
    /// into the assignment table. Existing assignments win.
    fn normalize(&mut self) {
        let mut inline: Vec<(Scope, ComponentSlots)> = Vec::new();
        for model in self.models.values_mut() {
            inline.push((Scope::model(&model.id), std::mem::take(&mut model.components)));
        }
        for configuration in self.configurations.values_mut() {
            inline.push((
                Scope::configuration(&configuration.id),
                std::mem::take(&mut configuration.components),
            ));
        }

        for (scope, slots) in inline {
            for (component_type, component_id) in slots {
                if self.assignment(&scope, component_type).is_none() {
                    self.assignments
                        .push(Assignment::new(scope.clone(), component_type, component_id));
                }
            }
        }
    }

    fn assignment(&self, scope: &Scope, component_type: ComponentType) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|a| a.scope == *scope && a.component_type == component_type)
    }

    fn slots_for(&self, scope: &Scope) -> ComponentSlots {
        self.assignments
            .iter()
            .filter(|a| a.scope == *scope)
            .map(|a| (a.component_type, a.component_id.clone()))
            .collect()
    }

    fn hydrate_configuration(&self, configuration: &Configuration) -> Configuration {
        let mut hydrated = configuration.clone();
        hydrated.components = self.slots_for(&Scope::configuration(&configuration.id));
        hydrated
    }

    fn hydrate_model(&self, model: &Model) -> Model {
        let mut hydrated = model.clone();
        hydrated.components = self.slots_for(&Scope::model(&model.id));
        hydrated
    }

    fn scope_exists(&self, scope: &Scope) -> bool {
        match scope.kind {
            ScopeKind::Model => self.models.contains_key(&scope.id),
            ScopeKind::Configuration => self.configurations.contains_key(&scope.id),
        }
    }

    fn check_component(&self, component_type: ComponentType, id: &str) -> Result<(), StoreError> {
        match self.components.get(id) {
            Some(component) if component.component_type() == component_type => Ok(()),
            _ => Err(StoreError::not_found("component", format!("{}/{}", component_type, id))),
        }
    }

    fn name_taken(&self, model_year_id: &str, name: &str, except: Option<&str>) -> bool {
        self.configurations.values().any(|c| {
            c.model_year_id == model_year_id && c.name == name && Some(c.id.as_str()) != except
        })
    }

    fn replace_slots(&mut self, scope: &Scope, slots: &ComponentSlots) -> Result<(), StoreError> {
        for (component_type, component_id) in slots {
            self.check_component(*component_type, component_id)?;
        }
        self.assignments.retain(|a| a.scope != *scope);
        for (component_type, component_id) in slots {
            self.assignments
                .push(Assignment::new(scope.clone(), *component_type, component_id.clone()));
        }
        Ok(())
    }
}

/// Catalog store kept in memory and optionally persisted as JSON
#[derive(Debug)]
pub struct JsonCatalogStore {
    /// Path to the store file, `None` for a purely in-memory store
    store_path: Option<PathBuf>,
    data: RwLock<CatalogData>,
}

impl JsonCatalogStore {
    /// Open a store file, starting empty if it does not exist yet
    pub async fn open(store_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store_path = store_path.into();
        let data = if tokio::fs::try_exists(&store_path).await? {
            Self::load_from_file(&store_path).await?
        } else {
            CatalogData::default()
        };

        Ok(Self {
            store_path: Some(store_path),
            data: RwLock::new(data),
        })
    }

    /// Store that never touches the file system
    pub fn in_memory(mut data: CatalogData) -> Self {
        data.normalize();
        Self {
            store_path: None,
            data: RwLock::new(data),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> CatalogData {
        self.data.read().await.clone()
    }

    async fn load_from_file(path: &Path) -> Result<CatalogData, StoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut data: CatalogData = serde_json::from_str(&content)?;
        data.normalize();
        debug!(
            path = %path.display(),
            configurations = data.configurations.len(),
            "loaded catalog store"
        );
        Ok(data)
    }

    async fn save_to_file(&self, data: &mut CatalogData) -> Result<(), StoreError> {
        data.metadata.last_modified = Utc::now();

        let Some(path) = &self.store_path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(data)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Apply a change to a copy of the catalog. The copy replaces the live
    /// data only once it has been saved, so a failed save changes nothing.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut CatalogData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let value = change(&mut next)?;
        self.save_to_file(&mut next).await?;
        *data = next;
        Ok(value)
    }

    /// Add or replace a model
    pub async fn insert_model(&self, model: Model) -> Result<(), StoreError> {
        self.commit(|data| {
            let scope = Scope::model(&model.id);
            let slots = model.components.clone();
            data.models.insert(
                model.id.clone(),
                Model {
                    components: ComponentSlots::new(),
                    ..model
                },
            );
            if !slots.is_empty() {
                data.replace_slots(&scope, &slots)?;
            }
            Ok(())
        })
        .await
    }

    /// Add or replace a model year
    pub async fn insert_model_year(&self, model_year: ModelYear) -> Result<(), StoreError> {
        self.commit(|data| {
            if !data.models.contains_key(&model_year.model_id) {
                return Err(StoreError::not_found("model", &model_year.model_id));
            }
            data.model_years.insert(model_year.id.clone(), model_year);
            Ok(())
        })
        .await
    }

    /// Add or replace a component in the registry
    pub async fn insert_component(&self, component: Component) -> Result<(), StoreError> {
        self.commit(|data| {
            data.components.insert(component.id().to_string(), component);
            Ok(())
        })
        .await
    }

    /// Add or replace a configuration with a known id
    pub async fn insert_configuration(
        &self,
        configuration: Configuration,
    ) -> Result<(), StoreError> {
        self.commit(|data| {
            if !data.model_years.contains_key(&configuration.model_year_id) {
                return Err(StoreError::not_found(
                    "model year",
                    &configuration.model_year_id,
                ));
            }
            let scope = Scope::configuration(&configuration.id);
            let slots = configuration.components.clone();
            data.configurations.insert(
                configuration.id.clone(),
                Configuration {
                    components: ComponentSlots::new(),
                    ..configuration
                },
            );
            data.replace_slots(&scope, &slots)
        })
        .await
    }
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    async fn get_component(
        &self,
        component_type: ComponentType,
        id: &str,
    ) -> Result<Option<Component>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .components
            .get(id)
            .filter(|c| c.component_type() == component_type)
            .cloned())
    }

    async fn get_assignments_for_scope(
        &self,
        scope: &Scope,
    ) -> Result<Vec<Assignment>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .assignments
            .iter()
            .filter(|a| a.scope == *scope)
            .cloned()
            .collect())
    }

    async fn upsert_assignment(
        &self,
        scope: &Scope,
        component_type: ComponentType,
        component_id: &str,
    ) -> Result<Assignment, StoreError> {
        self.commit(|data| {
            if !data.scope_exists(scope) {
                return Err(StoreError::not_found("scope", scope.to_string()));
            }
            data.check_component(component_type, component_id)?;

            data.assignments
                .retain(|a| !(a.scope == *scope && a.component_type == component_type));
            let assignment = Assignment::new(scope.clone(), component_type, component_id);
            data.assignments.push(assignment.clone());
            Ok(assignment)
        })
        .await
    }

    async fn delete_assignment(
        &self,
        scope: &Scope,
        component_type: ComponentType,
    ) -> Result<(), StoreError> {
        let present = self
            .data
            .read()
            .await
            .assignment(scope, component_type)
            .is_some();
        if !present {
            return Ok(());
        }

        self.commit(|data| {
            data.assignments
                .retain(|a| !(a.scope == *scope && a.component_type == component_type));
            Ok(())
        })
        .await
    }

    async fn find_configuration_by_name(
        &self,
        model_year_id: &str,
        name: &str,
    ) -> Result<Option<Configuration>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .configurations
            .values()
            .find(|c| c.model_year_id == model_year_id && c.name == name)
            .map(|c| data.hydrate_configuration(c)))
    }

    async fn create_configuration(
        &self,
        model_year_id: &str,
        patch: &ConfigurationPatch,
    ) -> Result<Configuration, StoreError> {
        let configuration = self
            .commit(|data| {
                if !data.model_years.contains_key(model_year_id) {
                    return Err(StoreError::not_found("model year", model_year_id));
                }

                let name = patch
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        StoreError::Rejected("configuration name is required".to_string())
                    })?;

                if data.name_taken(model_year_id, name, None) {
                    return Err(StoreError::Conflict(format!(
                        "configuration '{}' already exists in model year '{}'",
                        name, model_year_id
                    )));
                }

                let mut configuration = Configuration::new(generate_id(), model_year_id, name);
                configuration.apply_patch(patch);
                configuration.name = name.to_string();

                let slots = std::mem::take(&mut configuration.components);
                let scope = Scope::configuration(&configuration.id);
                data.configurations
                    .insert(configuration.id.clone(), configuration.clone());
                data.replace_slots(&scope, &slots)?;
                Ok(data.hydrate_configuration(&configuration))
            })
            .await?;

        info!(
            configuration = %configuration.id,
            model_year = model_year_id,
            "created configuration"
        );
        Ok(configuration)
    }

    async fn update_configuration(
        &self,
        configuration_id: &str,
        patch: &ConfigurationPatch,
    ) -> Result<Configuration, StoreError> {
        let configuration = self
            .commit(|data| {
                let mut configuration = data
                    .configurations
                    .get(configuration_id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found("configuration", configuration_id))?;

                if let Some(name) = &patch.name {
                    if data.name_taken(&configuration.model_year_id, name, Some(configuration_id)) {
                        return Err(StoreError::Conflict(format!(
                            "configuration '{}' already exists in model year '{}'",
                            name, configuration.model_year_id
                        )));
                    }
                }

                configuration.apply_patch(patch);
                if let Some(slots) = &patch.components {
                    data.replace_slots(&Scope::configuration(configuration_id), slots)?;
                }
                configuration.components = ComponentSlots::new();
                data.configurations
                    .insert(configuration_id.to_string(), configuration.clone());
                Ok(data.hydrate_configuration(&configuration))
            })
            .await?;

        info!(configuration = configuration_id, "updated configuration");
        Ok(configuration)
    }

    async fn list_sibling_configurations(
        &self,
        model_year_id: &str,
    ) -> Result<Vec<Configuration>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .configurations
            .values()
            .filter(|c| c.model_year_id == model_year_id)
            .map(|c| data.hydrate_configuration(c))
            .collect())
    }

    async fn get_model(&self, id: &str) -> Result<Option<Model>, StoreError> {
        let data = self.data.read().await;
        Ok(data.models.get(id).map(|m| data.hydrate_model(m)))
    }

    async fn get_model_year(&self, id: &str) -> Result<Option<ModelYear>, StoreError> {
        let data = self.data.read().await;
        Ok(data.model_years.get(id).cloned())
    }

    async fn get_configuration(&self, id: &str) -> Result<Option<Configuration>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .configurations
            .get(id)
            .map(|c| data.hydrate_configuration(c)))
    }
}
