use std::sync::Arc;

use tracing::debug;

use super::batch::{
    BatchPropagator, BulkAssignOutcome, CancellationToken, CopyError, CopyOptions, CopyOutcome,
};
use super::store::{CatalogStore, StoreError};
use crate::assignment::{AssignmentError, AssignmentManager};
use crate::models::{
    ComponentType, Configuration, ConfigurationId, Model, ModelYear, ModelYearId, ValidationResult,
};
use crate::resolution::{effective_assignments, resolve_spec_sheet, ComponentSet, SpecSheet};
use crate::validation;

/// Errors from engine operations that load their own context
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    Copy(#[from] CopyError),
}

/// A configuration with the records it is validated and resolved against
#[derive(Debug, Clone)]
pub struct ConfigurationContext {
    pub configuration: Configuration,
    pub model_year: ModelYear,
    pub model: Model,
    pub siblings: Vec<Configuration>,
}

/// Central entry point: loads state from the store and hands it to the
/// resolver, validator and batch engine. Nothing is cached between calls.
pub struct CatalogEngine {
    store: Arc<dyn CatalogStore>,
    assignments: AssignmentManager,
    batch: BatchPropagator,
}

impl CatalogEngine {
    /// Create a new engine over a store
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            assignments: AssignmentManager::new(store.clone()),
            batch: BatchPropagator::new(store.clone()),
            store,
        }
    }

    pub fn assignments(&self) -> &AssignmentManager {
        &self.assignments
    }

    pub fn batch(&self) -> &BatchPropagator {
        &self.batch
    }

    /// Load a configuration together with its model year, model and siblings
    pub async fn load_context(
        &self,
        configuration_id: &str,
    ) -> Result<ConfigurationContext, EngineError> {
        let configuration = self
            .store
            .get_configuration(configuration_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "configuration",
                id: configuration_id.to_string(),
            })?;

        let model_year = self
            .store
            .get_model_year(&configuration.model_year_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "model year",
                id: configuration.model_year_id.clone(),
            })?;

        let model = self
            .store
            .get_model(&model_year.model_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "model",
                id: model_year.model_id.clone(),
            })?;

        let siblings = self
            .store
            .list_sibling_configurations(&model_year.id)
            .await?;

        Ok(ConfigurationContext {
            configuration,
            model_year,
            model,
            siblings,
        })
    }

    /// Validate a configuration as currently stored
    pub async fn validate_configuration(
        &self,
        configuration_id: &str,
    ) -> Result<ValidationResult, EngineError> {
        let context = self.load_context(configuration_id).await?;
        Ok(validation::validate(
            &context.configuration,
            &context.model,
            &context.model_year,
            &context.siblings,
        ))
    }

    /// Resolve every spec field of a configuration as currently stored
    pub async fn resolve_configuration(
        &self,
        configuration_id: &str,
    ) -> Result<SpecSheet, EngineError> {
        let context = self.load_context(configuration_id).await?;

        let mut components = ComponentSet::new();
        let effective =
            effective_assignments(&context.configuration.components, &context.model.components);
        for assignment in effective {
            match self
                .store
                .get_component(assignment.component_type, &assignment.component_id)
                .await?
            {
                Some(component) => {
                    components.insert(assignment.component_type, component);
                }
                None => {
                    debug!(
                        component_type = %assignment.component_type,
                        component_id = %assignment.component_id,
                        "assigned component no longer exists"
                    );
                }
            }
        }

        Ok(resolve_spec_sheet(&context.configuration, &context.model, &components))
    }

    /// Assign a component to many configurations
    pub async fn bulk_assign(
        &self,
        component_type: ComponentType,
        component_id: &str,
        configuration_ids: &[ConfigurationId],
        cancel: &CancellationToken,
    ) -> BulkAssignOutcome {
        self.batch
            .bulk_assign(component_type, component_id, configuration_ids, cancel)
            .await
    }

    /// Copy a stored configuration into other model years
    pub async fn copy_configuration_to_years(
        &self,
        source_id: &str,
        target_year_ids: &[ModelYearId],
        options: &CopyOptions,
        cancel: &CancellationToken,
    ) -> Result<CopyOutcome, EngineError> {
        let source = self
            .store
            .get_configuration(source_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "configuration",
                id: source_id.to_string(),
            })?;

        Ok(self
            .batch
            .copy_to_years(&source, target_year_ids, options, cancel)
            .await?)
    }
}
