use std::sync::Arc;

use tracing::{debug, info};

use crate::configuration::{CatalogStore, StoreError};
use crate::models::{Assignment, ComponentType, EffectiveAssignment, Scope, ScopeKind};
use crate::resolution::effective_assignments;

/// Errors from assignment operations
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("{scope} does not exist")]
    ScopeNotFound { scope: Scope },

    #[error("{component_type} component '{component_id}' does not exist")]
    ComponentNotFound {
        component_type: ComponentType,
        component_id: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Manages component links at model scope (defaults) and configuration
/// scope (overrides)
pub struct AssignmentManager {
    store: Arc<dyn CatalogStore>,
}

impl AssignmentManager {
    /// Create a new assignment manager
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    async fn ensure_scope(&self, scope: &Scope) -> Result<(), AssignmentError> {
        let exists = match scope.kind {
            ScopeKind::Model => self.store.get_model(&scope.id).await?.is_some(),
            ScopeKind::Configuration => self.store.get_configuration(&scope.id).await?.is_some(),
        };

        if exists {
            Ok(())
        } else {
            Err(AssignmentError::ScopeNotFound {
                scope: scope.clone(),
            })
        }
    }

    /// Link a component to a scope, replacing any component of the same type
    pub async fn assign(
        &self,
        scope: &Scope,
        component_type: ComponentType,
        component_id: &str,
    ) -> Result<Assignment, AssignmentError> {
        self.ensure_scope(scope).await?;

        if self
            .store
            .get_component(component_type, component_id)
            .await?
            .is_none()
        {
            return Err(AssignmentError::ComponentNotFound {
                component_type,
                component_id: component_id.to_string(),
            });
        }

        let assignment = self
            .store
            .upsert_assignment(scope, component_type, component_id)
            .await?;

        info!(%scope, %component_type, component_id, "assigned component");
        Ok(assignment)
    }

    /// Remove the component of a type from a scope. Nothing to remove is not
    /// an error.
    pub async fn unassign(
        &self,
        scope: &Scope,
        component_type: ComponentType,
    ) -> Result<(), AssignmentError> {
        self.store.delete_assignment(scope, component_type).await?;
        info!(%scope, %component_type, "unassigned component");
        Ok(())
    }

    /// Current assignments of a scope
    pub async fn get_assignments(&self, scope: &Scope) -> Result<Vec<Assignment>, AssignmentError> {
        let mut assignments = self.store.get_assignments_for_scope(scope).await?;
        assignments.sort_by_key(|a| a.component_type);
        Ok(assignments)
    }

    /// Whether the scope currently holds exactly this component
    pub async fn is_assigned(
        &self,
        scope: &Scope,
        component_type: ComponentType,
        component_id: &str,
    ) -> Result<bool, AssignmentError> {
        let assignments = self.store.get_assignments_for_scope(scope).await?;
        Ok(assignments
            .iter()
            .any(|a| a.component_type == component_type && a.component_id == component_id))
    }

    /// Components in effect for a configuration, with model defaults filled
    /// in where the configuration has no override
    pub async fn effective_for_configuration(
        &self,
        configuration_id: &str,
    ) -> Result<Vec<EffectiveAssignment>, AssignmentError> {
        let scope = Scope::configuration(configuration_id);
        let configuration = self
            .store
            .get_configuration(configuration_id)
            .await?
            .ok_or_else(|| AssignmentError::ScopeNotFound {
                scope: scope.clone(),
            })?;

        let model_slots = match self.store.get_model_year(&configuration.model_year_id).await? {
            Some(year) => self
                .store
                .get_model(&year.model_id)
                .await?
                .map(|m| m.components)
                .unwrap_or_default(),
            None => Default::default(),
        };

        let effective = effective_assignments(&configuration.components, &model_slots);
        debug!(configuration = configuration_id, count = effective.len(), "effective assignments");
        Ok(effective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::test_support::seeded_store;
    use crate::models::ComponentOrigin;

    fn manager() -> AssignmentManager {
        AssignmentManager::new(Arc::new(seeded_store()))
    }

    #[tokio::test]
    async fn test_assign_and_query() {
        let manager = manager();
        let scope = Scope::configuration("cfg-2023-base");

        assert!(!manager
            .is_assigned(&scope, ComponentType::Engine, "eng-cp2")
            .await
            .unwrap());

        manager.assign(&scope, ComponentType::Engine, "eng-cp2").await.unwrap();

        assert!(manager
            .is_assigned(&scope, ComponentType::Engine, "eng-cp2")
            .await
            .unwrap());
        assert_eq!(manager.get_assignments(&scope).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reassigning_same_component_is_idempotent() {
        let manager = manager();
        let scope = Scope::configuration("cfg-2022-sport");

        assert!(manager
            .is_assigned(&scope, ComponentType::Engine, "eng-cp2")
            .await
            .unwrap());
        manager.assign(&scope, ComponentType::Engine, "eng-cp2").await.unwrap();
        manager.assign(&scope, ComponentType::Engine, "eng-cp2").await.unwrap();

        let engines = manager
            .get_assignments(&scope)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.component_type == ComponentType::Engine)
            .count();
        assert_eq!(engines, 1);
        assert!(manager
            .is_assigned(&scope, ComponentType::Engine, "eng-cp2")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_assign_replaces_previous_component_of_type() {
        let manager = manager();
        let scope = Scope::configuration("cfg-2022-sport");

        manager
            .assign(&scope, ComponentType::Engine, "eng-cp2-tuned")
            .await
            .unwrap();

        assert!(!manager
            .is_assigned(&scope, ComponentType::Engine, "eng-cp2")
            .await
            .unwrap());
        assert!(manager
            .is_assigned(&scope, ComponentType::Engine, "eng-cp2-tuned")
            .await
            .unwrap());
        // engine, brake system, frame
        assert_eq!(manager.get_assignments(&scope).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_assign_fails_for_missing_scope_or_component() {
        let manager = manager();

        let err = manager
            .assign(&Scope::model("r7"), ComponentType::Engine, "eng-cp2")
            .await
            .unwrap_err();
        assert!(matches!(err, AssignmentError::ScopeNotFound { .. }));

        let err = manager
            .assign(&Scope::model("mt-07"), ComponentType::Engine, "eng-cp4")
            .await
            .unwrap_err();
        assert!(matches!(err, AssignmentError::ComponentNotFound { .. }));
        assert_eq!(err.to_string(), "engine component 'eng-cp4' does not exist");

        // a wheel id is not an engine
        let err = manager
            .assign(&Scope::model("mt-07"), ComponentType::Engine, "whl-17")
            .await
            .unwrap_err();
        assert!(matches!(err, AssignmentError::ComponentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unassign_missing_is_noop() {
        let manager = manager();
        let scope = Scope::configuration("cfg-2023-base");

        manager.unassign(&scope, ComponentType::Wheel).await.unwrap();
        assert!(manager.get_assignments(&scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_default_visible_in_effective_assignments() {
        let manager = manager();
        manager
            .assign(&Scope::model("mt-07"), ComponentType::Wheel, "whl-17")
            .await
            .unwrap();
        manager
            .assign(&Scope::model("mt-07"), ComponentType::Engine, "eng-cp2-tuned")
            .await
            .unwrap();

        let effective = manager.effective_for_configuration("cfg-2022-sport").await.unwrap();

        let engine = effective
            .iter()
            .find(|a| a.component_type == ComponentType::Engine)
            .unwrap();
        assert_eq!(engine.component_id, "eng-cp2");
        assert_eq!(engine.origin, ComponentOrigin::Configuration);

        let wheel = effective
            .iter()
            .find(|a| a.component_type == ComponentType::Wheel)
            .unwrap();
        assert_eq!(wheel.origin, ComponentOrigin::Model);

        manager
            .unassign(&Scope::model("mt-07"), ComponentType::Wheel)
            .await
            .unwrap();
        let effective = manager.effective_for_configuration("cfg-2022-sport").await.unwrap();
        assert!(effective.iter().all(|a| a.component_type != ComponentType::Wheel));
    }
}
