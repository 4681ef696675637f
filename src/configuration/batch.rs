use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::store::{CatalogStore, StoreError};
use crate::assignment::AssignmentManager;
use crate::models::{
    ComponentId, ComponentType, Configuration, ConfigurationId, ConfigurationPatch, CopyGroups,
    ModelYearId, Scope,
};

/// Cooperative cancellation flag, checked between batch targets
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Outcome of one batch target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetStatus {
    Succeeded,
    Failed { error: String },
    /// Not attempted because the batch was cancelled
    Cancelled,
}

impl TargetStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TargetStatus::Succeeded)
    }
}

/// Result for one configuration of a bulk assignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignTargetResult {
    pub configuration_id: ConfigurationId,
    #[serde(flatten)]
    pub status: TargetStatus,
}

/// Aggregate result of a bulk assignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkAssignOutcome {
    pub component_type: ComponentType,
    pub component_id: ComponentId,
    pub results: Vec<AssignTargetResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BulkAssignOutcome {
    pub fn summary_message(&self) -> String {
        let mut message = format!(
            "Assigned {} '{}' to {} configuration(s)",
            self.component_type, self.component_id, self.succeeded
        );
        if self.failed > 0 {
            message.push_str(&format!(", {} failed", self.failed));
        }
        if self.cancelled > 0 {
            message.push_str(&format!(", {} cancelled", self.cancelled));
        }
        message
    }
}

/// What a multi-year copy does for one target year
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CopyAction {
    Created,
    Updated,
    Skipped,
}

impl std::fmt::Display for CopyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyAction::Created => write!(f, "created"),
            CopyAction::Updated => write!(f, "updated"),
            CopyAction::Skipped => write!(f, "skipped"),
        }
    }
}

/// Options of a multi-year copy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CopyOptions {
    pub groups: CopyGroups,
    /// Update a same-named configuration in the target year
    pub allow_overwrite: bool,
    /// Without overwrite, skip years that already have a match instead of
    /// rejecting the whole batch
    pub skip_existing: bool,
}

/// Result for one target year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearCopyResult {
    pub model_year_id: ModelYearId,
    /// Year number when known, the id otherwise
    pub year_label: String,
    pub action: CopyAction,
    #[serde(flatten)]
    pub status: TargetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_id: Option<ConfigurationId>,
}

/// Aggregate result of a multi-year copy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CopyOutcome {
    pub results: Vec<YearCopyResult>,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl CopyOutcome {
    fn push(&mut self, result: YearCopyResult) {
        match (&result.status, result.action) {
            (TargetStatus::Succeeded, CopyAction::Created) => self.created += 1,
            (TargetStatus::Succeeded, CopyAction::Updated) => self.updated += 1,
            (TargetStatus::Succeeded, CopyAction::Skipped) => self.skipped += 1,
            (TargetStatus::Failed { .. }, CopyAction::Skipped) => {
                self.skipped += 1;
                self.failed += 1;
            }
            (TargetStatus::Failed { .. }, _) => self.failed += 1,
            (TargetStatus::Cancelled, _) => self.cancelled += 1,
        }
        self.results.push(result);
    }

    /// One-line summary for the caller's notification
    pub fn summary_message(&self) -> String {
        let mut message = format!(
            "Copied to {} year(s): {} created, {} updated",
            self.created + self.updated,
            self.created,
            self.updated
        );
        if self.failed > 0 {
            message.push_str(&format!(", {} failed", self.failed));
        }
        if self.cancelled > 0 {
            message.push_str(&format!(", {} cancelled", self.cancelled));
        }
        message
    }
}

/// Rejections raised before a copy touches the store
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("select at least one target year")]
    NoTargetYears,

    #[error("select at least one group to copy (basic info, components, dimensions)")]
    NoGroupsSelected,

    #[error(
        "configuration '{}' already exists in {}; enable overwrite to update it",
        .name,
        .years.join(", ")
    )]
    OverwriteNotAllowed { name: String, years: Vec<String> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct PlannedCopy {
    model_year_id: ModelYearId,
    year_label: String,
    existing: Option<ConfigurationId>,
}

/// Applies one change to many targets, one store call at a time
pub struct BatchPropagator {
    store: Arc<dyn CatalogStore>,
    assignments: AssignmentManager,
}

impl BatchPropagator {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            assignments: AssignmentManager::new(store.clone()),
            store,
        }
    }

    /// Assign one component to many configurations. Every target is
    /// attempted in order; a failure does not stop or roll back the others.
    pub async fn bulk_assign(
        &self,
        component_type: ComponentType,
        component_id: &str,
        configuration_ids: &[ConfigurationId],
        cancel: &CancellationToken,
    ) -> BulkAssignOutcome {
        let mut outcome = BulkAssignOutcome {
            component_type,
            component_id: component_id.to_string(),
            results: Vec::with_capacity(configuration_ids.len()),
            succeeded: 0,
            failed: 0,
            cancelled: 0,
        };

        for configuration_id in configuration_ids {
            let status = if cancel.is_cancelled() {
                outcome.cancelled += 1;
                TargetStatus::Cancelled
            } else {
                let scope = Scope::configuration(configuration_id);
                match self.assignments.assign(&scope, component_type, component_id).await {
                    Ok(_) => {
                        outcome.succeeded += 1;
                        TargetStatus::Succeeded
                    }
                    Err(e) => {
                        warn!(
                            configuration = %configuration_id,
                            error = %e,
                            "bulk assignment target failed"
                        );
                        outcome.failed += 1;
                        TargetStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                }
            };

            outcome.results.push(AssignTargetResult {
                configuration_id: configuration_id.clone(),
                status,
            });
        }

        info!(
            %component_type,
            component_id,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            cancelled = outcome.cancelled,
            "bulk assignment finished"
        );
        outcome
    }

    /// Copy a configuration into other model years.
    ///
    /// Each year gets a new configuration, or an update of the same-named
    /// one when overwrite is allowed. Pre-flight checks run before any
    /// mutation: no targets, no groups, or an existing match without
    /// overwrite (unless `skip_existing`) reject the whole batch.
    pub async fn copy_to_years(
        &self,
        source: &Configuration,
        target_year_ids: &[ModelYearId],
        options: &CopyOptions,
        cancel: &CancellationToken,
    ) -> Result<CopyOutcome, CopyError> {
        if target_year_ids.is_empty() {
            return Err(CopyError::NoTargetYears);
        }
        if !options.groups.any() {
            return Err(CopyError::NoGroupsSelected);
        }

        let plan = self.plan_copy(source, target_year_ids).await?;

        let conflicting: Vec<String> = plan
            .iter()
            .filter(|p| p.existing.is_some())
            .map(|p| p.year_label.clone())
            .collect();
        if !conflicting.is_empty() && !options.allow_overwrite && !options.skip_existing {
            warn!(
                configuration = %source.id,
                years = %conflicting.join(", "),
                "copy rejected: targets already exist and overwrite is off"
            );
            return Err(CopyError::OverwriteNotAllowed {
                name: source.name.clone(),
                years: conflicting,
            });
        }

        let patch = ConfigurationPatch::copy_from(source, options.groups);
        let mut outcome = CopyOutcome::default();

        for planned in plan {
            let action = match (&planned.existing, options.allow_overwrite) {
                (None, _) => CopyAction::Created,
                (Some(_), true) => CopyAction::Updated,
                (Some(_), false) => CopyAction::Skipped,
            };

            if cancel.is_cancelled() {
                outcome.push(YearCopyResult {
                    model_year_id: planned.model_year_id,
                    year_label: planned.year_label,
                    action,
                    status: TargetStatus::Cancelled,
                    configuration_id: planned.existing,
                });
                continue;
            }

            let result = match (action, &planned.existing) {
                (CopyAction::Updated, Some(existing_id)) => self
                    .store
                    .update_configuration(existing_id, &patch)
                    .await
                    .map(|c| Some(c.id)),
                (CopyAction::Skipped, _) => Err(StoreError::Conflict(format!(
                    "configuration '{}' already exists in {}",
                    source.name, planned.year_label
                ))),
                _ => self
                    .store
                    .create_configuration(&planned.model_year_id, &patch)
                    .await
                    .map(|c| Some(c.id)),
            };

            let (status, configuration_id) = match result {
                Ok(id) => (TargetStatus::Succeeded, id),
                Err(e) => {
                    warn!(
                        model_year = %planned.model_year_id,
                        %action,
                        error = %e,
                        "copy target failed"
                    );
                    (
                        TargetStatus::Failed {
                            error: e.to_string(),
                        },
                        planned.existing,
                    )
                }
            };

            outcome.push(YearCopyResult {
                model_year_id: planned.model_year_id,
                year_label: planned.year_label,
                action,
                status,
                configuration_id,
            });
        }

        info!(
            configuration = %source.id,
            created = outcome.created,
            updated = outcome.updated,
            failed = outcome.failed,
            cancelled = outcome.cancelled,
            "multi-year copy finished"
        );
        Ok(outcome)
    }

    /// Look up the existing match in every target year. Reads only.
    async fn plan_copy(
        &self,
        source: &Configuration,
        target_year_ids: &[ModelYearId],
    ) -> Result<Vec<PlannedCopy>, StoreError> {
        let mut seen = BTreeSet::new();
        let mut plan = Vec::new();

        for model_year_id in target_year_ids {
            if !seen.insert(model_year_id.as_str()) {
                continue;
            }

            let year_label = match self.store.get_model_year(model_year_id).await? {
                Some(year) => year.year.to_string(),
                None => model_year_id.clone(),
            };
            let existing = self
                .store
                .find_configuration_by_name(model_year_id, &source.name)
                .await?
                .map(|c| c.id);

            plan.push(PlannedCopy {
                model_year_id: model_year_id.clone(),
                year_label,
                existing,
            });
        }

        Ok(plan)
    }
}
