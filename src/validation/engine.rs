use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::{
    ComponentOrigin, ComponentType, Configuration, Model, ModelYear, Section, SectionStatus,
    Severity, ValidationIssue, ValidationResult, YearStatus,
};
use crate::resolution::effective_assignments;

/// Score at which the basic section counts as complete
pub const BASIC_COMPLETE_AT: u32 = 75;
/// Score at which the components section counts as complete
pub const COMPONENTS_COMPLETE_AT: u32 = 80;
/// Score at which the dimensions section counts as complete
pub const DIMENSIONS_COMPLETE_AT: u32 = 60;

const POINTS_PER_BASIC_CHECK: u32 = 25;
const POINTS_PER_COMPONENT: u32 = 20;
const POINTS_PER_DIMENSION: u32 = 20;

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Validate a configuration against its model, model year and the other
/// configurations of the same year.
///
/// Pure function: no I/O, identical inputs give identical output.
/// `siblings` may or may not include `configuration` itself.
pub fn validate(
    configuration: &Configuration,
    model: &Model,
    model_year: &ModelYear,
    siblings: &[Configuration],
) -> ValidationResult {
    let mut issues = Vec::new();

    let basic_score = check_basic(configuration, model_year, siblings, &mut issues);
    let component_score = check_components(configuration, model, &mut issues);
    let dimension_score = check_dimensions(configuration, &mut issues);

    let completeness =
        ((basic_score + component_score + dimension_score) as f64 / 3.0).round() as u32;

    let metrics_status = if configuration.basic.price.is_some() {
        SectionStatus::Complete
    } else {
        SectionStatus::Partial
    };

    let mut section_status = BTreeMap::new();
    section_status.insert(
        Section::Basic,
        SectionStatus::from_score(basic_score, BASIC_COMPLETE_AT),
    );
    section_status.insert(
        Section::Components,
        SectionStatus::from_score(component_score, COMPONENTS_COMPLETE_AT),
    );
    section_status.insert(
        Section::Dimensions,
        SectionStatus::from_score(dimension_score, DIMENSIONS_COMPLETE_AT),
    );
    section_status.insert(Section::Metrics, metrics_status);
    section_status.insert(Section::Notes, SectionStatus::Complete);

    let is_valid = !issues.iter().any(|i| i.severity == Severity::Error);

    debug!(
        configuration = %configuration.id,
        basic_score,
        component_score,
        dimension_score,
        completeness,
        issues = issues.len(),
        "validated configuration"
    );

    ValidationResult {
        is_valid,
        completeness,
        issues,
        section_status,
    }
}

fn check_basic(
    configuration: &Configuration,
    model_year: &ModelYear,
    siblings: &[Configuration],
    issues: &mut Vec<ValidationIssue>,
) -> u32 {
    let basic = &configuration.basic;
    let checks = [
        !configuration.name.trim().is_empty(),
        has_text(&basic.market_region),
        basic.price.is_some(),
        has_text(&basic.trim_level),
    ];
    let score = checks.iter().filter(|passed| **passed).count() as u32 * POINTS_PER_BASIC_CHECK;

    if !checks[0] {
        issues.push(
            ValidationIssue::error(Section::Basic, "Configuration name is required")
                .with_hint("Enter a trim name such as \"Base\" or \"Sport\""),
        );
    }

    // The configuration under validation counts as a sibling whether or not
    // the caller included it.
    let mut seen = BTreeSet::new();
    let defaults = std::iter::once(configuration)
        .chain(siblings.iter())
        .filter(|c| seen.insert(c.id.as_str()))
        .filter(|c| c.is_default)
        .count();

    if defaults == 0 {
        issues.push(
            ValidationIssue::error(
                Section::Basic,
                format!("Model year {} has no default configuration", model_year.year),
            )
            .with_hint("Mark one configuration of this year as the default"),
        );
    } else if defaults > 1 {
        issues.push(
            ValidationIssue::warning(
                Section::Basic,
                format!(
                    "Model year {} has {} configurations marked as default",
                    model_year.year, defaults
                ),
            )
            .with_hint("Keep exactly one default configuration per year"),
        );
    }

    if model_year.status == YearStatus::Discontinued {
        issues.push(ValidationIssue::info(
            Section::Basic,
            format!("Model year {} is discontinued", model_year.year),
        ));
    }

    score
}

fn check_components(
    configuration: &Configuration,
    model: &Model,
    issues: &mut Vec<ValidationIssue>,
) -> u32 {
    let effective: BTreeMap<ComponentType, ComponentOrigin> =
        effective_assignments(&configuration.components, &model.components)
            .into_iter()
            .map(|a| (a.component_type, a.origin))
            .collect();

    let mut score = 0;
    for component_type in ComponentType::ALL {
        match effective.get(&component_type) {
            Some(origin) => {
                score += POINTS_PER_COMPONENT;
                if *origin == ComponentOrigin::Model {
                    issues.push(ValidationIssue::info(
                        Section::Components,
                        format!(
                            "{} inherited from model default",
                            capitalize(component_type.label())
                        ),
                    ));
                }
            }
            None if component_type.is_required() => {
                issues.push(
                    ValidationIssue::error(
                        Section::Components,
                        format!("Missing required component: {}", component_type.label()),
                    )
                    .with_hint(format!(
                        "Assign a {} to this configuration or set a model default",
                        component_type.label()
                    )),
                );
            }
            None => {
                issues.push(
                    ValidationIssue::warning(
                        Section::Components,
                        format!("Missing optional component: {}", component_type.label()),
                    )
                    .with_hint(format!(
                        "Assign {} for a complete spec sheet",
                        component_type.label()
                    )),
                );
            }
        }
    }

    score
}

fn check_dimensions(configuration: &Configuration, issues: &mut Vec<ValidationIssue>) -> u32 {
    let mut score = 0;
    for (label, value) in configuration.dimensions.entries() {
        if value.is_some() {
            score += POINTS_PER_DIMENSION;
        } else {
            issues.push(ValidationIssue::warning(
                Section::Dimensions,
                format!("Missing dimension: {}", label),
            ));
        }
    }
    score
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
