use std::fmt::Write as _;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use crate::configuration::{
    BulkAssignOutcome, CancellationToken, CatalogEngine, CopyOptions, CopyOutcome, JsonCatalogStore,
    TargetStatus,
};
use crate::models::{
    Assignment, ComponentOrigin, ComponentType, CopyGroups, EffectiveAssignment, Scope, ScopeKind,
    Section, ValidationResult,
};
use crate::resolution::SpecSheet;
use crate::settings::EngineSettings;

/// motoctl - motorcycle catalog engine
#[derive(Parser, Debug)]
#[command(name = "motoctl")]
#[command(about = "Resolve, validate and propagate motorcycle catalog configurations")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Catalog store file, overrides the settings file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Output format for reports
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a configuration and report its completeness
    Validate { configuration_id: String },
    /// Show the effective spec sheet of a configuration
    Resolve {
        configuration_id: String,
        /// Only list fields where an override disagrees with its component
        #[arg(long)]
        conflicts_only: bool,
    },
    /// List component assignments of a model or configuration
    Assignments {
        #[command(flatten)]
        scope: ScopeArgs,
        /// For a configuration, include components inherited from the model
        #[arg(long)]
        effective: bool,
    },
    /// Assign a component to a model or configuration
    Assign {
        #[command(flatten)]
        scope: ScopeArgs,
        component_type: ComponentType,
        component_id: String,
    },
    /// Remove the component of a type from a model or configuration
    Unassign {
        #[command(flatten)]
        scope: ScopeArgs,
        component_type: ComponentType,
    },
    /// Assign one component to many configurations
    BulkAssign {
        component_type: ComponentType,
        component_id: String,
        #[arg(required = true)]
        configuration_ids: Vec<String>,
    },
    /// Copy a configuration into other model years
    CopyYears {
        source_id: String,
        /// Target model year id, repeatable
        #[arg(long = "year", required = true)]
        years: Vec<String>,
        #[command(flatten)]
        groups: CopyGroupArgs,
        /// Update same-named configurations in the target years
        #[arg(long)]
        overwrite: bool,
        /// Skip target years that already have a same-named configuration
        #[arg(long, conflicts_with = "overwrite")]
        skip_existing: bool,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ScopeArgs {
    /// Model id (default components)
    #[arg(long)]
    pub model: Option<String>,

    /// Configuration id (configuration-specific components)
    #[arg(long)]
    pub configuration: Option<String>,
}

impl ScopeArgs {
    fn scope(&self) -> Result<Scope> {
        match (&self.model, &self.configuration) {
            (Some(model), None) => Ok(Scope::model(model)),
            (None, Some(configuration)) => Ok(Scope::configuration(configuration)),
            _ => Err(anyhow!("pass exactly one of --model or --configuration")),
        }
    }
}

/// Copy group switches; a group not mentioned keeps its settings default
#[derive(Args, Debug, Default)]
pub struct CopyGroupArgs {
    #[arg(long, conflicts_with = "no_basic_info")]
    pub basic_info: bool,
    #[arg(long)]
    pub no_basic_info: bool,
    #[arg(long, conflicts_with = "no_components")]
    pub components: bool,
    #[arg(long)]
    pub no_components: bool,
    #[arg(long, conflicts_with = "no_dimensions")]
    pub dimensions: bool,
    #[arg(long)]
    pub no_dimensions: bool,
}

impl CopyGroupArgs {
    pub fn resolve(&self, defaults: CopyGroups) -> CopyGroups {
        let pick = |default: bool, on: bool, off: bool| (default || on) && !off;
        CopyGroups {
            basic_info: pick(defaults.basic_info, self.basic_info, self.no_basic_info),
            components: pick(defaults.components, self.components, self.no_components),
            dimensions: pick(defaults.dimensions, self.dimensions, self.no_dimensions),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

pub async fn run_cli(cli: Cli, settings: EngineSettings) -> Result<()> {
    let output = execute(cli, &settings).await?;
    print!("{}", output);
    Ok(())
}

/// Run one command and return its rendered report
pub async fn execute(cli: Cli, settings: &EngineSettings) -> Result<String> {
    let store_path = cli.store.clone().unwrap_or_else(|| settings.store_path.clone());
    let store = JsonCatalogStore::open(&store_path)
        .await
        .with_context(|| format!("failed to open catalog store {}", store_path.display()))?;
    let engine = CatalogEngine::new(Arc::new(store));
    let format = cli.format;
    let timeout = settings.save_timeout();

    match cli.command {
        Commands::Validate { configuration_id } => {
            let result = engine.validate_configuration(&configuration_id).await?;
            render(format, &result, || validation_text(&configuration_id, &result))
        }
        Commands::Resolve {
            configuration_id,
            conflicts_only,
        } => {
            let mut sheet = engine.resolve_configuration(&configuration_id).await?;
            if conflicts_only {
                sheet.fields.retain(|f| f.resolution.has_conflict);
            }
            render(format, &sheet, || sheet_text(&sheet))
        }
        Commands::Assignments { scope, effective } => {
            let scope = scope.scope()?;
            if effective {
                if scope.kind != ScopeKind::Configuration {
                    return Err(anyhow!("--effective needs --configuration"));
                }
                let assignments = engine
                    .assignments()
                    .effective_for_configuration(&scope.id)
                    .await?;
                render(format, &assignments, || effective_text(&scope, &assignments))
            } else {
                let assignments = engine.assignments().get_assignments(&scope).await?;
                render(format, &assignments, || assignments_text(&scope, &assignments))
            }
        }
        Commands::Assign {
            scope,
            component_type,
            component_id,
        } => {
            let scope = scope.scope()?;
            let assignment = within(
                timeout,
                engine.assignments().assign(&scope, component_type, &component_id),
            )
            .await??;
            render(format, &assignment, || {
                format!("✅ Assigned {} '{}' to {}\n", component_type, component_id, scope)
            })
        }
        Commands::Unassign { scope, component_type } => {
            let scope = scope.scope()?;
            within(timeout, engine.assignments().unassign(&scope, component_type)).await??;
            let removed = serde_json::json!({ "scope": scope, "component_type": component_type });
            render(format, &removed, || {
                format!("✅ Removed {} from {}\n", component_type, scope)
            })
        }
        Commands::BulkAssign {
            component_type,
            component_id,
            configuration_ids,
        } => {
            let cancel = cancel_on_ctrl_c();
            let outcome = finish_or_cancel(
                timeout,
                &cancel,
                engine.bulk_assign(component_type, &component_id, &configuration_ids, &cancel),
            )
            .await;
            info!(summary = %outcome.summary_message(), "bulk assign finished");
            render(format, &outcome, || bulk_text(&outcome))
        }
        Commands::CopyYears {
            source_id,
            years,
            groups,
            overwrite,
            skip_existing,
        } => {
            let options = CopyOptions {
                groups: groups.resolve(settings.copy_defaults),
                allow_overwrite: overwrite,
                skip_existing,
            };
            let cancel = cancel_on_ctrl_c();
            let outcome = finish_or_cancel(
                timeout,
                &cancel,
                engine.copy_configuration_to_years(&source_id, &years, &options, &cancel),
            )
            .await?;
            info!(summary = %outcome.summary_message(), "copy finished");
            render(format, &outcome, || copy_text(&outcome))
        }
    }
}

/// Bound a save flow by the configured wall-clock limit
async fn within<T>(limit: Duration, future: impl Future<Output = T>) -> Result<T> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| anyhow!("operation did not finish within {}s", limit.as_secs()))
}

/// Run a batch under the wall-clock limit. When the limit passes the batch
/// is cancelled rather than dropped: the target in flight finishes, the rest
/// report `Cancelled` and the outcome is still returned.
async fn finish_or_cancel<T>(
    limit: Duration,
    cancel: &CancellationToken,
    batch: impl Future<Output = T>,
) -> T {
    let mut batch = std::pin::pin!(batch);
    match tokio::time::timeout(limit, batch.as_mut()).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                limit_secs = limit.as_secs(),
                "batch exceeded the save timeout, cancelling remaining targets"
            );
            cancel.cancel();
            batch.await
        }
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling remaining targets");
            watcher.cancel();
        }
    });
    cancel
}

fn render<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)? + "\n"),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
    }
}

fn validation_text(configuration_id: &str, result: &ValidationResult) -> String {
    let mut out = String::new();
    let verdict = if result.is_valid { "✅ valid" } else { "❌ invalid" };
    let _ = writeln!(
        out,
        "Configuration '{}': {} ({}% complete)",
        configuration_id, verdict, result.completeness
    );

    for section in Section::ALL {
        let _ = writeln!(out, "  {:<12} {}", section.to_string(), result.status_of(section));
    }

    if result.issues.is_empty() {
        return out;
    }

    let _ = writeln!(out, "\nIssues:");
    for issue in &result.issues {
        let _ = writeln!(out, "  {}", issue);
    }
    out
}

fn sheet_text(sheet: &SpecSheet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Spec sheet for '{}':", sheet.configuration_id);
    for field in &sheet.fields {
        let value = match (&field.unit, field.resolution.effective_value.is_some()) {
            (Some(unit), true) => format!("{} {}", field.resolution.display_value(), unit),
            _ => field.resolution.display_value(),
        };
        let _ = write!(out, "  {:<22} {:<16} [{}]", field.label, value, field.resolution.source);
        if let Some(component_value) = &field.resolution.component_value {
            let _ = write!(out, " ⚠️ component says {}", component_value);
        }
        out.push('\n');
    }
    out
}

fn assignments_text(scope: &Scope, assignments: &[Assignment]) -> String {
    if assignments.is_empty() {
        return format!("No components assigned to {}\n", scope);
    }
    let mut out = format!("Components assigned to {}:\n", scope);
    for assignment in assignments {
        let _ = writeln!(
            out,
            "  {:<14} {}",
            assignment.component_type.label(),
            assignment.component_id
        );
    }
    out
}

fn effective_text(scope: &Scope, assignments: &[EffectiveAssignment]) -> String {
    if assignments.is_empty() {
        return format!("No components in effect for {}\n", scope);
    }
    let mut out = format!("Components in effect for {}:\n", scope);
    for assignment in assignments {
        let origin = match assignment.origin {
            ComponentOrigin::Configuration => "",
            ComponentOrigin::Model => " (model default)",
        };
        let _ = writeln!(
            out,
            "  {:<14} {}{}",
            assignment.component_type.label(),
            assignment.component_id,
            origin
        );
    }
    out
}

fn bulk_text(outcome: &BulkAssignOutcome) -> String {
    let mut out = String::new();
    for result in &outcome.results {
        let _ = writeln!(out, "  {} {}", status_mark(&result.status), result.configuration_id);
        if let TargetStatus::Failed { error } = &result.status {
            let _ = writeln!(out, "      {}", error);
        }
    }
    let _ = writeln!(out, "{}", outcome.summary_message());
    out
}

fn copy_text(outcome: &CopyOutcome) -> String {
    let mut out = String::new();
    for result in &outcome.results {
        let _ = write!(
            out,
            "  {} {} {}",
            status_mark(&result.status),
            result.year_label,
            result.action
        );
        if let Some(id) = &result.configuration_id {
            let _ = write!(out, " ({})", id);
        }
        out.push('\n');
        if let TargetStatus::Failed { error } = &result.status {
            let _ = writeln!(out, "      {}", error);
        }
    }
    let _ = writeln!(out, "{}", outcome.summary_message());
    out
}

fn status_mark(status: &TargetStatus) -> &'static str {
    match status {
        TargetStatus::Succeeded => "✅",
        TargetStatus::Failed { .. } => "❌",
        TargetStatus::Cancelled => "⏹️",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::test_support::seeded_data;
    use crate::configuration::CatalogStore;
    use tempfile::TempDir;

    fn write_store(temp_dir: &TempDir) -> PathBuf {
        let path = temp_dir.path().join("catalog.json");
        let content = serde_json::to_string_pretty(&seeded_data()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn parse(store: &std::path::Path, args: &[&str]) -> Cli {
        let mut argv = vec!["motoctl", "--store", store.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_scope_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["motoctl", "assignments"]).is_err());
        assert!(Cli::try_parse_from([
            "motoctl",
            "assignments",
            "--model",
            "mt-07",
            "--configuration",
            "cfg-2022-sport"
        ])
        .is_err());

        let cli =
            Cli::try_parse_from(["motoctl", "assign", "--model", "mt-07", "brake", "brk-dual"]);
        assert!(cli.is_err(), "component types use their snake_case keys");

        let cli = Cli::try_parse_from([
            "motoctl",
            "assign",
            "--model",
            "mt-07",
            "brake_system",
            "brk-dual",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Assign {
                component_type: ComponentType::BrakeSystem,
                ..
            }
        ));
    }

    #[test]
    fn test_copy_years_rejects_overwrite_with_skip() {
        let result = Cli::try_parse_from([
            "motoctl",
            "copy-years",
            "cfg-2022-sport",
            "--year",
            "my-2023",
            "--overwrite",
            "--skip-existing",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_copy_group_flags_switch_settings_defaults_both_ways() {
        let defaults = CopyGroups {
            basic_info: true,
            components: true,
            dimensions: false,
        };
        let cli = Cli::try_parse_from([
            "motoctl",
            "copy-years",
            "cfg-2022-sport",
            "--year",
            "my-2025",
            "--no-components",
            "--dimensions",
        ])
        .unwrap();
        let Commands::CopyYears { groups, .. } = cli.command else {
            panic!("expected copy-years");
        };
        assert_eq!(
            groups.resolve(defaults),
            CopyGroups {
                basic_info: true,
                components: false,
                dimensions: true,
            }
        );
        assert_eq!(CopyGroupArgs::default().resolve(defaults), defaults);

        let both = Cli::try_parse_from([
            "motoctl",
            "copy-years",
            "cfg-2022-sport",
            "--year",
            "my-2025",
            "--dimensions",
            "--no-dimensions",
        ]);
        assert!(both.is_err());
    }

    #[tokio::test]
    async fn test_batch_past_time_limit_is_cancelled_not_dropped() {
        let cancel = CancellationToken::new();
        let watched = cancel.clone();

        let finished_rounds = finish_or_cancel(Duration::from_millis(20), &cancel, async move {
            let mut rounds = 0;
            while !watched.is_cancelled() {
                tokio::time::sleep(Duration::from_millis(5)).await;
                rounds += 1;
            }
            rounds
        })
        .await;

        assert!(cancel.is_cancelled());
        assert!(finished_rounds > 0);

        let quick = finish_or_cancel(Duration::from_secs(5), &CancellationToken::new(), async {
            "done"
        })
        .await;
        assert_eq!(quick, "done");
    }

    #[tokio::test]
    async fn test_copy_years_can_enable_group_disabled_in_settings() {
        let temp_dir = TempDir::new().unwrap();
        let store = write_store(&temp_dir);
        let mut settings = EngineSettings::default();
        settings.copy_defaults.dimensions = false;

        execute(
            parse(
                &store,
                &[
                    "copy-years",
                    "cfg-2022-sport",
                    "--year",
                    "my-2025",
                    "--no-basic-info",
                    "--no-components",
                    "--dimensions",
                ],
            ),
            &settings,
        )
        .await
        .unwrap();

        let reopened = JsonCatalogStore::open(&store).await.unwrap();
        let copied = reopened
            .find_configuration_by_name("my-2025", "Sport")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(copied.dimensions.seat_height_mm, Some(805.0));
        assert_eq!(copied.basic.price, None);
    }

    #[tokio::test]
    async fn test_validate_renders_text_and_json() {
        let temp_dir = TempDir::new().unwrap();
        let store = write_store(&temp_dir);
        let settings = EngineSettings::default();

        let text = execute(parse(&store, &["validate", "cfg-2022-base"]), &settings)
            .await
            .unwrap();
        assert!(text.contains("❌ invalid"));
        assert!(text.contains("Missing required component: engine"));

        let json = execute(
            parse(&store, &["--format", "json", "validate", "cfg-2022-sport"]),
            &settings,
        )
        .await
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["is_valid"], serde_json::Value::Bool(true));
    }

    #[tokio::test]
    async fn test_assign_persists_to_store_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = write_store(&temp_dir);
        let settings = EngineSettings::default();

        let text = execute(
            parse(
                &store,
                &["assign", "--configuration", "cfg-2022-base", "engine", "eng-cp2"],
            ),
            &settings,
        )
        .await
        .unwrap();
        assert!(text.starts_with("✅ Assigned engine 'eng-cp2'"));

        let yaml = execute(
            parse(
                &store,
                &["--format", "yaml", "assignments", "--configuration", "cfg-2022-base"],
            ),
            &settings,
        )
        .await
        .unwrap();
        assert!(yaml.contains("eng-cp2"));
    }

    #[tokio::test]
    async fn test_copy_years_uses_settings_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = write_store(&temp_dir);
        let mut settings = EngineSettings::default();
        settings.copy_defaults.dimensions = false;

        let text = execute(
            parse(
                &store,
                &["copy-years", "cfg-2022-sport", "--year", "my-2025", "--no-components"],
            ),
            &settings,
        )
        .await
        .unwrap();
        assert!(text.contains("Copied to 1 year(s): 1 created, 0 updated"));

        // only basic info was left enabled
        let err = execute(
            parse(
                &store,
                &[
                    "copy-years",
                    "cfg-2022-sport",
                    "--year",
                    "my-2025",
                    "--no-basic-info",
                    "--no-components",
                ],
            ),
            &settings,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("select at least one group"));
    }

    #[tokio::test]
    async fn test_unknown_configuration_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = write_store(&temp_dir);
        let err = execute(parse(&store, &["resolve", "cfg-none"]), &EngineSettings::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("configuration 'cfg-none' not found"));
    }
}
