//! AITEA CLI - feature library, time tracking and effort estimation.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use aitea_core::{AppConfig, EntryFilter, EstimationStyle};
use aitea_estimation::{EstimationService, NewScenario, ScenarioService, SeedReconciler};
use aitea_library::{match_brd, FeatureFilter, FeatureLibrary, FeatureUpdate, NewFeature, TemplateRegistry};
use aitea_report::{self as report, OutputFormat, ReportService};
use aitea_storage::{JsonStorage, Storage};
use aitea_tracking::{ImportFormat, TimeTrackingService};

#[derive(Parser)]
#[command(name = "aitea")]
#[command(about = "Effort estimation from tracked time", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the JSON data files
    #[arg(long, global = true, env = "AITEA_DATA_DIR", default_value = ".aitea")]
    data_dir: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the feature library
    #[command(subcommand)]
    Feature(FeatureCommand),
    /// Record and import tracked time
    #[command(subcommand)]
    Tracked(TrackedCommand),
    /// Estimate features and projects
    #[command(subcommand)]
    Estimate(EstimateCommand),
    /// Show or change settings
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Data quality checks
    #[command(subcommand)]
    Quality(QualityCommand),
    /// Tracked time reports
    #[command(subcommand)]
    Report(ReportCommand),
    /// Built-in project templates
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Best, likely and worst case scenarios
    #[command(subcommand)]
    Scenario(ScenarioCommand),
}

#[derive(Subcommand)]
enum FeatureCommand {
    /// Add a feature
    Add {
        /// Feature name
        name: String,
        /// Owning team
        #[arg(long)]
        team: String,
        /// Process or phase
        #[arg(long, default_value = "development")]
        process: String,
        /// Seed estimate in hours
        #[arg(long)]
        seed: f64,
        /// Alternative name (repeatable)
        #[arg(long = "synonym")]
        synonyms: Vec<String>,
        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List features
    List {
        /// Filter by team
        #[arg(long)]
        team: Option<String>,
        /// Filter by process
        #[arg(long)]
        process: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show feature details
    Show {
        /// Feature name, synonym or id
        feature: String,
    },
    /// Update a feature
    Update {
        /// Feature name, synonym or id
        feature: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New team
        #[arg(long)]
        team: Option<String>,
        /// New process
        #[arg(long)]
        process: Option<String>,
        /// New seed estimate in hours
        #[arg(long)]
        seed: Option<f64>,
        /// New notes
        #[arg(long)]
        notes: Option<String>,
        /// Synonym to add (repeatable)
        #[arg(long = "synonym")]
        synonyms: Vec<String>,
    },
    /// Remove a feature with no tracked time
    Remove {
        /// Feature name, synonym or id
        feature: String,
    },
    /// Search features
    Search {
        /// Search text
        query: String,
        /// Maximum results
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum TrackedCommand {
    /// Record hours against a feature
    Add {
        /// Feature name, synonym or id
        feature: String,
        /// Team member
        #[arg(long)]
        member: String,
        /// Hours spent
        #[arg(long)]
        hours: f64,
        /// Day of the work (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Import a JSON or CSV export
    Import {
        /// File to import
        path: PathBuf,
        /// json or csv (defaults to the file extension)
        #[arg(long)]
        format: Option<String>,
    },
    /// List tracked time
    List {
        /// Only this feature
        #[arg(long)]
        feature: Option<String>,
        /// Only this member
        #[arg(long)]
        member: Option<String>,
        /// On or after this date
        #[arg(long)]
        since: Option<NaiveDate>,
        /// On or before this date
        #[arg(long)]
        until: Option<NaiveDate>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum EstimateCommand {
    /// Estimate a set of features, a BRD, or the whole library
    Project {
        /// Comma-separated feature names
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,
        /// Requirements document to match against the library
        #[arg(long)]
        brd: Option<PathBuf>,
        /// mean, median or p80 (defaults to the configured style)
        #[arg(long)]
        style: Option<EstimationStyle>,
        /// Add a days column using the configured hours per day
        #[arg(long)]
        days: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Estimate a single feature
    Feature {
        /// Feature name, synonym or id
        feature: String,
        /// mean, median or p80
        #[arg(long)]
        style: Option<EstimationStyle>,
        /// Add a days column using the configured hours per day
        #[arg(long)]
        days: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Compare seed estimates with tracked actuals
    Reconcile {
        /// Replace inaccurate seeds with their observed median
        #[arg(long)]
        apply: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show every setting
    Show {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Change one setting
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
    /// Restore defaults
    Reset,
}

#[derive(Subcommand)]
enum QualityCommand {
    /// Report duplicates, anomalies and orphaned entries
    Check {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Hours by feature, team and member
    Summary {
        /// Draw bar charts instead of tables
        #[arg(long)]
        chart: bool,
        /// Chart width in characters
        #[arg(long, default_value = "40")]
        width: usize,
        /// Add a days column using the configured hours per day
        #[arg(long)]
        days: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// List templates
    List,
    /// Show a template's features
    Show {
        /// Template name
        name: String,
    },
    /// Add a template's features to the library
    Apply {
        /// Template name
        name: String,
    },
}

#[derive(Subcommand)]
enum ScenarioCommand {
    /// Create a scenario
    Create {
        /// Scenario name
        name: String,
        /// Features in the likely case (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        likely: Vec<String>,
        /// Features in the best case (defaults to likely)
        #[arg(long, value_delimiter = ',')]
        best: Vec<String>,
        /// Features in the worst case (defaults to likely)
        #[arg(long, value_delimiter = ',')]
        worst: Vec<String>,
        /// Description
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List scenarios
    List,
    /// Show a scenario's features
    Show {
        /// Scenario name or id
        name: String,
    },
    /// Estimate all three cases
    Compare {
        /// Scenario name or id
        name: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Remove a scenario
    Remove {
        /// Scenario name or id
        name: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let storage = JsonStorage::new(&cli.data_dir)
        .await
        .with_context(|| format!("cannot open data directory {}", cli.data_dir.display()))?;
    let storage = Arc::new(storage);
    debug!(root = %storage.root().display(), "storage opened");

    match cli.command {
        Commands::Feature(cmd) => feature(storage, cmd).await,
        Commands::Tracked(cmd) => tracked(storage, cmd).await,
        Commands::Estimate(cmd) => estimate(storage, cmd).await,
        Commands::Config(cmd) => config(storage, cmd).await,
        Commands::Quality(QualityCommand::Check { format }) => {
            let quality = TimeTrackingService::new(storage.clone()).quality_report().await?;
            let features = storage.load_features().await?;
            print_output(format, &quality, || report::quality_table(&quality, &features))
        }
        Commands::Report(ReportCommand::Summary { chart, width, days, format }) => {
            let per_day = hours_per_day(&storage, days).await?;
            let summary = ReportService::new(storage).summary().await?;
            if chart && format == OutputFormat::Table {
                for (title, rows) in [
                    ("By feature", &summary.by_feature),
                    ("By team", &summary.by_team),
                    ("By member", &summary.by_member),
                ] {
                    println!("{}", title);
                    println!("{}", report::bar_chart(rows, width));
                }
                return Ok(());
            }
            print_output(format, &summary, || report::summary_table(&summary, per_day))
        }
        Commands::Template(cmd) => template(storage, cmd).await,
        Commands::Scenario(cmd) => scenario(storage, cmd).await,
    }
}

async fn feature(storage: Arc<JsonStorage>, cmd: FeatureCommand) -> Result<()> {
    let library = FeatureLibrary::new(storage.clone());

    match cmd {
        FeatureCommand::Add { name, team, process, seed, synonyms, notes } => {
            let mut input = NewFeature::new(name, team, process, seed);
            input.synonyms = synonyms;
            input.notes = notes;
            let feature = library.add(input).await?;
            println!("Added feature: {} - {}", feature.id, feature.name);
        }
        FeatureCommand::List { team, process, format } => {
            let features = library.list(&FeatureFilter { team, process }).await?;
            print_output(format, &features, || report::feature_table(&features))?;
        }
        FeatureCommand::Show { feature } => {
            let feature = library.find(&feature).await?;
            let estimate = EstimationService::new(storage)
                .estimate_one(&feature.id.to_string(), None)
                .await?;

            println!("Feature: {}", feature.name);
            println!("  Id: {}", feature.id);
            println!("  Team: {}", feature.team);
            println!("  Process: {}", feature.process);
            println!("  Seed: {:.1} h", feature.seed_hours);
            if !feature.synonyms.is_empty() {
                println!("  Synonyms: {}", feature.synonyms.join(", "));
            }
            if let Some(notes) = &feature.notes {
                println!("  Notes: {}", notes);
            }
            println!(
                "  Estimate: {:.1} h ({:.1} - {:.1}), {} confidence from {} samples",
                estimate.hours,
                estimate.low,
                estimate.high,
                estimate.confidence,
                estimate.sample_count
            );
        }
        FeatureCommand::Update { feature, name, team, process, seed, notes, synonyms } => {
            let id = library.find(&feature).await?.id;
            let updated = library
                .update(id, FeatureUpdate {
                    name,
                    team,
                    process,
                    seed_hours: seed,
                    notes,
                    add_synonyms: synonyms,
                })
                .await?;
            println!("Updated feature: {} - {}", updated.id, updated.name);
        }
        FeatureCommand::Remove { feature } => {
            let id = library.find(&feature).await?.id;
            let removed = library.remove(id).await?;
            println!("Removed feature: {}", removed.name);
        }
        FeatureCommand::Search { query, limit } => {
            let found = library.search(&query, limit).await?;
            if found.is_empty() {
                println!("No features match '{}'", query);
            } else {
                println!("{}", report::feature_table(&found));
            }
        }
    }
    Ok(())
}

async fn tracked(storage: Arc<JsonStorage>, cmd: TrackedCommand) -> Result<()> {
    let tracking = TimeTrackingService::new(storage.clone());

    match cmd {
        TrackedCommand::Add { feature, member, hours, date, notes } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let entry = tracking.record(&feature, &member, date, hours, notes).await?;
            println!("Recorded {:.1} h for {} on {}", entry.hours, entry.member, entry.date);
        }
        TrackedCommand::Import { path, format } => {
            let format = format.map(|f| f.parse::<ImportFormat>()).transpose()?;
            let summary = tracking.import(&path, format).await?;
            println!("Imported {} entries ({:.1} h)", summary.imported, summary.total_hours);
            if !summary.quality.is_clean() {
                println!(
                    "Quality: {} duplicate entries, {} anomalies, {} orphans (run `aitea quality check`)",
                    summary.quality.duplicate_entry_count(),
                    summary.quality.anomalies.len(),
                    summary.quality.orphans.len()
                );
            }
        }
        TrackedCommand::List { feature, member, since, until, format } => {
            let feature_id = match feature {
                Some(name) => Some(FeatureLibrary::new(storage.clone()).find(&name).await?.id),
                None => None,
            };
            let filter = EntryFilter { feature_id, member, since, until };
            let entries = tracking.list(&filter).await?;
            let features = storage.load_features().await?;
            print_output(format, &entries, || report::entries_table(&entries, &features))?;
        }
    }
    Ok(())
}

/// The configured hours per day when `days` output was requested.
async fn hours_per_day(storage: &JsonStorage, days: bool) -> Result<Option<f64>> {
    if !days {
        return Ok(None);
    }
    Ok(Some(storage.load_config().await?.hours_per_day))
}

async fn estimate(storage: Arc<JsonStorage>, cmd: EstimateCommand) -> Result<()> {
    let estimation = EstimationService::new(storage.clone());

    match cmd {
        EstimateCommand::Project { mut features, brd, style, days, format } => {
            if let Some(path) = brd {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("cannot read {}", path.display()))?;
                let library = storage.load_features().await?;
                let matches = match_brd(&text, &library);
                if matches.is_empty() {
                    bail!("no library features are mentioned in {}", path.display());
                }
                info!(count = matches.len(), brd = %path.display(), "features matched");
                features.extend(matches.iter().map(|m| m.feature.id.to_string()));
            }

            let per_day = hours_per_day(&storage, days).await?;
            let project = if features.is_empty() {
                estimation.estimate_all(style).await?
            } else {
                estimation.estimate_names(&features, style).await?
            };

            match format {
                OutputFormat::Csv => print!("{}", report::estimate_csv(&project)),
                _ => print_output(format, &project, || report::estimate_table(&project, per_day))?,
            }
            if format == OutputFormat::Table && project.seed_only_count() > 0 {
                println!(
                    "{} of {} features have too little history and use their seed estimate",
                    project.seed_only_count(),
                    project.features.len()
                );
            }
        }
        EstimateCommand::Feature { feature, style, days, format } => {
            let per_day = hours_per_day(&storage, days).await?;
            let project = estimation.estimate_names(&[feature], style).await?;
            match format {
                OutputFormat::Csv => print!("{}", report::estimate_csv(&project)),
                _ => print_output(format, &project.features, || report::estimate_table(&project, per_day))?,
            }
        }
        EstimateCommand::Reconcile { apply, format } => {
            let reconciler = SeedReconciler::new(storage);
            let rows = if apply {
                reconciler.apply().await?
            } else {
                reconciler.reconcile().await?
            };
            print_output(format, &rows, || report::reconciliation_table(&rows))?;
            if apply && format == OutputFormat::Table {
                println!("Updated {} seed estimates", rows.len());
            }
        }
    }
    Ok(())
}

async fn config(storage: Arc<JsonStorage>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { format } => {
            let config = storage.load_config().await?;
            print_output(format, &config, || {
                AppConfig::KEYS
                    .iter()
                    .map(|key| format!("{} = {}", key, config.get(key).unwrap_or_default()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        ConfigCommand::Set { key, value } => {
            let current = storage
                .update_config(|config| {
                    config.set(&key, &value)?;
                    Ok::<_, anyhow::Error>(config.get(&key)?)
                })
                .await?;
            println!("{} = {}", key, current);
        }
        ConfigCommand::Reset => {
            storage.save_config(&AppConfig::default()).await?;
            println!("Configuration reset to defaults");
        }
    }
    Ok(())
}

async fn template(storage: Arc<JsonStorage>, cmd: TemplateCommand) -> Result<()> {
    let registry = TemplateRegistry::builtin();

    match cmd {
        TemplateCommand::List => {
            for t in registry.list() {
                println!(
                    "  {} | {} features | {:.0} h | {}",
                    t.name,
                    t.features.len(),
                    t.total_seed_hours(),
                    t.description
                );
            }
        }
        TemplateCommand::Show { name } => {
            let t = registry.get(&name).ok_or_else(|| anyhow!("unknown template '{}'", name))?;
            println!("Template: {}", t.name);
            println!("  {}", t.description);
            for f in &t.features {
                println!("  {} | {} | {} | {:.1} h", f.name, f.team, f.process, f.seed_hours);
            }
        }
        TemplateCommand::Apply { name } => {
            let t = registry.get(&name).ok_or_else(|| anyhow!("unknown template '{}'", name))?;
            let result = FeatureLibrary::new(storage).apply_template(t).await?;
            println!("Added {} features from {}", result.added.len(), t.name);
            if !result.skipped.is_empty() {
                println!("Skipped existing: {}", result.skipped.join(", "));
            }
        }
    }
    Ok(())
}

async fn scenario(storage: Arc<JsonStorage>, cmd: ScenarioCommand) -> Result<()> {
    let scenarios = ScenarioService::new(storage.clone());

    match cmd {
        ScenarioCommand::Create { name, likely, best, worst, description } => {
            let scenario = scenarios
                .create(NewScenario { name, description, best, likely, worst })
                .await?;
            println!("Created scenario: {} - {}", scenario.id, scenario.name);
        }
        ScenarioCommand::List => {
            for s in scenarios.list().await? {
                println!(
                    "  {} | best {} | likely {} | worst {} | {}",
                    s.name,
                    s.best.len(),
                    s.likely.len(),
                    s.worst.len(),
                    s.description
                );
            }
        }
        ScenarioCommand::Show { name } => {
            let s = scenarios.get(&name).await?;
            let features = storage.load_features().await?;
            let label = |id: &aitea_core::FeatureId| {
                features
                    .iter()
                    .find(|f| f.id == *id)
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| report::UNKNOWN_LABEL.to_string())
            };

            println!("Scenario: {}", s.name);
            if !s.description.is_empty() {
                println!("  {}", s.description);
            }
            for case in aitea_core::ScenarioCase::ALL {
                let names: Vec<_> = s.case(case).iter().map(label).collect();
                println!("  {}: {}", case.as_str(), names.join(", "));
            }
        }
        ScenarioCommand::Compare { name, format } => {
            let comparison = scenarios.compare(&name).await?;
            print_output(format, &comparison, || report::scenario_table(&comparison))?;
        }
        ScenarioCommand::Remove { name } => {
            let removed = scenarios.remove(&name).await?;
            println!("Removed scenario: {}", removed.name);
        }
    }
    Ok(())
}

fn print_output<T, F>(format: OutputFormat, value: &T, table: F) -> Result<()>
where
    T: serde::Serialize + ?Sized,
    F: FnOnce() -> String,
{
    match format {
        OutputFormat::Table => println!("{}", table().trim_end()),
        OutputFormat::Json => println!("{}", report::to_json(value)?),
        OutputFormat::Csv => bail!("CSV output is only available for estimates"),
    }
    Ok(())
}
