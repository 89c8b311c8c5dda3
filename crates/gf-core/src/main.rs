//! gridfit core - outcome prediction with uncertainty
//!
//! The main entry point for gf-core, handling:
//! - Snapshot loading and validation
//! - Prediction with bootstrap intervals and extrapolation warnings
//! - Similarity search, circuit fit and budget allocation
//! - Offline model fitting and cross-validation

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gf_common::{Error, OutputFormat, Result, StructuredError, SCHEMA_VERSION};
use gf_config::{
    list_presets, load_config, ConfigOptions, IntervalKind, LoadedConfig, PresetName,
};
use gf_core::calibrate::{fit_model, DEFAULT_FOLDS};
use gf_core::exit_codes::ExitCode;
use gf_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use gf_core::schema::{available_schemas, generate_all_schemas, generate_schema};
use gf_core::{
    log_event, validate_budget, BootstrapOptions, CancellationToken, Engine, PredictionResult,
    QueryVector, SnapshotArtifact, TrainingCorpus,
};
use serde::Serialize;

/// gridfit core - skill-factor outcome prediction with calibrated uncertainty
#[derive(Parser)]
#[command(name = "gf-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to engine.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Built-in configuration preset (default, quick, rigorous)
    #[arg(long, global = true)]
    preset: Option<String>,

    /// Snapshot artifact (corpus, model, circuit profiles)
    #[arg(long, global = true, env = "GRIDFIT_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the outcome for a profile, with interval and confidence tier
    Predict(PredictArgs),

    /// Find the corpus members most similar to a profile
    Similar(SimilarArgs),

    /// Score how well a profile fits one or more venues
    Fit(FitArgs),

    /// Distribute improvement points across factors
    Allocate(AllocateArgs),

    /// Refit the model on the snapshot corpus and cross-validate it
    Calibrate(CalibrateArgs),

    /// Describe the loaded snapshot
    Status,

    /// Validate configuration and snapshot
    Check,

    /// Configuration management
    Config(ConfigArgs),

    /// Print JSON schemas for inputs and outputs
    Schema(SchemaArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Predict(_) => "predict",
            Commands::Similar(_) => "similar",
            Commands::Fit(_) => "fit",
            Commands::Allocate(_) => "allocate",
            Commands::Calibrate(_) => "calibrate",
            Commands::Status => "status",
            Commands::Check => "check",
            Commands::Config(_) => "config",
            Commands::Schema(_) => "schema",
        }
    }
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Normalized scores 0-100 as speed,consistency,racecraft,tire_management
    #[arg(long, allow_hyphen_values = true)]
    scores: String,
}

#[derive(Args, Debug)]
struct BootstrapArgs {
    /// Seed for reproducible intervals
    #[arg(long)]
    seed: Option<u64>,

    /// Bootstrap iterations (overrides config)
    #[arg(long)]
    iterations: Option<usize>,

    /// Confidence level in (0, 1) (overrides config)
    #[arg(long)]
    confidence: Option<f64>,

    /// Interval kind: confidence or prediction (overrides config)
    #[arg(long)]
    interval: Option<IntervalKind>,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[command(flatten)]
    query: ScoreArgs,

    #[command(flatten)]
    bootstrap: BootstrapArgs,
}

#[derive(Args, Debug)]
struct SimilarArgs {
    #[command(flatten)]
    query: ScoreArgs,

    /// Number of matches (defaults to config)
    #[arg(long, allow_hyphen_values = true)]
    top: Option<i64>,
}

#[derive(Args, Debug)]
struct FitArgs {
    #[command(flatten)]
    query: ScoreArgs,

    /// Venue to score (repeatable; all registered venues when omitted)
    #[arg(long = "venue")]
    venues: Vec<String>,
}

#[derive(Args, Debug)]
struct AllocateArgs {
    #[command(flatten)]
    query: ScoreArgs,

    /// Improvement points to distribute (0-400)
    #[arg(long, allow_hyphen_values = true)]
    budget: i64,

    /// Also predict before and after applying the plan
    #[arg(long)]
    what_if: bool,

    #[command(flatten)]
    bootstrap: BootstrapArgs,
}

#[derive(Args, Debug)]
struct CalibrateArgs {
    /// Cross-validation folds
    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    folds: usize,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,
    /// List built-in presets
    Presets,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Type name (see --list)
    name: Option<String>,

    /// List available schema types
    #[arg(long)]
    list: bool,

    /// Print every schema
    #[arg(long)]
    all: bool,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else if cli.global.verbose > 0 {
        Some(LogLevel::Warn.more_verbose(cli.global.verbose))
    } else {
        None
    };
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let ctx = LogContext::new(generate_run_id());
    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_STARTED,
        Stage::Init,
        "gf-core started",
        command = cli.command.name()
    );

    let exit_code = match run(&cli, &ctx) {
        Ok(code) => code,
        Err(e) => output_error(&cli.global, &ctx, &e),
    };

    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_FINISHED,
        Stage::Report,
        "gf-core finished",
        exit_code = exit_code.as_i32()
    );
    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli, ctx: &LogContext) -> Result<ExitCode> {
    let global = &cli.global;
    match &cli.command {
        Commands::Predict(args) => run_predict(global, ctx, args),
        Commands::Similar(args) => run_similar(global, ctx, args),
        Commands::Fit(args) => run_fit(global, ctx, args),
        Commands::Allocate(args) => run_allocate(global, ctx, args),
        Commands::Calibrate(args) => run_calibrate(global, ctx, args),
        Commands::Status => run_status(global, ctx),
        Commands::Check => run_check(global, ctx),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(global, ctx),
            ConfigCommands::Presets => run_config_presets(global),
        },
        Commands::Schema(args) => run_schema(args),
    }
}

// ============================================================================
// Loading
// ============================================================================

fn load_engine_config(global: &GlobalOpts, ctx: &LogContext) -> Result<LoadedConfig> {
    let preset = match &global.preset {
        Some(name) => Some(PresetName::parse(name).ok_or_else(|| {
            Error::invalid_input(
                "preset",
                format!(
                    "unknown preset {:?}; available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )
        })?),
        None => None,
    };
    let options = ConfigOptions {
        path: global.config.clone(),
        preset,
    };
    match load_config(&options) {
        Ok(loaded) => {
            log_event!(
                ctx,
                DEBUG,
                event_names::CONFIG_LOADED,
                Stage::Init,
                "configuration loaded",
                source = loaded.snapshot.source.as_str(),
                config_id = loaded.snapshot.short_id()
            );
            Ok(loaded)
        }
        Err(e) => {
            log_event!(
                ctx,
                WARN,
                event_names::CONFIG_ERROR,
                Stage::Init,
                "configuration rejected",
                code = e.code()
            );
            Err(Error::Config(e.to_string()))
        }
    }
}

fn snapshot_path(global: &GlobalOpts) -> Result<&PathBuf> {
    global.snapshot.as_ref().ok_or_else(|| {
        Error::invalid_input(
            "snapshot",
            "no snapshot artifact given; pass --snapshot or set GRIDFIT_SNAPSHOT",
        )
    })
}

fn load_artifact(global: &GlobalOpts) -> Result<SnapshotArtifact> {
    SnapshotArtifact::from_file(snapshot_path(global)?)
}

/// Build the engine and publish the snapshot named on the command line.
fn load_engine(global: &GlobalOpts, ctx: &LogContext) -> Result<(Engine, LogContext)> {
    let loaded = load_engine_config(global, ctx)?;
    let engine = Engine::new(loaded.config)?;
    let version = engine.publish(load_artifact(global)?)?;
    let ctx = ctx.clone().with_snapshot_version(version.as_str());
    let path = snapshot_path(global)?.display().to_string();
    log_event!(
        ctx,
        INFO,
        event_names::SNAPSHOT_LOADED,
        Stage::Load,
        "snapshot loaded",
        path = path.as_str()
    );
    Ok((engine, ctx))
}

fn parse_scores(raw: &str) -> Result<QueryVector> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(Error::invalid_input(
            "scores",
            format!("expected 4 comma-separated values, got {}", parts.len()),
        ));
    }
    let mut values = [0.0; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| Error::invalid_input("scores", format!("not a number: {:?}", part)))?;
    }
    QueryVector::from_array(values)
}

fn bootstrap_options(engine: &Engine, args: &BootstrapArgs) -> BootstrapOptions {
    let mut options = engine.default_options();
    if let Some(iterations) = args.iterations {
        options = options.with_iterations(iterations);
    }
    if let Some(confidence) = args.confidence {
        options = options.with_confidence(confidence);
    }
    if let Some(interval) = args.interval {
        options = options.with_interval(interval);
    }
    if let Some(seed) = args.seed {
        options = options.with_seed(seed);
    }
    options
}

// ============================================================================
// Output
// ============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn prediction_exit_code(result: &PredictionResult) -> ExitCode {
    if result.is_extrapolating {
        ExitCode::OkWithWarning
    } else {
        ExitCode::Ok
    }
}

fn prediction_summary(r: &PredictionResult) -> String {
    let mut line = format!(
        "{:.3} [{:.3}, {:.3}] {:.0}% {} tier={} severity={:.2}",
        r.point_estimate,
        r.lower,
        r.upper,
        r.confidence * 100.0,
        match r.interval {
            IntervalKind::Confidence => "CI",
            IntervalKind::Prediction => "PI",
        },
        r.tier,
        r.severity
    );
    if let Some(warning) = &r.warning_message {
        line.push_str(&format!(" WARNING: {}", warning));
    }
    line
}

fn output_error(global: &GlobalOpts, ctx: &LogContext, error: &Error) -> ExitCode {
    let exit_code = ExitCode::from_error(error);
    if exit_code.is_internal_error() {
        let message = error.to_string();
        log_event!(
            ctx,
            ERROR,
            event_names::INTERNAL_ERROR,
            Stage::Report,
            "internal error",
            error = message.as_str()
        );
    }

    match global.format {
        OutputFormat::Json => {
            let structured = StructuredError::from(error)
                .with_context("exit_code", exit_code.code_name())
                .with_context("run_id", &ctx.run_id);
            eprintln!("{}", structured.to_json_pretty());
        }
        OutputFormat::Summary => {
            eprintln!("[{}] {}: {}", ctx.run_id, error.headline(), error);
            eprintln!("  {}", error.remediation());
        }
    }
    exit_code
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_predict(global: &GlobalOpts, ctx: &LogContext, args: &PredictArgs) -> Result<ExitCode> {
    let query = parse_scores(&args.query.scores)?;
    let (engine, _ctx) = load_engine(global, ctx)?;
    let options = bootstrap_options(&engine, &args.bootstrap);
    let result = engine.predict(&query, &options, &CancellationToken::new())?;

    match global.format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Summary => println!(
            "[{}] predict: {}",
            result.snapshot_version,
            prediction_summary(&result.data)
        ),
    }
    Ok(prediction_exit_code(&result.data))
}

fn run_similar(global: &GlobalOpts, ctx: &LogContext, args: &SimilarArgs) -> Result<ExitCode> {
    let query = parse_scores(&args.query.scores)?;
    let top_n = match args.top {
        Some(top) if top <= 0 => {
            return Err(Error::invalid_input(
                "top",
                format!("must be at least 1, got {}", top),
            ))
        }
        Some(top) => Some(usize::try_from(top).unwrap_or(usize::MAX)),
        None => None,
    };
    let (engine, _ctx) = load_engine(global, ctx)?;
    let matches = engine.find_similar(&query, top_n)?;

    match global.format {
        OutputFormat::Json => print_json(&matches)?,
        OutputFormat::Summary => {
            for m in &matches.data {
                println!(
                    "{:>2}. {} similarity={:.3} distance={:.3} outcome={:.3}",
                    m.rank, m.competitor, m.similarity, m.distance, m.known_outcome
                );
            }
        }
    }
    Ok(ExitCode::Ok)
}

fn run_fit(global: &GlobalOpts, ctx: &LogContext, args: &FitArgs) -> Result<ExitCode> {
    let query = parse_scores(&args.query.scores)?;
    let (engine, _ctx) = load_engine(global, ctx)?;
    let scores = if args.venues.is_empty() {
        engine.circuit_fit_all(&query)?
    } else {
        let mut scores = Vec::with_capacity(args.venues.len());
        let mut version = None;
        for venue in &args.venues {
            let score = engine.circuit_fit(&query, venue)?;
            version = Some(score.snapshot_version);
            scores.push(score.data);
        }
        match version {
            Some(v) => gf_core::Versioned::new(&v, scores),
            None => engine.circuit_fit_all(&query)?,
        }
    };

    match global.format {
        OutputFormat::Json => print_json(&scores)?,
        OutputFormat::Summary => {
            for s in &scores.data {
                let flag = if s.saturated { " (saturated)" } else { "" };
                println!("{}: {:.1}{}", s.venue, s.fit_score, flag);
            }
        }
    }
    Ok(ExitCode::Ok)
}

fn run_allocate(global: &GlobalOpts, ctx: &LogContext, args: &AllocateArgs) -> Result<ExitCode> {
    let query = parse_scores(&args.query.scores)?;
    let budget = validate_budget(args.budget)?;
    let (engine, _ctx) = load_engine(global, ctx)?;

    if !args.what_if {
        let plan = engine.allocate(&query, budget)?;
        match global.format {
            OutputFormat::Json => print_json(&plan)?,
            OutputFormat::Summary => {
                let parts: Vec<String> = plan
                    .data
                    .points
                    .iter()
                    .map(|(f, p)| format!("{}={}", f, p))
                    .collect();
                println!("[{}] allocate {}: {}", plan.snapshot_version, budget, parts.join(" "));
            }
        }
        return Ok(ExitCode::Ok);
    }

    let options = bootstrap_options(&engine, &args.bootstrap);
    let result = engine.what_if(&query, budget, &options, &CancellationToken::new())?;
    match global.format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Summary => {
            println!("baseline: {}", prediction_summary(&result.data.baseline));
            println!("adjusted: {}", prediction_summary(&result.data.adjusted));
            println!("delta:    {:+.3}", result.data.delta);
        }
    }
    let warned = result.data.baseline.is_extrapolating || result.data.adjusted.is_extrapolating;
    Ok(if warned { ExitCode::OkWithWarning } else { ExitCode::Ok })
}

fn run_calibrate(global: &GlobalOpts, ctx: &LogContext, args: &CalibrateArgs) -> Result<ExitCode> {
    let artifact = load_artifact(global)?;
    let corpus = TrainingCorpus::from_document(artifact.corpus)?;
    let ctx = ctx.clone().with_snapshot_version(corpus.version().as_str());
    let report = fit_model(&corpus, args.folds)?;
    log_event!(
        ctx,
        INFO,
        event_names::CALIBRATE_FINISHED,
        Stage::Calibrate,
        "calibration finished",
        folds = args.folds,
        cv_rmse = report.cross_validation.rmse
    );

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "snapshot_version": corpus.version(),
            "data": report,
        }))?,
        OutputFormat::Summary => {
            let c = &report.model.coefficients;
            println!(
                "[{}] intercept={:.4} speed={:.4} consistency={:.4} racecraft={:.4} tire_management={:.4}",
                corpus.version(),
                report.model.intercept,
                c.speed,
                c.consistency,
                c.racecraft,
                c.tire_management
            );
            println!(
                "in-sample rmse={:.4} cv rmse={:.4} ({} folds)",
                report.in_sample_rmse, report.cross_validation.rmse, args.folds
            );
        }
    }
    Ok(ExitCode::Ok)
}

fn run_status(global: &GlobalOpts, ctx: &LogContext) -> Result<ExitCode> {
    let (engine, _ctx) = load_engine(global, ctx)?;
    let status = engine.status()?;
    match global.format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Summary => {
            let s = &status.data;
            println!(
                "[{}] corpus={} statistics={} model={} venues={}",
                status.snapshot_version,
                s.corpus_size,
                if s.statistics_available { "ok" } else { "insufficient" },
                if s.model.matches_corpus { "ok" } else { "unavailable" },
                s.venues.join(",")
            );
        }
    }
    Ok(ExitCode::Ok)
}

fn run_check(global: &GlobalOpts, ctx: &LogContext) -> Result<ExitCode> {
    let mut checks: Vec<serde_json::Value> = Vec::new();
    let mut all_ok = true;

    let config = match load_engine_config(global, ctx) {
        Ok(loaded) => {
            checks.push(serde_json::json!({
                "check": "config",
                "status": "ok",
                "source": loaded.snapshot.source,
                "path": loaded.snapshot.path,
                "hash": loaded.snapshot.config_hash,
            }));
            Some(loaded.config)
        }
        Err(e) => {
            all_ok = false;
            checks.push(serde_json::json!({ "check": "config", "status": "error", "error": e.to_string() }));
            None
        }
    };

    if let Some(config) = config {
        let snapshot_check = match Engine::new(config) {
            Ok(engine) => match load_artifact(global).and_then(|a| engine.publish(a)) {
                Ok(_) => {
                    let status = engine.status()?.data;
                    let usable = status.statistics_available && status.model.matches_corpus;
                    all_ok &= usable;
                    serde_json::json!({
                        "check": "snapshot",
                        "status": if usable { "ok" } else { "degraded" },
                        "version": engine.store().current_version(),
                        "corpus_size": status.corpus_size,
                        "statistics_available": status.statistics_available,
                        "model_matches_corpus": status.model.matches_corpus,
                    })
                }
                Err(e) => {
                    all_ok = false;
                    serde_json::json!({ "check": "snapshot", "status": "error", "error": e.to_string() })
                }
            },
            Err(e) => {
                all_ok = false;
                serde_json::json!({ "check": "engine", "status": "error", "error": e.to_string() })
            }
        };
        checks.push(snapshot_check);
    }

    let response = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "run_id": ctx.run_id,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "status": if all_ok { "ok" } else { "error" },
        "checks": checks,
    });

    match global.format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Summary => {
            for check in &checks {
                let name = check.get("check").and_then(|v| v.as_str()).unwrap_or("?");
                let status = check.get("status").and_then(|v| v.as_str()).unwrap_or("?");
                println!("{}: {}", name, status);
                if let Some(error) = check.get("error").and_then(|v| v.as_str()) {
                    println!("  Error: {}", error);
                }
            }
        }
    }

    Ok(if all_ok { ExitCode::Ok } else { ExitCode::SnapshotError })
}

fn run_config_show(global: &GlobalOpts, ctx: &LogContext) -> Result<ExitCode> {
    let loaded = load_engine_config(global, ctx)?;
    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "source": loaded.snapshot,
            "config": loaded.config,
        }))?,
        OutputFormat::Summary => {
            let s = &loaded.snapshot;
            println!(
                "[{}] source={} iterations={} confidence={} thresholds={}/{}",
                s.short_id(),
                s.source,
                s.summary.iterations,
                s.summary.confidence,
                s.summary.moderate_threshold,
                s.summary.severe_threshold
            );
        }
    }
    Ok(ExitCode::Ok)
}

fn run_config_presets(global: &GlobalOpts) -> Result<ExitCode> {
    let presets = list_presets();
    match global.format {
        OutputFormat::Json => print_json(&presets)?,
        OutputFormat::Summary => {
            for p in &presets {
                println!("{:<10} {}", p.name.as_str(), p.description);
            }
        }
    }
    Ok(ExitCode::Ok)
}

fn run_schema(args: &SchemaArgs) -> Result<ExitCode> {
    if args.list {
        for (name, description) in available_schemas() {
            println!("{:<20} {}", name, description);
        }
        return Ok(ExitCode::Ok);
    }
    if args.all {
        print_json(&generate_all_schemas())?;
        return Ok(ExitCode::Ok);
    }
    let name = args
        .name
        .as_deref()
        .ok_or_else(|| Error::invalid_input("name", "give a schema type, --list or --all"))?;
    let schema = generate_schema(name).ok_or_else(|| {
        Error::invalid_input("name", format!("unknown schema type {:?}; see --list", name))
    })?;
    print_json(&schema)?;
    Ok(ExitCode::Ok)
}
