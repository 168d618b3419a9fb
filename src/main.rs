use clap::{Parser, Subcommand};
use lifeschema::ast::SchemaModel;
use lifeschema::config::DbConfig;
use lifeschema::db::PostgresBackend;
use lifeschema::error::{read_file, Error, Result};
use lifeschema::load::{apply_schema, Dataset, LoadPlan, LoadReport, Loader};
use lifeschema::{ddl, parser, report};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const BUNDLED_PLAN: &str = include_str!("../schemas/platform-load.yaml");

#[derive(Parser)]
#[command(name = "lifeschema", version, about = "Compile schema descriptions to Postgres DDL and load datasets")]
struct Cli {
    /// Postgres connection string [default: $NETLIFY_DATABASE_URL, then $DATABASE_URL]
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the DDL script for a schema description
    Ddl {
        schema: PathBuf,
        /// Prefix the script with drop statements
        #[arg(long)]
        drop: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summarize a schema description and report dangling references
    Check { schema: PathBuf },
    /// Apply a schema description to the database
    Migrate {
        schema: PathBuf,
        /// Drop existing tables and types first
        #[arg(long)]
        reset: bool,
        /// Stop at the first statement that fails for a reason other than
        /// the object already existing
        #[arg(long)]
        strict: bool,
    },
    /// Reset the schema and load a JSON dataset
    Load {
        schema: PathBuf,
        dataset: PathBuf,
        /// Load plan (YAML); the bundled platform plan when omitted
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Load into the existing schema without dropping or creating anything
        #[arg(long)]
        skip_schema: bool,
        #[arg(long)]
        strict: bool,
    },
}

fn run_cmd(result: Result<()>) {
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn read_model(path: &Path) -> Result<SchemaModel> {
    let model = parser::parse_schema(&read_file(path)?);
    info!(
        tables = model.tables.len(),
        enums = model.enums.len(),
        relationships = model.relationships.len(),
        "parsed {}",
        path.display()
    );
    Ok(model)
}

fn warn_issues(model: &SchemaModel) {
    for issue in model.validate() {
        warn!("{}", issue);
    }
}

fn write_ddl(schema: &Path, drop: bool, output: Option<&Path>) -> Result<()> {
    let model = read_model(schema)?;
    warn_issues(&model);

    let mut statements = Vec::new();
    if drop {
        statements.extend(ddl::drop_statements(&model));
    }
    statements.extend(ddl::generate(&model));
    let script = ddl::to_script(&statements);

    match output {
        Some(path) => std::fs::write(path, &script).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            print!("{}", script);
            Ok(())
        }
    }
}

/// Returns whether the model is free of issues.
fn check(schema: &Path) -> Result<bool> {
    let model = read_model(schema)?;
    print!("{}", report::summarize(&model));

    let issues = model.validate();
    for issue in &issues {
        println!("issue: {}", issue);
    }
    Ok(issues.is_empty())
}

async fn apply(backend: &mut PostgresBackend, model: &SchemaModel, reset: bool, strict: bool) -> Result<()> {
    if reset {
        info!("dropping existing schema");
        apply_schema(backend, &ddl::drop_statements(model), strict).await?;
    }
    apply_schema(backend, &ddl::generate(model), strict).await?;
    Ok(())
}

async fn migrate(schema: &Path, reset: bool, strict: bool, url: Option<&str>) -> Result<()> {
    let model = read_model(schema)?;
    warn_issues(&model);

    let config = DbConfig::resolve(url)?;
    let mut backend = PostgresBackend::connect(&config.url).await?;
    apply(&mut backend, &model, reset, strict).await
}

fn print_load_report(report: &LoadReport) {
    for t in &report.tables {
        println!(
            "{}: {} inserted, {} orphaned, {} defaulted, {} failed",
            t.table, t.inserted, t.orphaned, t.defaulted, t.failed
        );
    }
}

async fn load(
    schema: &Path,
    dataset: &Path,
    plan: Option<&Path>,
    skip_schema: bool,
    strict: bool,
    url: Option<&str>,
) -> Result<()> {
    let model = read_model(schema)?;
    warn_issues(&model);

    let dataset = Dataset::from_json(&read_file(dataset)?)?;
    let plan = match plan {
        Some(path) => LoadPlan::from_file(path)?,
        None => LoadPlan::from_yaml(BUNDLED_PLAN)?,
    };

    let config = DbConfig::resolve(url)?;
    let mut backend = PostgresBackend::connect(&config.url).await?;

    if !skip_schema {
        apply(&mut backend, &model, true, strict).await?;
    }

    let report = Loader::new(&mut backend, &plan)
        .with_model(&model)
        .load(&dataset)
        .await;
    print_load_report(&report);
    Ok(())
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .init();

    let cli = Cli::parse();
    let url = cli.database_url.as_deref();

    match cli.command {
        Cmd::Ddl {
            schema,
            drop,
            output,
        } => run_cmd(write_ddl(&schema, drop, output.as_deref())),
        Cmd::Check { schema } => match check(&schema) {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => run_cmd(Err(e)),
        },
        Cmd::Migrate {
            schema,
            reset,
            strict,
        } => run_cmd(migrate(&schema, reset, strict, url).await),
        Cmd::Load {
            schema,
            dataset,
            plan,
            skip_schema,
            strict,
        } => run_cmd(load(&schema, &dataset, plan.as_deref(), skip_schema, strict, url).await),
    }
}
