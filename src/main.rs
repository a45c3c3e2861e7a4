// Identity Resolver - CLI
//
//   identity-resolver resolve 47156273 juan perez
//   identity-resolver resolve 20-47156273-5 --json
//   identity-resolver candidates 47156273
//   identity-resolver import people.csv --db registry.db
//   identity-resolver batch ids.txt
//   identity-resolver history 47156273

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use identity_resolver::config::ENV_CONFIG_PATH;
use identity_resolver::providers::sqlite::count_people;
use identity_resolver::providers::{import_csv, setup_registry};
use identity_resolver::{
    candidates, AuditLog, Event, Outcome, PersonalNumber, ResolutionEngine, ResolveRequest,
    ResolverConfig, VERSION,
};

#[derive(Parser)]
#[command(name = "identity-resolver", version = VERSION)]
#[command(about = "Resolve a legal name and tax ID from a national ID number")]
struct Cli {
    /// Resolver config file (TOML)
    #[arg(long, global = true, env = ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one identifier, optionally filtered by name
    Resolve {
        /// Personal number (7-9 digits) or tax ID (11 digits)
        id: String,

        /// Name filter; several words are joined with spaces
        name: Vec<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the tax-ID candidates of a personal number
    Candidates { personal: String },

    /// Load a registry CSV (name,tax_id[,birth_date]) into SQLite
    Import {
        csv: PathBuf,

        #[arg(long)]
        db: PathBuf,
    },

    /// Resolve every line of a file: `<ID> [NAME...]`
    Batch {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Show the audit events recorded for an identifier, newest first
    History {
        id: String,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_resolver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Resolve { id, name, json } => {
            let config = ResolverConfig::load(cli.config.as_deref())?;
            run_resolve(&config, &id, &name.join(" "), json).await
        }
        Command::Candidates { personal } => run_candidates(&personal),
        Command::Import { csv, db } => run_import(&csv, &db),
        Command::Batch { file, json } => {
            let config = ResolverConfig::load(cli.config.as_deref())?;
            run_batch(&config, &file, json).await
        }
        Command::History { id, json } => {
            let config = ResolverConfig::load(cli.config.as_deref())?;
            run_history(&config, &id, json)
        }
    }
}

fn open_audit(config: &ResolverConfig) -> Result<Option<AuditLog>> {
    config.audit_db.as_deref().map(AuditLog::open).transpose()
}

async fn run_resolve(config: &ResolverConfig, id: &str, name: &str, json: bool) -> Result<()> {
    let engine = ResolutionEngine::from_config(config)?;
    let audit = open_audit(config)?;

    let name_filter = Some(name).filter(|n| !n.trim().is_empty());
    let outcome = engine.resolve(id, name_filter).await;

    if let Some(audit) = &audit {
        audit.record_resolution(id, name_filter, &outcome, "cli")?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(id, &outcome);
    }

    if outcome.is_error() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_outcome(id: &str, outcome: &Outcome) {
    println!("🔎 {}", id);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match outcome {
        Outcome::InvalidInput(reason) => println!("❌ Invalid identifier: {}", reason),
        Outcome::ProviderError { provider, reason } => {
            println!("❌ Every provider failed (last: {}): {}", provider, reason)
        }
        Outcome::NotFound => println!("∅  No record found"),
        Outcome::NoMatchBestEffort(_) | Outcome::NoMatchShowAll(_) => {
            println!("⚠️  Name filter matched nothing; records found under this ID:")
        }
        _ => println!("✅ {}", outcome.label()),
    }

    for record in outcome.records() {
        let birth = record
            .birth_date
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default();
        println!(
            "   {}  {:<40} {:>10}  [{}]",
            record.tax_id.formatted(),
            record.name,
            birth,
            record.source
        );
    }
}

fn run_candidates(personal: &str) -> Result<()> {
    let digits: String = personal.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect();
    let personal = match PersonalNumber::new(&digits) {
        Ok(p) => p,
        Err(reason) => {
            eprintln!("❌ Invalid personal number {:?}: {}", personal, reason);
            std::process::exit(1);
        }
    };

    let generated = candidates(&personal);
    if generated.is_empty() {
        println!("∅  {} has no tax-ID candidates", personal);
    }
    for tax_id in generated {
        println!("{}  {}", tax_id, tax_id.formatted());
    }

    Ok(())
}

fn run_import(csv_path: &Path, db_path: &Path) -> Result<()> {
    println!("🗄️  Registry Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    setup_registry(&conn)?;
    println!("✓ Database initialized with WAL mode");

    let inserted = import_csv(&conn, csv_path)?;
    let total = count_people(&conn)?;

    println!("✓ Inserted {} new records", inserted);
    println!("✓ Database contains {} records", total);

    Ok(())
}

/// `<ID> [NAME...]`; blank lines and `#` comments yield `None`
fn parse_batch_line(line: &str) -> Option<ResolveRequest> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let id = parts.next()?;
    let name = parts.next().map(str::trim).filter(|n| !n.is_empty());
    Some(ResolveRequest::new(id, name))
}

async fn run_batch(config: &ResolverConfig, file: &Path, json: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let requests: Vec<ResolveRequest> = contents.lines().filter_map(parse_batch_line).collect();

    let engine = Arc::new(ResolutionEngine::from_config(config)?);
    let audit = open_audit(config)?;

    let outcomes = engine.resolve_batch(requests.clone()).await;

    let mut resolved = 0;
    for (request, outcome) in requests.iter().zip(&outcomes) {
        if let Some(audit) = &audit {
            audit.record_resolution(&request.id, request.name.as_deref(), outcome, "cli-batch")?;
        }
        if outcome.is_resolved() {
            resolved += 1;
        }

        if json {
            let line = serde_json::json!({ "id": request.id, "name": request.name, "result": outcome });
            println!("{}", line);
        } else {
            println!("{}\t{}", request.id, outcome.summary());
        }
    }

    if !json {
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("✓ {} of {} resolved", resolved, outcomes.len());
    }

    Ok(())
}

fn run_history(config: &ResolverConfig, id: &str, json: bool) -> Result<()> {
    let audit = open_audit(config)?.context("No audit_db configured; nothing to show")?;
    let events = audit.events_for_id(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    println!("🧾 History for {}", id);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if events.is_empty() {
        println!("∅  No events recorded");
    }
    for event in &events {
        println!("{}", format_event(event));
    }

    Ok(())
}

fn format_event(event: &Event) -> String {
    let filter = event.data["name_filter"].as_str().unwrap_or("-");
    format!(
        "   {}  {:<22} filter={:<20} [{}]",
        event.timestamp.format("%Y-%m-%d %H:%M:%S"),
        event.outcome,
        filter,
        event.actor
    )
}
