//! CLI binary for running research sessions and validating reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use scout_agent::{AgentEngine, EngineConfig, EngineEvent};
use scout_llm::{LlmClient, UsageTracker};
use scout_session::{
    derive_slug, parse_seed_url, validate_report, ReportTemplate, ReportValidation,
    ResearchConfig, ResearchController, RunResult, SessionEvent,
};
use scout_sources::{build_client, HttpSettings, SourceEndpoints};
use scout_types::ScoutError;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scout", version, about = "Turn a paper URL into a validated research report")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a seed document and write a report
    Run {
        /// URL of the seed document (arXiv abstract/PDF link or any web page)
        seed_url: String,

        /// Workspace root; reports land in <workdir>/reports/<slug>/
        #[arg(short, long)]
        workdir: Option<PathBuf>,

        /// Turn boundaries allowed before the run is stopped and failed
        #[arg(long, default_value = "40")]
        max_turns: usize,

        /// Model passed to the LLM provider
        #[arg(short, long)]
        model: Option<String>,

        /// Print events and the result as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Check an existing report against the template
    Validate {
        /// Path to the report markdown file
        report: PathBuf,

        /// Print the validation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the report slug a seed URL maps to
    Slug {
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Run {
            seed_url,
            workdir,
            max_turns,
            model,
            json,
        } => cmd_run(&seed_url, workdir, max_turns, model, json).await,
        Commands::Validate { report, json } => cmd_validate(&report, json),
        Commands::Slug { url } => cmd_slug(&url),
    };

    if let Err(err) = outcome {
        eprintln!("Error: {:#}", err);
        let code = err.downcast_ref::<ScoutError>().map_or(1, exit_code);
        std::process::exit(code);
    }
    Ok(())
}

/// Exit status for a failed command: 2 for input rejected before a run
/// started, 3 for an aborted run, 1 for everything else. An incomplete
/// report from `validate` also exits with 1.
fn exit_code(err: &ScoutError) -> i32 {
    if err.is_input_error() {
        2
    } else if err.is_run_failure() {
        3
    } else {
        1
    }
}

async fn cmd_run(
    seed_url: &str,
    workdir: Option<PathBuf>,
    max_turns: usize,
    model: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let workdir = match workdir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&workdir)?;
    let config = ResearchConfig::default()
        .with_workdir(std::fs::canonicalize(&workdir)?)
        .with_max_turns(max_turns);

    let mut engine_config = EngineConfig::default();
    if let Some(model) = model {
        engine_config.model = model;
    }
    let usage = UsageTracker::new();
    let llm = LlmClient::from_env()?.with_middleware(usage.clone());
    let engine = AgentEngine::new(llm, engine_config);
    let http = build_client(&HttpSettings::default())?;
    let tools = scout_tools::research_tools(http, &SourceEndpoints::default());

    if !json {
        println!("Researching: {}", seed_url);
        println!("Working directory: {}", config.workdir.display());
        println!("Turn limit: {}", config.max_turns);
    }

    let controller = Arc::new(ResearchController::new(Arc::new(engine), tools, config)?);

    let mut events = controller.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event, json),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let interrupt = tokio::spawn({
        let controller = controller.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, stopping at the next safe point...");
                controller.abort();
            }
        }
    });

    let result = controller.run(seed_url).await;

    // Drop every emitter handle so the printer drains and exits.
    interrupt.abort();
    let _ = interrupt.await;
    drop(controller);
    let _ = printer.await;

    tracing::info!(
        input_tokens = usage.total_input_tokens(),
        output_tokens = usage.total_output_tokens(),
        "Token usage"
    );

    let result = result?;
    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn cmd_validate(path: &Path, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)?;
    let validation = validate_report(&text, &ReportTemplate::default());

    if json {
        println!("{}", serde_json::to_string_pretty(&validation)?);
    } else {
        print_validation(&validation);
    }

    if !validation.is_complete {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_slug(url: &str) -> anyhow::Result<()> {
    let url = parse_seed_url(url)?;
    println!("{}", derive_slug(&url, ResearchConfig::default().slug_max_len));
    Ok(())
}

fn print_event(event: &SessionEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "Could not serialize event"),
        }
        return;
    }

    match event {
        SessionEvent::RunStarted { run_id, slug, .. } => {
            println!("Run {} ({})", run_id, slug);
        }
        SessionEvent::Status { message } => println!("{}", message),
        SessionEvent::Engine(EngineEvent::TurnStart { turn }) => println!("\nTurn {}", turn),
        SessionEvent::Engine(EngineEvent::ToolExecutionStart { tool, arguments, .. }) => {
            println!("  -> {} {}", tool, summarize(arguments));
        }
        SessionEvent::Engine(EngineEvent::ToolExecutionEnd {
            tool,
            result,
            is_error: true,
            ..
        }) => {
            println!("  !! {} failed: {}", tool, summarize(result));
        }
        SessionEvent::SourceAdded { url, provenance } => {
            println!("  + {} [{}]", url, provenance.as_deref().unwrap_or("-"));
        }
        SessionEvent::TurnCapReached { max_turns } => {
            println!("Turn limit of {} reached, stopping", max_turns);
        }
        SessionEvent::RunFailed { error } => println!("Run failed: {}", error),
        _ => {}
    }
}

/// One-line preview of a JSON value.
fn summarize(value: &serde_json::Value) -> String {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > 100 {
        format!("{}...", line.chars().take(100).collect::<String>())
    } else {
        line.to_string()
    }
}

fn print_result(result: &RunResult) {
    println!("\nResearch completed in {} turns", result.turns);
    println!("Report: {}", result.report_path.display());
    println!("HTML: {}", result.html_path.display());
    println!(
        "Sources: {} ({} entries)",
        result.sources_path.display(),
        result.sources.len()
    );
    print_validation(&result.validation);
}

fn print_validation(validation: &ReportValidation) {
    let mark = |ok: bool| if ok { "ok" } else { "FAIL" };

    println!("\nValidation:");
    println!("  [{}] required headings", mark(validation.has_all_required_headings));
    for heading in &validation.missing_headings {
        println!("        missing: {}", heading);
    }
    println!("  [{}] section depth", mark(validation.has_sufficient_sections));
    for heading in &validation.insufficient_sections {
        println!("        too short: {}", heading);
    }
    println!(
        "  [{}] related work comparison (comparison: {}, citation: {})",
        mark(validation.has_related_work_comparison),
        validation.related_work_has_comparison,
        validation.related_work_has_citation
    );
    println!("  [{}] reference URLs", mark(validation.has_reference_urls));
    println!(
        "Report is {}",
        if validation.is_complete { "complete" } else { "incomplete" }
    );
}
