//! reelcheck: video segment metadata validation CLI.
//!
//! Usage:
//!   reelcheck validate summary.json            (rules/summary_validation_rules.yaml by default)
//!   reelcheck check-rules rules/summary_validation_rules.yaml
//!   reelcheck replay --rules rules/summary_validation_rules.yaml \
//!       --attempt try1.json --attempt try2.json --config config/reelcheck.toml
//!
//! Exit codes: 0 PASS / accepted, 1 FAIL / cancelled, 2 retries exhausted,
//! 3 unreadable input, configuration or rule errors.

mod replay;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use reelcheck_audit::InMemoryHistoryWriter;
use reelcheck_contracts::{
    error::{ReelcheckError, ReelcheckResult},
    rules::{ItemRule, RuleKind, RuleNode, RuleSet},
    session::{GenerationRequest, SessionOutcome},
};
use reelcheck_core::{CancelHandle, ControllerConfig, HintingAdjuster, RetryController};
use reelcheck_rules::SharedRuleSet;
use reelcheck_verify::MetadataValidator;

use crate::replay::{LoggingQueue, ReplayGenerator};

const EXIT_FAIL: u8 = 1;
const EXIT_EXHAUSTED: u8 = 2;
const EXIT_ERROR: u8 = 3;

const DEFAULT_RULES: &str = "rules/summary_validation_rules.yaml";
const DEFAULT_PROMPT: &str = "Split the video into segments and describe each one as JSON.";

// ── CLI definition ────────────────────────────────────────────────────────────

/// reelcheck: validate AI-generated video segment metadata.
#[derive(Parser)]
#[command(
    name = "reelcheck",
    about = "Validate video segment metadata against declarative rules",
    long_about = "Checks generated segment metadata for structure, confidence and timeline\n\
                  quality, and replays bounded regeneration sessions."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate one metadata document and print the report.
    Validate {
        /// Metadata JSON produced by the generator.
        metadata: PathBuf,
        /// Rule document (YAML, JSON or TOML).
        #[arg(long, default_value = DEFAULT_RULES)]
        rules: PathBuf,
        /// Write the report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Video length in timestamp units.
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Parse a rule document and summarise it.
    CheckRules {
        rules: PathBuf,
    },
    /// Drive a retry session over recorded generator answers.
    Replay {
        #[arg(long, default_value = DEFAULT_RULES)]
        rules: PathBuf,
        /// One recorded answer per attempt, used in order.
        #[arg(long = "attempt", required = true)]
        attempts: Vec<PathBuf>,
        /// Controller TOML; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        max_retries: Option<u32>,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long, default_value = DEFAULT_PROMPT)]
        prompt: String,
        /// Write the hash-chained attempt history here.
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG=debug for per-field evaluation detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate {
            metadata,
            rules,
            output,
            duration,
        } => run_validate(&metadata, &rules, output.as_deref(), duration),
        Command::CheckRules { rules } => run_check_rules(&rules),
        Command::Replay {
            rules,
            attempts,
            config,
            max_retries,
            duration,
            prompt,
            history,
        } => {
            let options = ReplayOptions {
                rules,
                attempts,
                config,
                max_retries,
                duration,
                prompt,
                history,
            };
            run_replay(options).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("reelcheck error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

// ── validate ──────────────────────────────────────────────────────────────────

fn run_validate(
    metadata: &Path,
    rules: &Path,
    output: Option<&Path>,
    duration: Option<u32>,
) -> ReelcheckResult<ExitCode> {
    let rule_set = reelcheck_rules::from_file(rules)?;
    let raw = read_input(metadata)?;

    let validator = MetadataValidator::with_rules(rule_set).with_total_duration(duration);
    let pass = validator.validate_str(&raw);
    let report = pass.report;

    let rendered = report.to_json_pretty().map_err(|e| ReelcheckError::ConfigError {
        reason: format!("failed to render report: {}", e),
    })?;
    match output {
        Some(path) => {
            write_output(path, &rendered)?;
            println!(
                "{}: {} of {} segments valid, {} document errors; report written to {}",
                report.summary.overall_status,
                report.summary.valid_segments,
                report.summary.total_segments,
                report.document_errors.len(),
                path.display()
            );
        }
        None => println!("{}", rendered),
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAIL)
    })
}

// ── check-rules ───────────────────────────────────────────────────────────────

fn run_check_rules(rules: &Path) -> ReelcheckResult<ExitCode> {
    let rule_set = reelcheck_rules::from_file(rules)?;
    print_rule_summary(rules, &rule_set);
    Ok(ExitCode::SUCCESS)
}

fn print_rule_summary(path: &Path, rules: &RuleSet) {
    println!("{}: rule document OK", path.display());
    println!();
    println!("Segment fields:");
    for (name, node) in &rules.segment_schema().fields {
        println!("  {:<20} {}", name, describe(node));
    }

    let quality = rules.quality_checks();
    println!();
    println!("Quality checks:");
    if let Some(min) = quality.min_segments {
        println!("  min_segments           {}", min);
    }
    if let Some(gap) = quality.max_time_gap {
        println!("  max_time_gap           {}", gap);
    }
    if let Some(min) = quality.min_editorial_subjects {
        println!("  min_editorial_subjects {}", min);
    }
    if let Some(min) = quality.min_visual_subjects {
        println!("  min_visual_subjects    {}", min);
    }
    println!("  enforce_sequence       {}", quality.enforce_sequence);
    println!("  must_cover_full_video  {}", quality.must_cover_full_video);
}

fn describe(node: &RuleNode) -> String {
    let mut parts = vec![
        node.value_type().as_str().to_string(),
        if node.required { "required" } else { "optional" }.to_string(),
    ];
    match &node.kind {
        RuleKind::String(rule) => {
            if let Some(min) = rule.min_length {
                parts.push(format!("min_length={min}"));
            }
            if let Some(pattern) = &rule.pattern {
                parts.push(format!("pattern={}", pattern.source()));
            }
            if let Some(allowed) = &rule.allowed {
                parts.push(format!("enum=[{}]", allowed.join(", ")));
            }
        }
        RuleKind::Number(rule) => {
            if let Some(min) = rule.min {
                parts.push(format!("min={min}"));
            }
            if let Some(max) = rule.max {
                parts.push(format!("max={max}"));
            }
        }
        RuleKind::Array(rule) => {
            if let Some(min) = rule.min_items {
                parts.push(format!("min_items={min}"));
            }
            match &rule.items {
                ItemRule::Element(kind) => parts.push(format!("items={}", kind.as_str())),
                ItemRule::Schema(item) => parts.push(format!("items={}", item.value_type().as_str())),
            }
        }
        RuleKind::Object(rule) => parts.push(format!("fields={}", rule.fields.len())),
    }
    if let Some(level) = node.confidence.level {
        parts.push(format!("confidence>={}", level.as_str()));
    }
    if let Some(score) = node.confidence.score {
        parts.push(format!("score>={score}"));
    }
    if !node.aliases.is_empty() {
        parts.push(format!("aliases=[{}]", node.aliases.join(", ")));
    }
    parts.join(", ")
}

// ── replay ────────────────────────────────────────────────────────────────────

struct ReplayOptions {
    rules: PathBuf,
    attempts: Vec<PathBuf>,
    config: Option<PathBuf>,
    max_retries: Option<u32>,
    duration: Option<u32>,
    prompt: String,
    history: Option<PathBuf>,
}

async fn run_replay(options: ReplayOptions) -> ReelcheckResult<ExitCode> {
    let mut config = match &options.config {
        Some(path) => ControllerConfig::from_file(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(max_retries) = options.max_retries {
        config.retry.max_retries = max_retries;
    }
    let duration = options.duration.or(config.validation.total_duration);

    let rules = Arc::new(SharedRuleSet::from_file(&options.rules)?);
    let validator = MetadataValidator::new(rules).with_total_duration(duration);
    let generator = ReplayGenerator::from_files(&options.attempts)?;
    let history = InMemoryHistoryWriter::new();

    let controller = RetryController::new(
        Box::new(generator),
        Box::new(validator),
        Box::new(HintingAdjuster::new()),
        Box::new(history.clone()),
        config.retry,
    )
    .with_queue(Box::new(LoggingQueue));

    let document_ref = options
        .attempts
        .first()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    let session = controller
        .run(document_ref, GenerationRequest::new(options.prompt), &CancelHandle::new())
        .await?;

    let rendered = serde_json::to_string_pretty(&session).map_err(|e| ReelcheckError::ConfigError {
        reason: format!("failed to render session: {}", e),
    })?;
    println!("{}", rendered);

    if let Some(path) = &options.history {
        let log = history.export_log();
        let rendered = serde_json::to_string_pretty(&log).map_err(|e| ReelcheckError::HistoryWriteFailed {
            reason: format!("failed to render history: {}", e),
        })?;
        write_output(path, &rendered)?;
        info!(
            path = %path.display(),
            entries = log.entries.len(),
            intact = history.verify_integrity(),
            "attempt history written"
        );
    }

    let code = match &session.outcome {
        Some(SessionOutcome::Accepted { .. }) => ExitCode::SUCCESS,
        Some(SessionOutcome::Exhausted { .. }) => ExitCode::from(EXIT_EXHAUSTED),
        Some(SessionOutcome::Cancelled { .. }) | None => ExitCode::from(EXIT_FAIL),
    };
    eprintln!(
        "session {} finished in state {} after {} attempt(s)",
        session.id,
        session.state,
        session.history.len()
    );
    Ok(code)
}

// ── I/O helpers ───────────────────────────────────────────────────────────────

fn read_input(path: &Path) -> ReelcheckResult<String> {
    std::fs::read_to_string(path).map_err(|e| ReelcheckError::ConfigError {
        reason: format!("failed to read '{}': {}", path.display(), e),
    })
}

fn write_output(path: &Path, contents: &str) -> ReelcheckResult<()> {
    std::fs::write(path, contents).map_err(|e| ReelcheckError::ConfigError {
        reason: format!("failed to write '{}': {}", path.display(), e),
    })
}
