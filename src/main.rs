//! Binary entry point for mathmentor.
//!
//! This binary provides the CLI interface for the mathmentor tutoring
//! pipeline.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr and print_stdout in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use mathmentor::config::{LlmProvider, MentorConfig};
use mathmentor::retrieval::{self, KnowledgeIndex};
use mathmentor::{
    Feedback, InputType, MemoryStore, Pipeline, SymbolicResult, embedding, observability,
};

/// Mathmentor - a retrieval-augmented math tutoring pipeline.
#[derive(Parser)]
#[command(name = "mathmentor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "MATHMENTOR_CONFIG_PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Seed the knowledge corpus and build the index.
    Init,

    /// Solve a math problem.
    Solve {
        /// The problem to solve.
        problem: String,

        /// Input channel: text, image, or audio.
        #[arg(long, default_value = "text")]
        input_type: String,

        /// Feedback to store with the interaction: correct or incorrect.
        #[arg(long)]
        feedback: Option<String>,

        /// Comment to store with the feedback.
        #[arg(long)]
        comment: Option<String>,

        /// Do not store this interaction in memory.
        #[arg(long)]
        no_store: bool,
    },

    /// Find similar past problems.
    Recall {
        /// The problem text to match against.
        query: String,

        /// Maximum number of results.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Record feedback on a stored interaction.
    Feedback {
        /// Interaction id, as printed by solve.
        id: String,

        /// Verdict: correct or incorrect.
        verdict: String,

        /// Free-form comment.
        #[arg(long)]
        comment: Option<String>,
    },

    /// Manage the knowledge index.
    Index {
        /// Index subcommand.
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Show status.
    Status,

    /// Remove every stored interaction.
    Clear {
        /// Skip confirmation.
        #[arg(long)]
        yes: bool,
    },
}

/// Index subcommands.
#[derive(Subcommand)]
enum IndexAction {
    /// Rebuild the index from the corpus.
    Build,
    /// Show index metadata.
    Status,
}

/// Main entry point.
fn main() -> ExitCode {
    // Pick up GROQ_API_KEY and friends from a local .env, if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: MentorConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init => cmd_init(&config),

        Commands::Solve {
            problem,
            input_type,
            feedback,
            comment,
            no_store,
        } => cmd_solve(config, problem, input_type, feedback, comment, no_store),

        Commands::Recall { query, limit } => cmd_recall(&config, query, limit),

        Commands::Feedback {
            id,
            verdict,
            comment,
        } => cmd_feedback(&config, id, verdict, comment),

        Commands::Index { action } => match action {
            IndexAction::Build => cmd_index_build(&config),
            IndexAction::Status => cmd_index_status(&config),
        },

        Commands::Status => cmd_status(&config),

        Commands::Clear { yes } => cmd_clear(&config, yes),
    }
}

/// Loads configuration.
///
/// The path comes from `--config` or `MATHMENTOR_CONFIG_PATH`; without
/// either, the default locations are searched.
fn load_config(path: Option<&str>) -> Result<MentorConfig, Box<dyn std::error::Error>> {
    if let Some(config_path) = path.map(str::trim).filter(|p| !p.is_empty()) {
        let config = MentorConfig::load_from_file(std::path::Path::new(config_path))?;
        return Ok(config.with_env_overrides());
    }

    Ok(MentorConfig::load_default())
}

/// Init command.
fn cmd_init(config: &MentorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let written = retrieval::seed(&config.corpus_dir)?;
    if written.is_empty() {
        println!(
            "Knowledge corpus already present at {}",
            config.corpus_dir.display()
        );
    } else {
        println!(
            "Seeded {} reference documents into {}",
            written.len(),
            config.corpus_dir.display()
        );
    }

    let index = KnowledgeIndex::build(
        &config.corpus_dir,
        &config.index_path(),
        &config.retrieval,
        embedding::build_embedder(),
    )?;
    println!(
        "Knowledge index built: {} chunks from {} documents",
        index.len(),
        index.sources().len()
    );

    Ok(())
}

/// Solve command.
fn cmd_solve(
    config: MentorConfig,
    problem: String,
    input_type: String,
    feedback: Option<String>,
    comment: Option<String>,
    no_store: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let input_type: InputType = input_type.parse()?;
    let feedback = match feedback {
        Some(verdict) => verdict.parse()?,
        None => Feedback::None,
    };

    let mut pipeline = Pipeline::new(config)?;
    let outcome = pipeline.run(&problem, input_type)?;

    println!("Problem ({}):", outcome.parsed.topic);
    println!("  {}", outcome.parsed.problem_text);
    if outcome.parsed.needs_clarification {
        println!(
            "  Clarification needed: {}",
            outcome.parsed.clarification_reason
        );
    }

    if !outcome.similar.is_empty() {
        println!();
        println!("Similar past problems:");
        for hit in &outcome.similar {
            println!(
                "  [{:.2}] {}",
                hit.similarity, hit.record.parsed_problem.problem_text
            );
        }
    }

    println!();
    println!("Solution (confidence {:.2}):", outcome.bundle.confidence);
    println!("{}", outcome.bundle.narrative);

    match &outcome.bundle.symbolic {
        SymbolicResult::Solved {
            equation,
            solutions,
        } => {
            println!();
            if solutions.is_empty() {
                println!("Exact solver: '{equation}' has no discrete solutions");
            } else {
                println!("Exact solver: '{equation}' gives {}", solutions.join(", "));
            }
        },
        SymbolicResult::Failed { error } => {
            println!();
            println!("Exact solver did not finish: {error}");
        },
        SymbolicResult::NotApplicable { .. } => {},
    }

    println!();
    let verdict = if outcome.verification.is_correct {
        "passed"
    } else {
        "FAILED"
    };
    println!(
        "Verification {verdict} (confidence {:.2})",
        outcome.verification.confidence
    );
    for issue in &outcome.verification.issues {
        println!("  - {issue}");
    }
    if outcome.verification.needs_human_review {
        println!("  A human should review this solution.");
    }

    println!();
    println!("Explanation:");
    println!("{}", outcome.explanation);

    if !no_store {
        let id = pipeline.record(
            &problem,
            input_type,
            &outcome,
            feedback,
            comment.as_deref().unwrap_or(""),
        )?;
        println!();
        println!("Stored as interaction {id}");
    }

    let fallbacks = pipeline.fallback_snapshot();
    if fallbacks.total() > 0 {
        println!();
        println!("Degraded paths taken: {fallbacks}");
    }

    Ok(())
}

/// Recall command.
fn cmd_recall(
    config: &MentorConfig,
    query: String,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryStore::open(config.memory_path(), config.recall.similarity_threshold);
    let hits = store.recall(&query, limit.unwrap_or(config.recall.limit));

    if hits.is_empty() {
        println!("No similar past problems.");
        return Ok(());
    }

    println!("Found {} similar past problems:", hits.len());
    for hit in &hits {
        println!();
        println!(
            "  [{:.2}] {}",
            hit.similarity, hit.record.parsed_problem.problem_text
        );
        println!(
            "       id: {}  topic: {}  asked: {}  feedback: {}",
            hit.record.id,
            hit.record.parsed_problem.topic,
            hit.record.timestamp.format("%Y-%m-%d %H:%M"),
            hit.record.feedback
        );
    }

    Ok(())
}

/// Feedback command.
fn cmd_feedback(
    config: &MentorConfig,
    id: String,
    verdict: String,
    comment: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = uuid::Uuid::parse_str(&id)?;
    let feedback: Feedback = verdict.parse()?;

    let mut store = MemoryStore::open(config.memory_path(), config.recall.similarity_threshold);
    store.apply_feedback(id, feedback, comment.as_deref().unwrap_or(""))?;
    println!("Feedback recorded for {id}");

    Ok(())
}

/// Index build command.
fn cmd_index_build(config: &MentorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let index = KnowledgeIndex::build(
        &config.corpus_dir,
        &config.index_path(),
        &config.retrieval,
        embedding::build_embedder(),
    )?;

    println!("Knowledge index rebuilt: {} chunks", index.len());
    for (source, count) in index.sources() {
        println!("  {source}: {count} chunks");
    }

    Ok(())
}

/// Index status command.
fn cmd_index_status(config: &MentorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let path = config.index_path();
    if !path.exists() {
        println!("Index not built. Run 'mathmentor init' or 'mathmentor index build'.");
        return Ok(());
    }

    // Loading self-heals a stale or corrupt index, so this reports the
    // index the next solve would actually use.
    let index = KnowledgeIndex::load(
        &config.corpus_dir,
        &path,
        &config.retrieval,
        embedding::build_embedder(),
    )?;
    let metadata = index.metadata();

    println!("Knowledge index: {}", path.display());
    println!("  Chunks: {}", index.len());
    println!(
        "  Embedder: {} ({} dimensions)",
        metadata.embedder_id, metadata.dimensions
    );
    println!(
        "  Chunking: {} chars, {} overlap",
        metadata.chunk_size, metadata.chunk_overlap
    );
    println!("  Built: {}", metadata.built_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Documents:");
    for (source, count) in index.sources() {
        println!("    {source}: {count} chunks");
    }

    Ok(())
}

/// Status command.
fn cmd_status(config: &MentorConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Mathmentor Status");
    println!("=================");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let documents = retrieval::load_documents(&config.corpus_dir);
    let corpus_status = if documents.is_empty() {
        "Empty (run 'mathmentor init')".to_string()
    } else {
        format!("{} documents", documents.len())
    };
    println!("Knowledge Corpus: {corpus_status}");
    println!("  Path: {}", config.corpus_dir.display());

    let index_status = if config.index_path().exists() {
        "Available"
    } else {
        "Not built"
    };
    println!("Knowledge Index: {index_status}");
    println!("  Path: {}", config.index_path().display());

    let store = MemoryStore::open(config.memory_path(), config.recall.similarity_threshold);
    println!("Memory Log: {} interactions", store.len());
    println!("  Path: {}", config.memory_path().display());

    let provider = match config.llm.provider {
        LlmProvider::Groq => "groq",
        LlmProvider::Ollama => "ollama",
    };
    println!("LLM Provider: {provider}");
    if let Some(model) = &config.llm.model {
        println!("  Model: {model}");
    }

    Ok(())
}

/// Clear command.
fn cmd_clear(config: &MentorConfig, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !yes {
        println!("This removes every stored interaction. Pass --yes to confirm.");
        return Ok(());
    }

    let mut store = MemoryStore::open(config.memory_path(), config.recall.similarity_threshold);
    let removed = store.len();
    store.clear()?;
    println!("Cleared {removed} stored interactions.");

    Ok(())
}
