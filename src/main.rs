//! IR Eval CLI
//!
//! Evaluates keyword and structured Elasticsearch queries against a gold standard.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ir_eval::{
    answers::AnswerChecker,
    config::{Config, parse_cutoffs},
    gold::GoldStandard,
    llm::LlmClient,
    persistence::save_json,
    reconcile::{ResultFile, reconcile},
    report::{BackendErrorPolicy, EvaluationReporter, ReporterConfig},
    retrieval::{ElasticClient, Retriever, StoredRankings, Strategy},
};
use std::path::PathBuf;
use std::time::Instant;

/// IR Eval - precision/recall evaluation against a gold standard
#[derive(Parser)]
#[command(name = "ir-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate queries from a gold standard
    Evaluate {
        /// Path to the gold standard JSON file
        gold: PathBuf,

        /// Query numbers to evaluate (comma-separated, default: all)
        #[arg(short, long, value_delimiter = ',')]
        queries: Vec<u32>,

        /// Cutoffs (comma-separated, e.g. "5,10")
        #[arg(short, long)]
        cutoffs: Option<String>,

        /// Strategies to evaluate (comma-separated: keyword, kibana)
        #[arg(short, long, value_delimiter = ',')]
        strategies: Vec<String>,

        /// Number of results requested per query
        #[arg(long)]
        depth: Option<usize>,

        /// Replay rankings from a result file instead of querying Elasticsearch
        #[arg(short, long)]
        results: Option<PathBuf>,

        /// Report unknown query numbers as skipped instead of failing
        #[arg(long)]
        skip_unknown: bool,

        /// Record retrieval failures and continue instead of aborting
        #[arg(long)]
        keep_going: bool,

        /// Save the report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every gold standard query and save the rankings to a result file
    Collect {
        /// Path to the gold standard JSON file
        gold: PathBuf,

        /// Output path for the result file
        #[arg(short, long, default_value = "results.json")]
        output: PathBuf,

        /// Number of results requested per query
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Fill missing fields of a result file from the gold standard
    Reconcile {
        /// Path to the result file
        results: PathBuf,

        /// Path to the gold standard JSON file
        #[arg(short, long)]
        gold: PathBuf,

        /// Output path for the repaired result file
        #[arg(short, long, default_value = "results_fixed.json")]
        output: PathBuf,
    },

    /// Load a gold standard and show a summary
    Check {
        /// Path to the gold standard JSON file
        gold: PathBuf,
    },

    /// Ask an LLM whether the judged evidence names the expected answers
    CheckAnswers {
        /// Path to the gold standard JSON file
        gold: PathBuf,

        /// Query numbers to check (e.g. "3,7,10")
        #[arg(short, long, value_delimiter = ',', num_args = 1.., required = true)]
        pick: Vec<u32>,

        /// Model name (overrides LLM_MODEL)
        #[arg(short, long)]
        model: Option<String>,

        /// Save the results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Test the Elasticsearch connection
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Evaluate {
            gold,
            queries,
            cutoffs,
            strategies,
            depth,
            results,
            skip_unknown,
            keep_going,
            output,
        } => {
            let options = EvaluateOptions {
                queries,
                cutoffs,
                strategies,
                depth,
                results,
                skip_unknown,
                keep_going,
                output,
            };
            cmd_evaluate(gold, options).await
        }
        Commands::Collect {
            gold,
            output,
            depth,
        } => cmd_collect(gold, output, depth).await,
        Commands::Reconcile {
            results,
            gold,
            output,
        } => cmd_reconcile(results, gold, output),
        Commands::Check { gold } => cmd_check(gold),
        Commands::CheckAnswers {
            gold,
            pick,
            model,
            output,
        } => cmd_check_answers(gold, pick, model, output).await,
        Commands::Ping => {
            let config = Config::load().context("Failed to load configuration")?;
            cmd_ping(config).await
        }
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("ir_eval={level}"))),
        )
        .with_writer(std::io::stderr)
        .init();
}

struct EvaluateOptions {
    queries: Vec<u32>,
    cutoffs: Option<String>,
    strategies: Vec<String>,
    depth: Option<usize>,
    results: Option<PathBuf>,
    skip_unknown: bool,
    keep_going: bool,
    output: Option<PathBuf>,
}

async fn cmd_evaluate(gold_path: PathBuf, options: EvaluateOptions) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(cutoffs) = &options.cutoffs {
        config.eval.cutoffs = parse_cutoffs(cutoffs)?;
    }
    if let Some(depth) = options.depth {
        config.eval.depth = depth;
    }
    config.validate_eval().context("Invalid configuration")?;

    let strategies = if options.strategies.is_empty() {
        Strategy::ALL.to_vec()
    } else {
        options
            .strategies
            .iter()
            .map(|s| s.parse::<Strategy>())
            .collect::<ir_eval::Result<Vec<_>>>()?
    };

    let gold = GoldStandard::load(&gold_path)
        .with_context(|| format!("Failed to load gold standard '{}'", gold_path.display()))?;
    println!("Number of queries in gold standard: {}", gold.len());

    let reporter_config = ReporterConfig {
        strategies,
        skip_unknown: options.skip_unknown,
        on_backend_error: if options.keep_going {
            BackendErrorPolicy::SkipPair
        } else {
            BackendErrorPolicy::Abort
        },
        ..ReporterConfig::from_eval_config(&config.eval)
    };

    let report = match &options.results {
        Some(results_path) => {
            let file = ResultFile::load(results_path).with_context(|| {
                format!("Failed to load result file '{}'", results_path.display())
            })?;
            let stored = StoredRankings::from_result_file(&file, &gold, config.eval.depth)
                .context("Result file does not match the gold standard")?;
            println!(
                "Replaying {} stored rankings from {}",
                stored.len(),
                results_path.display()
            );
            run_evaluation(&gold, &stored, reporter_config, &options.queries).await?
        }
        None => {
            config.validate_search().context("Invalid configuration")?;
            let client = ElasticClient::connect(config.search.clone())
                .await
                .context("Failed to connect to Elasticsearch")?;
            let report = run_evaluation(&gold, &client, reporter_config, &options.queries).await;
            client.close();
            report?
        }
    };

    report.print_summary();

    if let Some(output_path) = options.output {
        save_json(&report, &output_path).context("Failed to save report")?;
        println!("Report saved to {}", output_path.display());
    }

    Ok(())
}

async fn run_evaluation(
    gold: &GoldStandard,
    retriever: &dyn Retriever,
    config: ReporterConfig,
    selection: &[u32],
) -> Result<ir_eval::EvaluationReport> {
    let reporter = EvaluationReporter::new(gold, retriever, config)?;
    let report = reporter.run(selection).await.context("Evaluation failed")?;
    Ok(report)
}

async fn cmd_collect(gold_path: PathBuf, output: PathBuf, depth: Option<usize>) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(depth) = depth {
        config.eval.depth = depth;
    }
    config.validate_search().context("Invalid configuration")?;
    if config.eval.depth == 0 {
        anyhow::bail!("--depth must be at least 1");
    }

    let gold = GoldStandard::load(&gold_path)
        .with_context(|| format!("Failed to load gold standard '{}'", gold_path.display()))?;

    println!("Loaded queries: {}", gold.len());
    println!(
        "ES_URL={}, INDEX={}, TOPK={}",
        config.search.url, config.search.index, config.eval.depth
    );

    let start = Instant::now();
    let client = ElasticClient::connect(config.search.clone())
        .await
        .context("Failed to connect to Elasticsearch")?;
    let collected = ir_eval::collect_results(&gold, &client, config.eval.depth).await;
    client.close();
    let file = collected.context("Failed to collect results")?;

    file.save(&output).context("Failed to save result file")?;
    println!(
        "Wrote {} in {:.2?}",
        output.display(),
        start.elapsed()
    );

    Ok(())
}

fn cmd_reconcile(results_path: PathBuf, gold_path: PathBuf, output: PathBuf) -> Result<()> {
    let gold = GoldStandard::load(&gold_path)
        .with_context(|| format!("Failed to load gold standard '{}'", gold_path.display()))?;
    let partial = ResultFile::load(&results_path)
        .with_context(|| format!("Failed to load result file '{}'", results_path.display()))?;

    let (fixed, summary) = reconcile(partial, &gold).context("Reconciliation failed")?;
    fixed.save(&output).context("Failed to save result file")?;

    println!("Records:          {}", summary.records);
    println!("Fields filled:    {}", summary.fields_filled);
    println!("Metadata filled:  {}", summary.metadata_filled);
    if summary.renamed_results_key {
        println!("Renamed top-level `results` to `queries`");
    }
    if summary.discarded_results {
        println!("Discarded `results` list in favour of `queries`");
    }
    println!("Wrote {}", output.display());

    Ok(())
}

fn cmd_check(gold_path: PathBuf) -> Result<()> {
    let gold = GoldStandard::load(&gold_path)
        .with_context(|| format!("Failed to load gold standard '{}'", gold_path.display()))?;

    println!("Gold Standard Information");
    println!("{}", "─".repeat(40));
    println!("  Path:      {}", gold_path.display());
    println!("  Queries:   {}", gold.len());
    for (key, value) in gold.metadata() {
        println!("  {}: {}", key, value);
    }

    for query in gold.queries() {
        println!(
            "  #{:<3} {:>3} judged  keyword: {:<3} kibana: {:<3} {}",
            query.number,
            query.matches.len(),
            if Strategy::Keyword.can_submit(query) { "yes" } else { "no" },
            if Strategy::Structured.can_submit(query) { "yes" } else { "no" },
            query.original_query.as_deref().unwrap_or("")
        );
    }

    let unjudged = gold.unjudged_queries();
    if !unjudged.is_empty() {
        println!("\nERROR: queries without gold hits: {:?}", unjudged);
    }

    Ok(())
}

async fn cmd_check_answers(
    gold_path: PathBuf,
    pick: Vec<u32>,
    model: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(model) = model {
        config.llm.model = model;
    }
    config.validate_llm().context("Invalid configuration")?;

    let gold = GoldStandard::load(&gold_path)
        .with_context(|| format!("Failed to load gold standard '{}'", gold_path.display()))?;

    let client = LlmClient::new(config.llm);

    println!("=== Named-entity answer check ===");
    println!("Gold: {}", gold_path.display());
    println!("Model: {}", client.model());
    println!("Picked queries: {:?}", pick);
    println!();

    let checks = AnswerChecker::new(&gold, &client)
        .check(&pick)
        .await
        .context("Answer check failed")?;

    for check in &checks {
        println!("{}", "-".repeat(60));
        println!("{}", check);
    }

    let correct = checks.iter().filter(|c| c.auto_correct()).count();
    println!("{}", "-".repeat(60));
    println!("Queries with a matched answer: {}/{}", correct, checks.len());

    if let Some(output_path) = output {
        save_json(&checks, &output_path).context("Failed to save answer check")?;
        println!("Results saved to {}", output_path.display());
    }

    Ok(())
}

async fn cmd_ping(config: Config) -> Result<()> {
    println!("Testing Elasticsearch connection...\n");

    println!("Configuration:");
    println!("  URL:    {}", config.search.url);
    println!("  Index:  {}", config.search.index);
    println!();

    config.validate_search().context("Invalid configuration")?;

    let client = ElasticClient::new(config.search)?;
    let pinged = client.ping().await;
    client.close();

    let info = pinged.context("Connection failed")?;
    println!(
        "Connection successful! cluster={} version={}",
        info.cluster_name, info.version.number
    );

    Ok(())
}
