use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::time::Instant;
use wikipath::cache::EmbeddingCache;
use wikipath::db::Db;
use wikipath::embeddings::OpenAIEmbedder;
use wikipath::graph::{SearchRunRecord, SqliteGraphStore};
use wikipath::search::{GraphExpander, HeuristicEvaluator};
use wikipath::source::WikiScraper;
use wikipath::{normalize_title, Config, SearchEngine, SearchOutcome};

#[derive(Parser, Debug)]
#[command(name = "wikipath")]
#[command(about = "Find a chain of wiki links between two pages")]
struct Args {
    /// Start page title (prompted for when omitted)
    start: Option<String>,

    /// Goal page title (prompted for when omitted)
    goal: Option<String>,

    /// Maximum number of links to follow (overrides config)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Ranked links explored per page (overrides config)
    #[arg(long)]
    top_n: Option<usize>,

    /// Reuse links of pages expanded in earlier runs instead of refetching
    #[arg(long)]
    skip_expanded: bool,
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("Failed to read from stdin")?;
    Ok(line)
}

fn title_arg(value: Option<String>, label: &str) -> Result<String> {
    let raw = match value {
        Some(v) => v,
        None => prompt(label)?,
    };
    let title = normalize_title(&raw);
    if title.is_empty() {
        anyhow::bail!("Page title cannot be empty");
    }
    Ok(title)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.wikipath.log_level),
    )
    .init();

    let mut options = config.search.options();
    if let Some(max_depth) = args.max_depth {
        options.max_depth = max_depth;
    }
    if let Some(top_n) = args.top_n {
        anyhow::ensure!(top_n > 0, "--top-n must be greater than 0");
        options.top_n = top_n;
    }

    let start = title_arg(args.start, "Enter the start point: ")?;
    let goal = title_arg(args.goal, "Enter the end point: ")?;

    let db = Db::open_migrated(config.db_path()).await?;
    log::info!("Graph database: {}", config.db_path().display());
    let store = SqliteGraphStore::new(db);

    let scraper = WikiScraper::from_config(&config.wiki)?;
    let embedder = OpenAIEmbedder::from_config(config.api_key()?, &config.embeddings)?;
    let cache = EmbeddingCache::new();

    let engine = SearchEngine::new(
        GraphExpander::new(&scraper, &store)
            .skip_expanded(args.skip_expanded || config.search.skip_expanded),
        HeuristicEvaluator::new(&cache, &embedder),
        &store,
        options,
    );

    let started = Instant::now();
    let report = engine.search(&start, &goal).await?;
    let latency = started.elapsed();

    log::debug!(
        "Embedding cache: {} entries, {} hits, {} misses",
        cache.len(),
        cache.hits(),
        cache.misses()
    );

    let run = SearchRunRecord {
        start_title: start,
        goal_title: goal,
        max_depth: options.max_depth,
        top_n: options.top_n,
        path: report.outcome.path().map(|p| p.to_vec()),
        expansions: report.stats.expansions,
        backtracks: report.stats.backtracks,
        latency_ms: latency.as_millis() as u64,
        timestamp: None,
    };
    if let Err(e) = store.record_search_run(&run).await {
        log::warn!("Failed to record search run: {}", e);
    }

    match &report.outcome {
        SearchOutcome::Found(path) => {
            println!("Found a path in {} steps!", path.len() - 1);
            println!("{}", path.join(" -> "));
        }
        SearchOutcome::NotFound => {
            println!("No path found within the step limit.");
        }
    }

    Ok(())
}
