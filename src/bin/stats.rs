use wikipath::{config::Config, db::Db, graph::SqliteGraphStore};

const RECENT_RUNS: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let store = SqliteGraphStore::new(Db::open_migrated(config.db_path()).await?);

    println!("\n=== wikipath Graph Statistics ===\n");

    let stats = store.stats().await?;
    println!("{:<20} {:>10}", "Pages", stats.pages);
    println!("{:<20} {:>10}", "Links", stats.links);
    println!("{:<20} {:>10}", "Expanded pages", stats.expanded_pages);
    if stats.expanded_pages > 0 {
        println!(
            "{:<20} {:>10.1}",
            "Links per expansion",
            stats.links as f64 / stats.expanded_pages as f64
        );
    }

    let runs = store.recent_search_runs(RECENT_RUNS).await?;
    if runs.is_empty() {
        println!("\nNo searches recorded yet.");
        return Ok(());
    }

    println!("\nRecent searches:\n");
    println!("{:-<96}", "");
    println!(
        "{:<20} {:<24} {:<24} {:>6} {:>8} {:>10}",
        "Timestamp", "Start", "Goal", "Steps", "Expands", "Latency ms"
    );
    println!("{:-<96}", "");
    for run in &runs {
        let steps = run
            .path
            .as_ref()
            .map(|p| (p.len() - 1).to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<24} {:<24} {:>6} {:>8} {:>10}",
            run.timestamp.as_deref().unwrap_or("unknown"),
            run.start_title,
            run.goal_title,
            steps,
            run.expansions,
            run.latency_ms
        );
    }
    println!("{:-<96}", "");

    let found = runs.iter().filter(|r| r.path.is_some()).count();
    println!("\nPaths found: {}/{}", found, runs.len());
    println!();

    Ok(())
}
