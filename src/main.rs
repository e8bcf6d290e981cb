//! search-wrapper command line entry point
//!
//! Runs one search and prints the response as JSON.

use anyhow::Result;
use clap::Parser;
use search_wrapper::{lifecycle::with_engine, EngineRegistry, SearchQuery, SearchEngine, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "search-wrapper", version)]
#[command(about = "Search Serper, DuckDuckGo or Bing and print the results as JSON")]
struct Cli {
    /// Engine name or shortcut (serper/g, duckduckgo/ddg, bing/bi)
    engine: String,

    /// Number of organic results
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Number of images; the engine default applies when omitted
    #[arg(short, long)]
    images: Option<usize>,

    /// Search terms
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

impl Cli {
    fn search_query(&self) -> SearchQuery {
        let mut query = SearchQuery::new(self.query.join(" "));
        if let Some(count) = self.count {
            query = query.with_text_count(count);
        }
        if let Some(count) = self.images {
            query = query.with_image_count(count);
        }
        query
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let query = cli.search_query();

    let settings = Settings::load()?;
    let engine = EngineRegistry::global().create(&cli.engine, &settings)?;

    let about = engine.about();
    info!(
        engine = engine.name(),
        website = about.website.as_deref().unwrap_or("-"),
        official_api = about.use_official_api,
        results = %about.results,
        "search-wrapper v{}",
        search_wrapper::VERSION
    );

    let response = with_engine(engine, |engine| async move { engine.search(&query).await }).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
