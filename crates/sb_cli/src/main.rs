use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sb_core::{CacheKey, CacheRepository, ChartKind, ChatReply, Conversation, Role};
use sb_scrapers::manager::{DEFAULT_CATALOG_PATH, DEFAULT_TASKBOOK_BASE};
use sb_scrapers::scrapers::osdr::DEFAULT_OSDR_BASE;
use sb_scrapers::{handle_command, init_logging, ScraperArgs, SourceManager, SourcesConfig};
use sb_storage::{create_cache, default_cache_dir, InvalidationPolicy, SessionCache};
use sb_views::{paginate, Filters, FuzzyMatcher, HoverState, Query, Selection};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

mod client;
mod duration;

use client::DashboardClient;
use duration::HumanDuration;

#[derive(Parser, Debug)]
#[command(author, version, about = "NASA space-biology research dashboard", long_about = None)]
pub struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[arg(long, env = "SBX_BACKEND_URL", default_value = "http://127.0.0.1:8000", global = true)]
    backend_url: String,
    /// Directory of the persistent cache partition
    #[arg(long, env = "SBX_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,
    /// Drop cached entries older than this (e.g. 1h30m); entries live until cleared otherwise
    #[arg(long, env = "SBX_CACHE_TTL", global = true)]
    cache_ttl: Option<HumanDuration>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
struct SourceOptions {
    #[arg(long, env = "SBX_TASKBOOK_URL", default_value = DEFAULT_TASKBOOK_BASE)]
    taskbook_url: String,
    #[arg(long, env = "SBX_OSDR_URL", default_value = DEFAULT_OSDR_BASE)]
    osdr_url: String,
    /// Publication catalog CSV
    #[arg(long, env = "SBX_CATALOG", default_value = DEFAULT_CATALOG_PATH)]
    catalog: PathBuf,
}

impl SourceOptions {
    fn config(&self) -> SourcesConfig {
        SourcesConfig {
            taskbook_base: self.taskbook_url.clone(),
            osdr_base: self.osdr_url.clone(),
            catalog_path: self.catalog.clone(),
            ..SourcesConfig::default()
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "SBX_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
        /// Inference model: gemini or dummy
        #[arg(long, default_value = "gemini")]
        model: String,
        #[arg(long, env = "SBX_GEMINI_MODEL")]
        model_name: Option<String>,
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        gemini_api_key: Option<String>,
        #[command(flatten)]
        sources: SourceOptions,
    },
    /// Scrape upstream sources directly, without the server
    Scrape {
        #[command(flatten)]
        args: ScraperArgs,
        #[command(flatten)]
        sources: SourceOptions,
    },
    /// List or show publications
    Articles {
        #[command(flatten)]
        search: SearchArgs,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Show one article's extracted content
        #[arg(long)]
        id: Option<usize>,
    },
    /// List or show OSDR datasets
    Datasets {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(long)]
        id: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Task Book highlights
    Highlights {
        #[command(flatten)]
        search: SearchArgs,
    },
    /// AI summary, keywords and chart data for an article
    Analyze { id: usize },
    /// Ask about an article; without a question, reads questions from stdin
    Chat { id: usize, question: Option<String> },
    /// Render an article's analysis chart as SVG
    Chart {
        id: usize,
        /// pie, donut, bar, column, line or area; defaults to the analysis' own type
        #[arg(long)]
        kind: Option<ChartKind>,
        #[arg(long)]
        hover: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inspect or clear the client cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct SearchArgs {
    #[arg(short, long)]
    query: Option<String>,
    #[arg(long)]
    year: Option<String>,
    #[arg(long = "type")]
    kind: Option<String>,
}

impl SearchArgs {
    fn query(&self) -> Query {
        Query::text(self.query.clone().unwrap_or_default()).with_filters(Filters {
            year: Selection::parse(self.year.as_deref()),
            kind: Selection::parse(self.kind.as_deref()),
            ..Filters::default()
        })
    }
}

#[derive(clap::Subcommand, Debug)]
enum CacheCommands {
    /// List persisted keys
    List,
    /// Remove one entry, e.g. `analysis:12`
    Invalidate { key: CacheKey },
    /// Remove every persisted entry
    Clear,
}

fn policy(ttl: Option<HumanDuration>) -> InvalidationPolicy {
    match ttl {
        Some(HumanDuration(ttl)) => InvalidationPolicy::Ttl(ttl),
        None => InvalidationPolicy::Manual,
    }
}

async fn persistent_cache(cli: &Cli) -> anyhow::Result<Arc<dyn CacheRepository>> {
    let dir = cli.cache_dir.clone().unwrap_or_else(default_cache_dir);
    let cache = create_cache("file", Some(&dir.join("persistent.json")), policy(cli.cache_ttl))
        .await
        .with_context(|| format!("opening cache in {}", dir.display()))?;
    Ok(cache)
}

async fn client(cli: &Cli) -> anyhow::Result<DashboardClient> {
    let session = Arc::new(SessionCache::new(policy(cli.cache_ttl)));
    let persistent = persistent_cache(cli).await?;
    Ok(DashboardClient::new(&cli.backend_url, session, persistent)?)
}

fn source_manager(options: &SourceOptions, ttl: Option<HumanDuration>) -> anyhow::Result<SourceManager> {
    let content_cache = Arc::new(SessionCache::new(policy(ttl)));
    Ok(SourceManager::new(options.config(), content_cache)?)
}

fn print_page<T>(page: &sb_views::Page<T>) {
    println!(
        "page {}/{} ({} items)",
        page.page, page.total_pages, page.total_items
    );
}

fn print_reply(id: usize, reply: &ChatReply) {
    println!("{}", reply.answer);
    if reply.show_summary_button == Some(true) {
        println!("\n(run `sbx analyze {}` for the full summary)", id);
    }
}

/// One question per line until EOF. The transcript lives only as long as
/// the session.
async fn chat_session(client: &DashboardClient, id: usize) -> anyhow::Result<()> {
    let mut conversation = Conversation::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        conversation.push(Role::User, question);
        let reply = client.chat(id, question).await?;
        print_reply(id, &reply);
        conversation.push(Role::Assistant, reply.answer);
    }
    info!("chat ended after {} messages", conversation.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Serve {
            bind,
            model,
            model_name,
            gemini_api_key,
            sources,
        } => {
            let manager = source_manager(sources, cli.cache_ttl)?;
            info!("📚 {} articles in catalog", manager.articles().len());

            let config = sb_inference::Config {
                api_key: gemini_api_key.clone(),
                model_name: model_name.clone(),
                base_url: None,
            };
            let analyst = match sb_inference::analyst(model, config) {
                Ok(analyst) => analyst,
                Err(e) => {
                    tracing::warn!("{}; falling back to the offline model", e);
                    sb_inference::analyst("dummy", sb_inference::Config::default())?
                }
            };
            info!("🧠 Inference model: {}", analyst.model_name());

            let state = sb_web::AppState::new(Arc::new(manager), analyst);
            sb_web::serve(*bind, state).await?;
        }
        Commands::Scrape { args, sources } => {
            let manager = source_manager(sources, cli.cache_ttl)?;
            handle_command(args.clone(), &manager).await?;
        }
        Commands::Articles { search, page, id } => {
            let client = client(&cli).await?;
            if let Some(id) = id {
                let (article, content) = client.article_view(*id).await?;
                println!("{}\n{}\n", article.title, article.link);
                println!("{}", sb_core::html_to_text(&content.content));
                if !content.tables.is_empty() {
                    println!("\n{} table(s)", content.tables.len());
                }
                return Ok(());
            }
            let articles = client.articles().await?;
            let matches = sb_views::apply(&articles, &search.query(), &FuzzyMatcher::default());
            let page = paginate(&matches, *page);
            for article in &page.items {
                println!("{:>5}  {:<4}  {}", article.id, article.year, article.title);
            }
            print_page(&page);
        }
        Commands::Datasets { query, id, page } => {
            let client = client(&cli).await?;
            if let Some(id) = id {
                let dataset = client.dataset(id).await?;
                println!("{}", serde_json::to_string_pretty(&dataset)?);
                return Ok(());
            }
            let datasets = client.datasets().await?;
            let matches = FuzzyMatcher::default().search(&datasets, query.as_deref().unwrap_or_default());
            let page = paginate(&matches, *page);
            for dataset in &page.items {
                println!("{:<10}  {:<24}  {}", dataset.accession, dataset.organism, dataset.title);
            }
            print_page(&page);
        }
        Commands::Highlights { search } => {
            let client = client(&cli).await?;
            let highlights = client.highlights().await?;
            for highlight in sb_views::apply(&highlights, &search.query(), &FuzzyMatcher::default()) {
                println!("[{}] {} ({})\n      {}", highlight.kind, highlight.title, highlight.year, highlight.link);
            }
        }
        Commands::Analyze { id } => {
            let client = client(&cli).await?;
            let analysis = client.analysis(*id).await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Commands::Chat { id, question } => {
            let client = client(&cli).await?;
            match question {
                Some(question) => {
                    let reply = client.chat(*id, question).await?;
                    print_reply(*id, &reply);
                }
                None => chat_session(&client, *id).await?,
            }
        }
        Commands::Chart {
            id,
            kind,
            hover,
            output,
        } => {
            let client = client(&cli).await?;
            let series = client.analysis(*id).await?.chart_data.unwrap_or_default();
            let kind = kind.unwrap_or(series.chart_type);
            let svg = sb_views::render(&series, kind, HoverState::from(*hover));
            match output {
                Some(path) => {
                    tokio::fs::write(path, svg).await?;
                    info!("wrote {} chart to {}", kind, path.display());
                }
                None => println!("{}", svg),
            }
        }
        Commands::Cache { command } => {
            let cache = persistent_cache(&cli).await?;
            match command {
                CacheCommands::List => {
                    for key in cache.keys().await? {
                        println!("{}", key);
                    }
                }
                CacheCommands::Invalidate { key } => {
                    if cache.invalidate(key).await? {
                        println!("removed {}", key);
                    } else {
                        println!("{} was not cached", key);
                    }
                }
                CacheCommands::Clear => {
                    cache.clear().await?;
                    println!("cache cleared");
                }
            }
        }
    }

    Ok(())
}
