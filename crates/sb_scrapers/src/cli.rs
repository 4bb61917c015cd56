use clap::{Args, Subcommand};
use sb_core::Result;
use serde::Serialize;

use crate::manager::SourceManager;

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Scrape the Task Book research highlights
    Highlights,
    /// Scrape the Task Book bibliography search
    Research,
    /// Fetch and extract the body of a catalog article
    Article {
        /// Row index in the publication catalog
        id: usize,
    },
    /// Scrape any supported URL
    Url { url: String },
    /// List available scrapers
    List,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn handle_command(args: ScraperArgs, manager: &SourceManager) -> Result<()> {
    match args.command {
        ScraperCommands::Highlights => {
            let highlights = manager.highlights().await?;
            print_json(&serde_json::json!({ "highlights": highlights }))
        }
        ScraperCommands::Research => {
            let results = manager.research().await?;
            print_json(&serde_json::json!({ "results": results }))
        }
        ScraperCommands::Article { id } => print_json(&manager.article_content(id).await?),
        ScraperCommands::Url { url } => print_json(&manager.scrape_url(&url).await?),
        ScraperCommands::List => {
            println!("Available scrapers:");
            for line in scraper_listing(manager) {
                println!("  {}", line);
            }
            Ok(())
        }
    }
}

fn scraper_listing(manager: &SourceManager) -> Vec<String> {
    manager
        .scrapers()
        .iter()
        .map(|s| format!("{} ({})", s.source(), s.cli_names().join(", ")))
        .collect()
}
