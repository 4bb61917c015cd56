pub mod cli;
pub mod logging;
pub mod manager;
pub mod scrapers;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use logging::{init_logging, Logger};
pub use manager::{SourceManager, SourcesConfig};
pub use scrapers::Scraper;

pub mod prelude {
    pub use super::manager::{SourceManager, SourcesConfig};
    pub use super::scrapers::{ArticleCatalog, OsdrClient, PageFetcher, Scraper, TaskBookScraper};
    pub use sb_core::{Error, Highlight, ResearchRecord, Result};
}
