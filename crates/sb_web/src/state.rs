use std::sync::Arc;

use sb_inference::Analyst;
use sb_scrapers::SourceManager;

pub struct AppState {
    pub sources: Arc<SourceManager>,
    pub analyst: Analyst,
}

impl AppState {
    pub fn new(sources: Arc<SourceManager>, analyst: Analyst) -> Self {
        Self { sources, analyst }
    }
}
