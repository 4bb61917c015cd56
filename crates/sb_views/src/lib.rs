//! Client-side views over fetched collections: fuzzy search, categorical
//! filters with pagination, and chart rendering.

pub mod charts;
pub mod filter;
pub mod search;

pub use charts::{render, HoverState, PALETTE};
pub use filter::{apply, paginate, Categorized, Facet, Filters, Page, Query, Selection, PAGE_SIZE};
pub use search::{FuzzyMatcher, Searchable, DEFAULT_THRESHOLD};
