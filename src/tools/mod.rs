//! External tools used by the research pipeline.
//!
//! Only web search lives here today; see [`search`].

pub mod search;

pub use search::{SearchHit, SearchProvider, SearchResponse, TavilySearch};

#[cfg(feature = "duckduckgo")]
pub use search::DuckDuckGoSearch;
