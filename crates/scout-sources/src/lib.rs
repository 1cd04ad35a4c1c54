//! Remote source access for Scout: the extraction pipeline, the search
//! aggregator, and the scholarly provider clients behind them.
//!
//! Provides `Extractor` (URL → `ExtractedMetadata`), `SearchAggregator`
//! (query → merged `SearchResult`s), the `SearchProvider` trait, and the
//! arXiv / Semantic Scholar clients.

pub mod arxiv;
pub mod extract;
pub mod html;
pub mod http;
pub mod search;
pub mod semantic_scholar;
pub mod text;

pub use arxiv::{ArxivClient, ArxivEntry};
pub use extract::{classify, route, Extractor, Route};
pub use http::{build_client, HttpSettings, SourceEndpoints};
pub use search::{SearchAggregator, SearchProvider, SearchResponse};
pub use semantic_scholar::SemanticScholarClient;
