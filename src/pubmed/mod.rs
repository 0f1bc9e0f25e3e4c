//! PubMed source adapter.
//!
//! Searches NCBI E-utilities for a date range and turns the returned XML into
//! [`ArticleRecord`]s.

mod client;
pub mod dates;
mod parser;
mod types;

pub use self::client::{parse_esearch_body, with_retry, PubMedClient, SourceAdapter};
pub use self::parser::parse_efetch_xml;
pub use self::types::*;
