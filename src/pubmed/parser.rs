//! EFetch XML parsing.

use roxmltree::{Document, Node, ParsingOptions};
use serde_json::json;
use tracing::debug;

use super::dates::{child_path, resolve_pub_date};
use super::types::ArticleRecord;
use crate::db::core::format_date;
use crate::TARGET_WEB_REQUEST;

/// Parses an `efetch.fcgi?retmode=xml` document into article records.
///
/// Only a document that is not well-formed XML is an error. Missing fields in
/// an individual `PubmedArticle` become empty strings (or an absent date), so
/// one odd record never costs the rest of the batch.
pub fn parse_efetch_xml(xml: &str) -> Result<Vec<ArticleRecord>, roxmltree::Error> {
    // EFetch responses start with a DOCTYPE declaration.
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)?;
    let records: Vec<ArticleRecord> = doc
        .descendants()
        .filter(|n| n.has_tag_name("PubmedArticle"))
        .map(|article| parse_article(article, xml))
        .collect();

    debug!(target: TARGET_WEB_REQUEST, "Parsed {} PubmedArticle records", records.len());
    Ok(records)
}

fn parse_article(article: Node, xml: &str) -> ArticleRecord {
    let external_id = child_path(article, &["MedlineCitation", "PMID"])
        .map(node_text)
        .unwrap_or_default();
    let title = child_path(article, &["MedlineCitation", "Article", "ArticleTitle"])
        .map(node_text)
        .unwrap_or_default();
    let abstract_text = child_path(article, &["MedlineCitation", "Article", "Abstract"])
        .map(|node| {
            node.children()
                .filter(|n| n.has_tag_name("AbstractText"))
                .map(node_text)
                .filter(|fragment| !fragment.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let pub_date = resolve_pub_date(article);

    if pub_date.is_none() {
        debug!(target: TARGET_WEB_REQUEST, "No parsable publication date for PMID={}", external_id);
    }

    let raw_payload = json!({
        "pmid": external_id,
        "title": title,
        "abstract": abstract_text,
        "pub_date": format_date(pub_date),
        "xml": &xml[article.range()],
    });

    ArticleRecord {
        external_id,
        title,
        abstract_text,
        pub_date,
        raw_payload,
    }
}

/// All text beneath `node`, including text inside inline markup such as `<i>`.
fn node_text(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}
