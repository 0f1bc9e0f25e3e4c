//! Publication date resolution for PubMed records.
//!
//! A record can carry a date in several places. [`DATE_STRATEGIES`] lists
//! them from most to least preferred; [`resolve_pub_date`] returns the first
//! one that yields a valid calendar date.

use chrono::NaiveDate;
use roxmltree::Node;

/// Reads one candidate date location from a `PubmedArticle` node.
pub type DateStrategy = fn(Node<'_, '_>) -> Option<NaiveDate>;

pub const DATE_STRATEGIES: &[(&str, DateStrategy)] = &[
    ("DateCreated", date_created),
    ("JournalIssue/PubDate", journal_issue_date),
    ("DateRevised", date_revised),
    ("History/PubMedPubDate[pubmed]", history_pubmed_date),
];

pub fn resolve_pub_date(article: Node) -> Option<NaiveDate> {
    DATE_STRATEGIES
        .iter()
        .find_map(|(_, strategy)| strategy(article))
}

fn date_created(article: Node) -> Option<NaiveDate> {
    child_path(article, &["MedlineCitation", "DateCreated"]).and_then(full_date)
}

fn journal_issue_date(article: Node) -> Option<NaiveDate> {
    child_path(
        article,
        &["MedlineCitation", "Article", "Journal", "JournalIssue", "PubDate"],
    )
    .and_then(partial_date)
}

fn date_revised(article: Node) -> Option<NaiveDate> {
    child_path(article, &["MedlineCitation", "DateRevised"]).and_then(full_date)
}

fn history_pubmed_date(article: Node) -> Option<NaiveDate> {
    child_path(article, &["PubmedData", "History"])?
        .children()
        .filter(|n| n.has_tag_name("PubMedPubDate"))
        .find(|n| n.attribute("PubStatus") == Some("pubmed"))
        .and_then(partial_date)
}

/// Year, month and day must all be present.
fn full_date(node: Node) -> Option<NaiveDate> {
    let year = child_text(node, "Year")?.parse().ok()?;
    let month = parse_month(child_text(node, "Month")?)?;
    let day = child_text(node, "Day")?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Year is required; a missing month or day counts as 1.
fn partial_date(node: Node) -> Option<NaiveDate> {
    let year = child_text(node, "Year")?.parse().ok()?;
    let month = match child_text(node, "Month") {
        Some(raw) => parse_month(raw)?,
        None => 1,
    };
    let day = match child_text(node, "Day") {
        Some(raw) => raw.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Accepts `1`..`12`, `01`, or an English month name or abbreviation (`Jan`, `March`).
pub fn parse_month(raw: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];

    let raw = raw.trim();
    if let Ok(number) = raw.parse::<u32>() {
        return (1..=12).contains(&number).then_some(number);
    }
    let prefix = raw.get(..3)?.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|index| index as u32 + 1)
}

pub(crate) fn child_path<'a, 'input>(node: Node<'a, 'input>, path: &[&str]) -> Option<Node<'a, 'input>> {
    path.iter().try_fold(node, |current, name| {
        current.children().find(|n| n.has_tag_name(*name))
    })
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
