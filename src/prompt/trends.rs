use crate::prompt::common::{PromptTemplate, DONT_TELL_ME, PLAIN_LANGUAGE};

/// Separator placed between summaries in the grounding corpus.
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// Cross-article trend narrative. Variables: `summaries`.
pub fn trends_template() -> PromptTemplate {
    PromptTemplate::new(format!(
        r#"You are a research analyst. Below are layperson summaries of research abstracts, in order of publication date.

## SUMMARIES:
----------
{{summaries}}
----------

Write a "Trends in Research" article suitable for a general audience based on the summaries above.
* Highlight key similarities, differences, and patterns over time.
* Ground every claim in these summaries; do not introduce outside facts.
* Use headings only where they make the article easier to follow.
{plain_language}
{dont_tell_me}"#,
        plain_language = PLAIN_LANGUAGE,
        dont_tell_me = DONT_TELL_ME
    ))
}

/// Joins summaries into the text the narrative is both written from and checked against.
pub fn join_summaries<S: AsRef<str>>(summaries: &[S]) -> String {
    summaries
        .iter()
        .map(|summary| summary.as_ref())
        .collect::<Vec<&str>>()
        .join(SUMMARY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_summaries_keeps_order() {
        assert_eq!(join_summaries(&["first", "second"]), "first\n\nsecond");
        assert_eq!(join_summaries::<&str>(&[]), "");
    }
}
