use crate::prompt::common::{PromptTemplate, DONT_TELL_ME, PLAIN_LANGUAGE};

/// Layperson summary of one abstract. Variables: `abstract`.
pub fn summary_template() -> PromptTemplate {
    PromptTemplate::new(format!(
        r#"You are a helpful assistant tasked with summarizing biomedical research abstracts in plain English.

## ABSTRACT:
----------
{{abstract}}
----------

Write a single paragraph summary of the abstract above for a general audience.
Where the abstract covers them, explain the epidemiology, risk factors, diagnostics,
progression and prevention it describes. Only use information found in the abstract.
{plain_language}
{dont_tell_me}"#,
        plain_language = PLAIN_LANGUAGE,
        dont_tell_me = DONT_TELL_ME
    ))
}
