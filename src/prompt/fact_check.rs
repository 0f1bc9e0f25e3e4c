use crate::prompt::common::{PromptTemplate, DONT_TELL_ME};

/// Fact-check of generated text against its grounding source.
/// Variables: `source`, `candidate`.
pub fn fact_check_template() -> PromptTemplate {
    PromptTemplate::new(format!(
        r#"You are a fact-checking assistant.

## SOURCE TEXT (authoritative):
----------
{{source}}
----------

## CANDIDATE TEXT (to check):
----------
{{candidate}}
----------

Identify every statement in the candidate text that is NOT supported by the source text.
Respond with ONLY a JSON object containing two fields:
  "score": the number of unsupported statements,
  "issues": a list of the unsupported statements, quoted from the candidate text.

Example: {{"score": 2, "issues": ["first unsupported statement", "second unsupported statement"]}}
If every statement is supported, respond with {{"score": 0, "issues": []}}.
{dont_tell_me}"#,
        dont_tell_me = DONT_TELL_ME
    ))
}
