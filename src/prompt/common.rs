use std::borrow::Cow;

// Common text blocks for all prompts
pub const DONT_TELL_ME: &str = r#"
Important instructions for your responses:

1. Do not narrate or describe your actions.
2. Do not summarize or restate the instructions I've given you.
3. Do not preface your responses with phrases like "Here's a summary..." or "I will now..."
4. Do not acknowledge or confirm that you understand these instructions.
5. Simply proceed with the task directly, without any meta-commentary.
6. Avoid phrases like "As an AI language model..." or similar self-referential statements.
"#;

pub const PLAIN_LANGUAGE: &str = r#"
Language Standards for Output:
1. Write in clear American English for a general audience.
2. Define every medical or technical term the first time it is used.
3. Prefer active voice and short-to-medium length sentences.
4. Do not add facts, numbers, or conclusions that are not in the provided text.
"#;

/// A prompt with `{name}` placeholders filled in at invocation time.
///
/// Placeholders without a matching variable are left untouched, so literal
/// braces such as JSON examples survive rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    template: Cow<'static, str>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<Cow<'static, str>>) -> Self {
        PromptTemplate {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitutes placeholders in a single pass; substituted values are
    /// never scanned again.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let source = self.template.as_ref();
        let mut rendered = String::with_capacity(source.len());
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after_open = &rest[open + 1..];
            let replacement = after_open.find('}').and_then(|close| {
                let name = &after_open[..close];
                vars.iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (*value, close))
            });

            match replacement {
                Some((value, close)) => {
                    rendered.push_str(value);
                    rest = &after_open[close + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = after_open;
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }
}
