// Declare submodules
mod common;
mod fact_check;
mod summarization;
mod trends;

pub use common::{PromptTemplate, DONT_TELL_ME, PLAIN_LANGUAGE};
pub use fact_check::fact_check_template;
pub use summarization::summary_template;
pub use trends::{join_summaries, trends_template, SUMMARY_SEPARATOR};
