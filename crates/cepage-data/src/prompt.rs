//! Prompt templating.
//!
//! A template is a plain string with two placeholders: `{labels}` (the
//! allowed enumeration, comma-joined) and `{text}` (the review body).

use anyhow::Result;

use cepage_core::LabelSet;

/// Default classification prompt.
const DEFAULT_TEMPLATE: &str = "\
You are a wine expert. Based on the following review, identify the grape \
variety. Answer with exactly one of: {labels}.

Review: {text}";

/// A prompt template with `{labels}` and `{text}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { template: DEFAULT_TEMPLATE.to_string() }
    }
}

impl PromptTemplate {
    /// Create a template.  `{text}` is required; `{labels}` is optional for
    /// unconstrained prompts.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        anyhow::ensure!(
            template.contains("{text}"),
            "prompt template must contain a {{text}} placeholder"
        );
        Ok(Self { template })
    }

    /// Render the prompt for one review.
    pub fn render(&self, text: &str, labels: &LabelSet) -> String {
        self.template
            .replace("{labels}", &labels.as_slice().join(", "))
            .replace("{text}", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_text_and_labels() {
        let template = PromptTemplate::new("Pick one of {labels} for: {text}").unwrap();
        let labels = LabelSet::new(["Merlot", "Syrah"]);
        assert_eq!(
            template.render("dark fruit, soft tannin", &labels),
            "Pick one of Merlot, Syrah for: dark fruit, soft tannin"
        );
    }

    #[test]
    fn template_without_text_placeholder_is_rejected() {
        assert!(PromptTemplate::new("no placeholder here").is_err());
    }

    #[test]
    fn default_template_mentions_both_placeholders() {
        let labels = LabelSet::new(["Gamay"]);
        let rendered = PromptTemplate::default().render("bright cherry", &labels);
        assert!(rendered.contains("Gamay"));
        assert!(rendered.contains("bright cherry"));
        assert!(!rendered.contains("{text}"));
        assert!(!rendered.contains("{labels}"));
    }
}
