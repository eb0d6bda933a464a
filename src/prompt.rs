//! Prompt construction.
//!
//! The template fixes the output schema textually and asks for `null` (or
//! `[]`) rather than omitted keys, since the normalizer works against a
//! fixed key set. The excerpt is substituted for [`PLACEHOLDER`].

use anyhow::{Context, Result};

use crate::config::PromptConfig;

/// Token replaced by the excerpt text.
pub const PLACEHOLDER: &str = "{TEXT}";

pub const DEFAULT_TEMPLATE: &str = r#"You extract structured metadata from the FIRST pages of an academic/technical paper.
Return ONLY valid JSON. No markdown. No explanations.

Schema:
{
  "title": string|null,
  "authors": string[],
  "year": integer|null,
  "abstract": string|null,
  "keywords": string[],
  "categories": string[]
}

Rules:
- If a field is missing, use null (or [] for arrays).
- "keywords" should be 3-12 short phrases.
- "categories" should be 2-8 broad areas (e.g., "NLP", "Information Retrieval", "Databases").
- "authors" should be best-effort names only (no affiliations).

TEXT:
{TEXT}
"#;

/// Substitute `excerpt` into `template`.
pub fn build(template: &str, excerpt: &str) -> String {
    template.replace(PLACEHOLDER, excerpt)
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Built-in template, or the file named by `prompt.template_path`.
    pub fn from_config(config: &PromptConfig) -> Result<Self> {
        match &config.template_path {
            Some(path) => {
                let template = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read prompt template: {}", path.display())
                })?;
                Ok(Self::new(template))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn build(&self, excerpt: &str) -> String {
        build(&self.template, excerpt)
    }
}
