/*!
 * Prompt templates for batch and free-form translation.
 *
 * Batch prompts embed every item as a numbered list and ask for a numbered
 * list back, one translation per line.
 */

use crate::providers::ChatPrompt;
use crate::translation::client::BatchItem;

use super::{encode_line_breaks, LINE_BREAK};

/// System prompt template with language placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// System role for every translation request.
    pub const TRANSLATION_EXPERT: &'static str = "You are a professional translation expert. \
Translate from {source_language} to {target_language} accurately and naturally. \
Return only the translations, without explanations or notes.";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default translation expert template.
    pub fn translation_expert() -> Self {
        Self::new(Self::TRANSLATION_EXPERT)
    }

    /// Render the template with the given variables.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::translation_expert()
    }
}

/// Builder for numbered batch prompts.
///
/// Language arguments are display names, not codes.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    source_language: String,
    target_language: String,
    reference_language: Option<String>,
    items: Vec<BatchItem>,
    glossary: Vec<(String, String)>,
    template: PromptTemplate,
}

impl TranslationPromptBuilder {
    /// Create a new prompt builder.
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            reference_language: None,
            items: Vec::new(),
            glossary: Vec::new(),
            template: PromptTemplate::default(),
        }
    }

    /// Set the language reference translations are written in.
    pub fn with_reference_language(mut self, language: Option<&str>) -> Self {
        self.reference_language = language.map(str::to_string);
        self
    }

    /// Set the items to translate.
    pub fn with_items(mut self, items: &[BatchItem]) -> Self {
        self.items = items.to_vec();
        self
    }

    /// Set glossary terms the translation must respect.
    pub fn with_glossary(mut self, terms: Vec<(String, String)>) -> Self {
        self.glossary = terms;
        self
    }

    /// Replace the system prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Build the system prompt.
    pub fn build_system_prompt(&self) -> String {
        self.template.render(&self.source_language, &self.target_language)
    }

    fn has_references(&self) -> bool {
        self.reference_language.is_some() && self.items.iter().any(|item| item.reference.is_some())
    }

    /// Build the user prompt with the numbered items.
    pub fn build_user_prompt(&self) -> String {
        let mut prompt = format!(
            "Translate the following {} texts from {} into {}.\n",
            self.items.len(),
            self.source_language,
            self.target_language
        );

        if self.has_references() {
            if let Some(reference) = &self.reference_language {
                prompt.push_str(&format!(
                    "Some texts come with a {} reference translation; keep your translation consistent with it.\n",
                    reference
                ));
            }
        }

        if !self.glossary.is_empty() {
            prompt.push_str("Use these glossary terms:\n");
            for (term, translation) in &self.glossary {
                prompt.push_str(&format!("- {} → {}\n", term, translation));
            }
        }

        if self.items.iter().any(|item| item.text.contains('\n')) {
            prompt.push_str(&format!(
                "Line breaks inside a text are written as {}; keep them in the translation.\n",
                LINE_BREAK
            ));
        }

        prompt.push_str("Return only the translations as a numbered list, one per line, in this format:\n");
        prompt.push_str("1. [translation]\n2. [translation]\n\nTexts:\n");

        let entries: Vec<String> = self.items.iter().enumerate()
            .map(|(index, item)| self.format_item(index + 1, item))
            .collect();
        prompt.push('\n');
        prompt.push_str(&entries.join("\n\n"));
        prompt
    }

    fn format_item(&self, number: usize, item: &BatchItem) -> String {
        let mut entry = format!("{}. {} text: {}", number, self.source_language, encode_line_breaks(&item.text));
        if let (Some(reference_language), Some(reference)) = (&self.reference_language, &item.reference) {
            entry.push_str(&format!(
                "\n   {} reference: {}",
                reference_language,
                encode_line_breaks(reference)
            ));
        }
        entry
    }

    /// Build the complete prompt pair.
    pub fn build(&self) -> ChatPrompt {
        ChatPrompt {
            system: self.build_system_prompt(),
            user: self.build_user_prompt(),
        }
    }
}

/// Build the prompt for one free-form text segment.
pub fn build_text_prompt(
    text: &str,
    source_language: &str,
    target_language: &str,
    glossary: &[(String, String)],
) -> ChatPrompt {
    let mut user = format!("Translate the following text from {} into {}.\n", source_language, target_language);
    if !glossary.is_empty() {
        user.push_str("Use these glossary terms:\n");
        for (term, translation) in glossary {
            user.push_str(&format!("- {} → {}\n", term, translation));
        }
    }
    user.push_str("Return only the translated text.\n\n");
    user.push_str(text);

    ChatPrompt {
        system: PromptTemplate::default().render(source_language, target_language),
        user,
    }
}
