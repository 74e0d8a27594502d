//! Persona prompts keyed by author display name

use serde::Deserialize;
use std::collections::HashMap;

/// Placeholder replaced by the author's message in template personas
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

/// How a persona frames the author's message before it goes to the model
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaPrompt {
    /// Ask the model to roast the message
    Insult,
    /// Ask the model to praise the message
    Compliment,
    /// Free-form prompt; `{message}` is replaced by the message content
    Template(String),
}

impl PersonaPrompt {
    /// Build the completion prompt for `content`
    pub fn render(&self, content: &str) -> String {
        match self {
            PersonaPrompt::Insult => format!("Insult this \"{}\"", content),
            PersonaPrompt::Compliment => {
                format!("Give an over the top compliment about this \"{}\"", content)
            }
            PersonaPrompt::Template(template) if template.contains(MESSAGE_PLACEHOLDER) => {
                template.replace(MESSAGE_PLACEHOLDER, content)
            }
            PersonaPrompt::Template(template) => format!("{} \"{}\"", template, content),
        }
    }
}

/// Author display name to persona mapping
#[derive(Debug, Clone)]
pub struct PersonaTable {
    personas: HashMap<String, PersonaPrompt>,
}

impl PersonaTable {
    /// Table with no personas at all
    pub fn empty() -> Self {
        Self {
            personas: HashMap::new(),
        }
    }

    /// Add or replace the persona for `author_name`
    pub fn insert(&mut self, author_name: impl Into<String>, prompt: PersonaPrompt) {
        self.personas.insert(author_name.into(), prompt);
    }

    /// Merge entries, replacing existing names
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, PersonaPrompt)>) {
        self.personas.extend(entries);
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, author_name: &str) -> Option<&PersonaPrompt> {
        self.personas.get(author_name)
    }

    /// Prompt for `author_name` if they have a persona
    pub fn prompt_for(&self, author_name: &str, content: &str) -> Option<String> {
        self.get(author_name).map(|persona| persona.render(content))
    }

    /// Number of configured personas
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// True when no personas are configured
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl Default for PersonaTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert("pryceless3", PersonaPrompt::Insult);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insult_prompt_embeds_message() {
        let table = PersonaTable::default();
        let prompt = table.prompt_for("pryceless3", "nice shirt").unwrap();
        assert!(prompt.contains("Insult this \"nice shirt\""));
    }

    #[test]
    fn test_lookup_is_exact() {
        let table = PersonaTable::default();
        assert!(table.prompt_for("Pryceless3", "hi").is_none());
        assert!(table.prompt_for("pryceless", "hi").is_none());
        assert!(table.prompt_for("someone_else", "hi").is_none());
    }

    #[test]
    fn test_template_rendering() {
        let with_placeholder = PersonaPrompt::Template("Rhyme with {message} please".to_string());
        assert_eq!(with_placeholder.render("cat"), "Rhyme with cat please");

        let without = PersonaPrompt::Template("Translate to French:".to_string());
        assert_eq!(without.render("hello"), "Translate to French: \"hello\"");
    }

    #[test]
    fn test_extend_replaces_existing() {
        let mut table = PersonaTable::default();
        table.extend([("pryceless3".to_string(), PersonaPrompt::Compliment)]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("pryceless3"), Some(&PersonaPrompt::Compliment));
    }

    #[test]
    fn test_empty_table() {
        let table = PersonaTable::empty();
        assert!(table.is_empty());
        assert!(table.prompt_for("pryceless3", "x").is_none());
    }
}
