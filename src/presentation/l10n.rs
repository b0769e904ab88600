//! Translation of the literal strings rendered on community pages.

use std::collections::HashMap;

/// Text domain for every string the community layer renders.
pub const TEXT_DOMAIN: &str = "buddypress";

pub trait Localizer: Send + Sync {
    fn translate(&self, text: &str, domain: &str) -> String;

    /// `text` with its single `%s` placeholder split out, so the caller can
    /// place (and escape) the substituted value itself.
    fn translate_around(&self, text: &str, domain: &str) -> (String, String) {
        let translated = self.translate(text, domain);
        match translated.split_once("%s") {
            Some((before, after)) => (before.to_string(), after.to_string()),
            None => (translated, String::new()),
        }
    }
}

/// Returns every string untranslated.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLocalizer;

impl Localizer for IdentityLocalizer {
    fn translate(&self, text: &str, _domain: &str) -> String {
        text.to_string()
    }
}

/// Fixed message catalog; strings it does not know pass through.
#[derive(Debug, Clone, Default)]
pub struct CatalogLocalizer {
    messages: HashMap<String, String>,
}

impl CatalogLocalizer {
    pub fn new(messages: HashMap<String, String>) -> Self {
        Self { messages }
    }

    pub fn with(mut self, source: &str, translated: &str) -> Self {
        self.messages
            .insert(source.to_string(), translated.to_string());
        self
    }
}

impl Localizer for CatalogLocalizer {
    fn translate(&self, text: &str, _domain: &str) -> String {
        self.messages
            .get(text)
            .cloned()
            .unwrap_or_else(|| text.to_string())
    }
}
