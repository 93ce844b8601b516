//! Document profiles.
//!
//! A profile names the structural keywords of a document, the locator of its
//! introductory block, the fixed "no answer" and "no sources" sentences and
//! the prompt set used to talk to the model.

use charter_core::config::RagSettings;
use charter_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Keyword preceding a Roman numeral, e.g. "Chapter"
    pub chapter_keyword: String,
    /// Keyword preceding an integer and a period, e.g. "Article"
    pub article_keyword: String,
    pub introduction_citation: String,
    pub sentinel: String,
    pub no_sources: String,
    pub contextualize_prompt: String,
    pub answer_prompt: String,
}

impl Profile {
    pub fn english() -> Self {
        Self {
            name: "english".to_string(),
            chapter_keyword: "Chapter".to_string(),
            article_keyword: "Article".to_string(),
            introduction_citation: "Introduction and preamble".to_string(),
            sentinel: "Unfortunately I do not know the answer".to_string(),
            no_sources: "No sources".to_string(),
            contextualize_prompt: "rag.contextualize".to_string(),
            answer_prompt: "rag.answer".to_string(),
        }
    }

    pub fn polish() -> Self {
        Self {
            name: "polish".to_string(),
            chapter_keyword: "Rozdział".to_string(),
            article_keyword: "Art.".to_string(),
            introduction_citation: "Wstęp i preambuła".to_string(),
            sentinel: "Niestety nie znam odpowiedzi".to_string(),
            no_sources: "Brak źródeł".to_string(),
            contextualize_prompt: "rag.contextualize.pl".to_string(),
            answer_prompt: "rag.answer.pl".to_string(),
        }
    }

    pub fn by_name(name: &str) -> AppResult<Self> {
        match name.to_lowercase().as_str() {
            "english" | "en" => Ok(Self::english()),
            "polish" | "pl" => Ok(Self::polish()),
            other => Err(AppError::Config(format!(
                "Unknown document profile: {}",
                other
            ))),
        }
    }

    /// Resolve the configured profile and apply sentence overrides.
    pub fn from_settings(rag: &RagSettings) -> AppResult<Self> {
        let mut profile = Self::by_name(&rag.profile)?;
        if let Some(ref sentinel) = rag.sentinel {
            profile.sentinel = sentinel.clone();
        }
        if let Some(ref no_sources) = rag.no_sources {
            profile.no_sources = no_sources.clone();
        }
        Ok(profile)
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::english()
    }
}
