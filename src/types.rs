use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language the wiki content is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WikiLanguage {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "zh")]
    Mandarin,
    #[serde(rename = "zh-tw")]
    TraditionalChinese,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "kr")]
    Korean,
    #[serde(rename = "vi")]
    Vietnamese,
    #[serde(rename = "pt-br")]
    BrazilianPortuguese,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ru")]
    Russian,
}

impl WikiLanguage {
    pub const ALL: [WikiLanguage; 10] = [
        WikiLanguage::English,
        WikiLanguage::Japanese,
        WikiLanguage::Mandarin,
        WikiLanguage::TraditionalChinese,
        WikiLanguage::Spanish,
        WikiLanguage::Korean,
        WikiLanguage::Vietnamese,
        WikiLanguage::BrazilianPortuguese,
        WikiLanguage::French,
        WikiLanguage::Russian,
    ];

    /// Short code accepted on the command line
    pub fn code(&self) -> &'static str {
        match self {
            WikiLanguage::English => "en",
            WikiLanguage::Japanese => "ja",
            WikiLanguage::Mandarin => "zh",
            WikiLanguage::TraditionalChinese => "zh-tw",
            WikiLanguage::Spanish => "es",
            WikiLanguage::Korean => "kr",
            WikiLanguage::Vietnamese => "vi",
            WikiLanguage::BrazilianPortuguese => "pt-br",
            WikiLanguage::French => "fr",
            WikiLanguage::Russian => "ru",
        }
    }

    /// Name used inside prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            WikiLanguage::English => "English",
            WikiLanguage::Japanese => "Japanese (日本語)",
            WikiLanguage::Mandarin => "Mandarin Chinese (中文)",
            WikiLanguage::TraditionalChinese => "Traditional Chinese (繁體中文)",
            WikiLanguage::Spanish => "Spanish (Español)",
            WikiLanguage::Korean => "Korean (한국어)",
            WikiLanguage::Vietnamese => "Vietnamese (Tiếng Việt)",
            WikiLanguage::BrazilianPortuguese => "Brazilian Portuguese (Português Brasileiro)",
            WikiLanguage::French => "Français (French)",
            WikiLanguage::Russian => "Русский (Russian)",
        }
    }
}

impl FromStr for WikiLanguage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        WikiLanguage::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| ValidationError::UnsupportedLanguage(s.to_string()))
    }
}

impl fmt::Display for WikiLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Owner and name of a hosted repository, parsed from its URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse `https://host/owner/name(.git)(/)` or a bare `owner/name`
    pub fn parse(url: &str) -> Result<Self, ValidationError> {
        let trimmed = url.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let mut segments = trimmed.rsplit('/').filter(|s| !s.is_empty());
        let name = segments.next();
        let owner = segments.next();

        match (owner, name) {
            (Some(owner), Some(name)) if !owner.ends_with(':') => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(ValidationError::InvalidRepositoryUrl(url.to_string())),
        }
    }

    /// `owner/name`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// State carried from the retrieval step to the answering step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalState {
    /// The user's question
    pub question: String,
    /// Retrieved chunk texts joined by a horizontal-rule separator; empty when
    /// the question was empty or nothing matched
    pub context: String,
}

impl RetrievalState {
    pub fn has_context(&self) -> bool {
        !self.context.is_empty()
    }
}

/// Request to generate (or load) the wiki for one repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Repository URL to clone
    pub repo_url: String,
    /// Language of the generated content
    #[serde(default)]
    pub language: WikiLanguage,
    /// Ask for the sectioned structure instead of a flat page list
    #[serde(default)]
    pub comprehensive: bool,
}

#[cfg(test)]
mod tests;
