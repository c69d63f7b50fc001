use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

/// Reply language. `English` is the default language, `Swahili` the local one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Swahili,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Swahili => "sw",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "swahili" | "kiswahili" | "sw" => Ok(Self::Swahili),
            other => Err(format!("unsupported language `{other}` (expected english|swahili)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub buyer_id: String,
    pub product_id: ProductId,
}

impl SessionKey {
    pub fn new(buyer_id: impl Into<String>, product_id: ProductId) -> Self {
        Self { buyer_id: buyer_id.into(), product_id }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.buyer_id, self.product_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Buyer,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn buyer(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Buyer, text: text.into(), recorded_at: Utc::now() }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Agent, text: text.into(), recorded_at: Utc::now() }
    }
}

/// Per buyer × product conversation state.
///
/// `language` is `None` until the first buyer message has been seen and is
/// never changed afterwards. The transcript is for display and replay only;
/// pricing decisions never read it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationSession {
    pub key: SessionKey,
    pub language: Option<Language>,
    pub transcript: Vec<TranscriptEntry>,
}

impl NegotiationSession {
    pub fn new(key: SessionKey) -> Self {
        Self { key, language: None, transcript: Vec::new() }
    }

    /// Locks the reply language if it has not been locked yet and returns
    /// the effective language.
    pub fn lock_language(&mut self, detected: Language) -> Language {
        *self.language.get_or_insert(detected)
    }

    pub fn record(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
    }
}
