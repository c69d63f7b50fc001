use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use bazaar_core::config::{InterpreterConfig, LanguageConfig};
use bazaar_core::domain::session::Language;
use bazaar_core::negotiation::BuyerInput;

const ENGLISH_REQUEST_KEYWORDS: &[&str] =
    &["reduce", "lower", "final price", "best price", "discount"];

const SWAHILI_REQUEST_KEYWORDS: &[&str] =
    &["punguza", "punguzo", "shusha", "bei ya mwisho", "bei ya chini", "nafuu", "ghali"];

/// Words that mark a first message as written in Swahili. Kept apart from
/// the request keywords: these identify the language, not the intent.
const SWAHILI_VOCABULARY: &[&str] = &[
    "habari", "jambo", "mambo", "karibu", "asante", "tafadhali", "rafiki", "bei", "gani",
    "sana", "nataka", "naomba", "nipe", "shilingi", "elfu", "laki", "hii", "hiyo", "kwa",
    "mimi", "wewe", "sawa", "hapana", "ndiyo", "kiasi", "bado", "ghali", "nunua", "kununua",
    "kubwa", "ndogo", "zaidi",
];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OfferParseError {
    #[error("numeric token `{token}` has no digits")]
    NoDigits { token: String },
    #[error("numeric token `{token}` is not a valid amount")]
    Malformed { token: String },
    #[error("numeric token `{token}` is too large")]
    Overflow { token: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Magnitude {
    Thousand,
    Million,
}

impl Magnitude {
    fn multiplier(self) -> Decimal {
        match self {
            Self::Thousand => Decimal::from(1_000),
            Self::Million => Decimal::from(1_000_000),
        }
    }
}

/// Turns buyer messages into [`BuyerInput`] and detects the session language.
#[derive(Clone, Debug)]
pub struct OfferInterpreter {
    upscale: InterpreterConfig,
    language: LanguageConfig,
}

impl Default for OfferInterpreter {
    fn default() -> Self {
        Self::new(InterpreterConfig::default(), LanguageConfig::default())
    }
}

impl OfferInterpreter {
    pub fn new(upscale: InterpreterConfig, language: LanguageConfig) -> Self {
        Self { upscale, language }
    }

    pub fn interpret(&self, text: &str, reference_price: Decimal, language: Language) -> BuyerInput {
        match self.parse_offer(text, reference_price) {
            Ok(Some((amount, echo))) => return BuyerInput::ExplicitOffer { amount, echo },
            Ok(None) => {}
            Err(error) => {
                debug!(
                    event_name = "negotiation.offer.unparseable",
                    error = %error,
                    "numeric token could not be read as an offer"
                );
                return BuyerInput::Unparseable;
            }
        }

        let normalized_text = normalize_text(text);
        let asks_for_lower_price = request_keywords(language)
            .iter()
            .any(|keyword| normalized_text.contains(keyword));

        if asks_for_lower_price {
            BuyerInput::SoftRequest
        } else {
            BuyerInput::Unparseable
        }
    }

    /// Reads the first numeric token in `text`. Returns the amount together
    /// with the token as typed.
    pub fn parse_offer(
        &self,
        text: &str,
        reference_price: Decimal,
    ) -> Result<Option<(Decimal, String)>, OfferParseError> {
        let Some(captures) = number_token().and_then(|pattern| pattern.captures(text)) else {
            return Ok(None);
        };
        let Some(whole) = captures.get(0) else {
            return Ok(None);
        };
        let token = whole.as_str().trim().to_string();
        let digits = captures.get(1).map_or("", |digits| digits.as_str());
        let magnitude = captures.get(2).and_then(|suffix| {
            match suffix.as_str().to_ascii_lowercase().as_str() {
                "k" => Some(Magnitude::Thousand),
                "m" => Some(Magnitude::Million),
                _ => None,
            }
        });

        let amount = parse_amount(digits, magnitude, &token)?;
        let amount = match magnitude {
            None if self.reads_as_thousands(amount, reference_price) => amount
                .checked_mul(Decimal::from(1_000))
                .ok_or_else(|| OfferParseError::Overflow { token: token.clone() })?,
            _ => amount,
        };

        Ok(Some((amount, token)))
    }

    /// A bare "150" against a 150,000 listing most likely means 150,000.
    fn reads_as_thousands(&self, amount: Decimal, reference_price: Decimal) -> bool {
        let upscale = &self.upscale;
        reference_price >= upscale.upscale_min_reference
            && amount < upscale.upscale_max_bare_number
            && amount * Decimal::from(1_000) >= reference_price * upscale.upscale_min_share
    }

    /// Language for a session's first message: the local language when the
    /// message uses enough distinct local words, the default otherwise.
    pub fn detect_language(&self, text: &str) -> Language {
        let words = text
            .split(|character: char| !character.is_alphabetic())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect::<BTreeSet<_>>();

        let hits = words.iter().filter(|word| SWAHILI_VOCABULARY.contains(&word.as_str())).count();

        if hits >= self.language.detection_threshold {
            Language::Swahili
        } else {
            self.language.default
        }
    }
}

fn number_token() -> Option<&'static Regex> {
    static NUMBER_TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    NUMBER_TOKEN
        .get_or_init(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)(?:\s?([kKmM])\b)?").ok())
        .as_ref()
}

fn parse_amount(
    digits: &str,
    magnitude: Option<Magnitude>,
    token: &str,
) -> Result<Decimal, OfferParseError> {
    let stripped = digits.replace(',', "");
    if !stripped.chars().any(|character| character.is_ascii_digit()) {
        return Err(OfferParseError::NoDigits { token: token.to_string() });
    }

    let amount = Decimal::from_str(&stripped)
        .map_err(|_| OfferParseError::Malformed { token: token.to_string() })?;

    match magnitude {
        Some(magnitude) => amount
            .checked_mul(magnitude.multiplier())
            .ok_or_else(|| OfferParseError::Overflow { token: token.to_string() }),
        None => Ok(amount),
    }
}

fn request_keywords(language: Language) -> &'static [&'static str] {
    match language {
        Language::English => ENGLISH_REQUEST_KEYWORDS,
        Language::Swahili => SWAHILI_REQUEST_KEYWORDS,
    }
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}
