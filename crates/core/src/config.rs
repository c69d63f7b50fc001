use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::session::Language;
use crate::negotiation::ladder::{ConcessionPolicy, RoundingMode};

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub negotiation: ConcessionPolicy,
    pub language: LanguageConfig,
    pub interpreter: InterpreterConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageConfig {
    pub default: Language,
    /// Distinct local-language words the first message needs to lock the
    /// session to the local language.
    pub detection_threshold: usize,
}

/// Thresholds for reading a bare small number as thousands ("150" -> 150,000).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterpreterConfig {
    pub upscale_min_reference: Decimal,
    pub upscale_max_bare_number: Decimal,
    pub upscale_min_share: Decimal,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub rounding: Option<RoundingMode>,
    pub default_language: Option<Language>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self { default: Language::English, detection_threshold: 2 }
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            upscale_min_reference: Decimal::from(100_000),
            upscale_max_bare_number: Decimal::from(10_000),
            upscale_min_share: Decimal::new(5, 1),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bazaar.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(negotiation) = patch.negotiation {
            let policy = &mut self.negotiation;
            if let Some(rounding) = negotiation.rounding {
                policy.rounding = rounding;
            }
            if let Some(opening_ratio) = negotiation.opening_ratio {
                policy.opening_ratio = opening_ratio;
            }
            if let Some(mid_ratio) = negotiation.mid_ratio {
                policy.mid_ratio = mid_ratio;
            }
            if let Some(floor_ratio) = negotiation.floor_ratio {
                policy.floor_ratio = floor_ratio;
            }
            if let Some(engagement_ratio) = negotiation.engagement_ratio {
                policy.engagement_ratio = engagement_ratio;
            }
            if let Some(concession_guard_ratio) = negotiation.concession_guard_ratio {
                policy.concession_guard_ratio = concession_guard_ratio;
            }
        }

        if let Some(language) = patch.language {
            if let Some(default) = language.default {
                self.language.default = default;
            }
            if let Some(detection_threshold) = language.detection_threshold {
                self.language.detection_threshold = detection_threshold;
            }
        }

        if let Some(interpreter) = patch.interpreter {
            if let Some(upscale_min_reference) = interpreter.upscale_min_reference {
                self.interpreter.upscale_min_reference = upscale_min_reference;
            }
            if let Some(upscale_max_bare_number) = interpreter.upscale_max_bare_number {
                self.interpreter.upscale_max_bare_number = upscale_max_bare_number;
            }
            if let Some(upscale_min_share) = interpreter.upscale_min_share {
                self.interpreter.upscale_min_share = upscale_min_share;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BAZAAR_NEGOTIATION_ROUNDING") {
            self.negotiation.rounding = parse_env("BAZAAR_NEGOTIATION_ROUNDING", &value)?;
        }
        if let Some(value) = read_env("BAZAAR_NEGOTIATION_OPENING_RATIO") {
            self.negotiation.opening_ratio = parse_env("BAZAAR_NEGOTIATION_OPENING_RATIO", &value)?;
        }
        if let Some(value) = read_env("BAZAAR_NEGOTIATION_MID_RATIO") {
            self.negotiation.mid_ratio = parse_env("BAZAAR_NEGOTIATION_MID_RATIO", &value)?;
        }
        if let Some(value) = read_env("BAZAAR_NEGOTIATION_FLOOR_RATIO") {
            self.negotiation.floor_ratio = parse_env("BAZAAR_NEGOTIATION_FLOOR_RATIO", &value)?;
        }
        if let Some(value) = read_env("BAZAAR_NEGOTIATION_ENGAGEMENT_RATIO") {
            self.negotiation.engagement_ratio =
                parse_env("BAZAAR_NEGOTIATION_ENGAGEMENT_RATIO", &value)?;
        }
        if let Some(value) = read_env("BAZAAR_NEGOTIATION_CONCESSION_GUARD_RATIO") {
            self.negotiation.concession_guard_ratio =
                parse_env("BAZAAR_NEGOTIATION_CONCESSION_GUARD_RATIO", &value)?;
        }

        if let Some(value) = read_env("BAZAAR_LANGUAGE_DEFAULT") {
            self.language.default = parse_env("BAZAAR_LANGUAGE_DEFAULT", &value)?;
        }
        if let Some(value) = read_env("BAZAAR_LANGUAGE_DETECTION_THRESHOLD") {
            self.language.detection_threshold =
                parse_env("BAZAAR_LANGUAGE_DETECTION_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("BAZAAR_INTERPRETER_UPSCALE_MIN_REFERENCE") {
            self.interpreter.upscale_min_reference =
                parse_env("BAZAAR_INTERPRETER_UPSCALE_MIN_REFERENCE", &value)?;
        }
        if let Some(value) = read_env("BAZAAR_INTERPRETER_UPSCALE_MAX_BARE_NUMBER") {
            self.interpreter.upscale_max_bare_number =
                parse_env("BAZAAR_INTERPRETER_UPSCALE_MAX_BARE_NUMBER", &value)?;
        }
        if let Some(value) = read_env("BAZAAR_INTERPRETER_UPSCALE_MIN_SHARE") {
            self.interpreter.upscale_min_share =
                parse_env("BAZAAR_INTERPRETER_UPSCALE_MIN_SHARE", &value)?;
        }

        let log_level = read_env("BAZAAR_LOGGING_LEVEL").or_else(|| read_env("BAZAAR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BAZAAR_LOGGING_FORMAT").or_else(|| read_env("BAZAAR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(rounding) = overrides.rounding {
            self.negotiation.rounding = rounding;
        }
        if let Some(default_language) = overrides.default_language {
            self.language.default = default_language;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_negotiation(&self.negotiation)?;
        validate_language(&self.language)?;
        validate_interpreter(&self.interpreter)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bazaar.toml"), PathBuf::from("config/bazaar.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_negotiation(policy: &ConcessionPolicy) -> Result<(), ConfigError> {
    let ordered = Decimal::ZERO < policy.engagement_ratio
        && policy.engagement_ratio < policy.floor_ratio
        && policy.floor_ratio < policy.mid_ratio
        && policy.mid_ratio < policy.opening_ratio
        && policy.opening_ratio <= Decimal::ONE;
    if !ordered {
        return Err(ConfigError::Validation(format!(
            "negotiation ratios must satisfy 0 < engagement_ratio < floor_ratio < mid_ratio < opening_ratio <= 1 (got {} < {} < {} < {})",
            policy.engagement_ratio, policy.floor_ratio, policy.mid_ratio, policy.opening_ratio
        )));
    }

    if policy.concession_guard_ratio < policy.opening_ratio
        || policy.concession_guard_ratio > Decimal::ONE
    {
        return Err(ConfigError::Validation(
            "negotiation.concession_guard_ratio must be in range opening_ratio..=1".to_string(),
        ));
    }

    Ok(())
}

fn validate_language(language: &LanguageConfig) -> Result<(), ConfigError> {
    if language.detection_threshold == 0 {
        return Err(ConfigError::Validation(
            "language.detection_threshold must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_interpreter(interpreter: &InterpreterConfig) -> Result<(), ConfigError> {
    if interpreter.upscale_min_reference <= Decimal::ZERO
        || interpreter.upscale_max_bare_number <= Decimal::ZERO
    {
        return Err(ConfigError::Validation(
            "interpreter.upscale_min_reference and interpreter.upscale_max_bare_number must be positive"
                .to_string(),
        ));
    }

    if interpreter.upscale_min_share <= Decimal::ZERO
        || interpreter.upscale_min_share > Decimal::ONE
    {
        return Err(ConfigError::Validation(
            "interpreter.upscale_min_share must be in range (0, 1]".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    negotiation: Option<NegotiationPatch>,
    language: Option<LanguagePatch>,
    interpreter: Option<InterpreterPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct NegotiationPatch {
    rounding: Option<RoundingMode>,
    opening_ratio: Option<Decimal>,
    mid_ratio: Option<Decimal>,
    floor_ratio: Option<Decimal>,
    engagement_ratio: Option<Decimal>,
    concession_guard_ratio: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LanguagePatch {
    default: Option<Language>,
    detection_threshold: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct InterpreterPatch {
    upscale_min_reference: Option<Decimal>,
    upscale_max_bare_number: Option<Decimal>,
    upscale_min_share: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
