use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bazaar_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use toml::Value;

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
    overridden: bool,
}

impl Field {
    fn new(
        key_path: &'static str,
        env_keys: &'static [&'static str],
        value: String,
        overridden: bool,
    ) -> Self {
        Self { key_path, env_keys, value, overridden }
    }
}

pub fn run(options: LoadOptions) -> String {
    let overrides = options.overrides.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in fields(&config, &overrides) {
        let source = if field.overridden {
            "flag".to_string()
        } else {
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            )
        };
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig, overrides: &ConfigOverrides) -> Vec<Field> {
    let negotiation = &config.negotiation;
    let field = Field::new;

    vec![
        field(
            "negotiation.rounding",
            &["BAZAAR_NEGOTIATION_ROUNDING"],
            format!("{:?}", negotiation.rounding),
            overrides.rounding.is_some(),
        ),
        field(
            "negotiation.opening_ratio",
            &["BAZAAR_NEGOTIATION_OPENING_RATIO"],
            negotiation.opening_ratio.to_string(),
            false,
        ),
        field(
            "negotiation.mid_ratio",
            &["BAZAAR_NEGOTIATION_MID_RATIO"],
            negotiation.mid_ratio.to_string(),
            false,
        ),
        field(
            "negotiation.floor_ratio",
            &["BAZAAR_NEGOTIATION_FLOOR_RATIO"],
            negotiation.floor_ratio.to_string(),
            false,
        ),
        field(
            "negotiation.engagement_ratio",
            &["BAZAAR_NEGOTIATION_ENGAGEMENT_RATIO"],
            negotiation.engagement_ratio.to_string(),
            false,
        ),
        field(
            "negotiation.concession_guard_ratio",
            &["BAZAAR_NEGOTIATION_CONCESSION_GUARD_RATIO"],
            negotiation.concession_guard_ratio.to_string(),
            false,
        ),
        field(
            "language.default",
            &["BAZAAR_LANGUAGE_DEFAULT"],
            format!("{:?}", config.language.default),
            overrides.default_language.is_some(),
        ),
        field(
            "language.detection_threshold",
            &["BAZAAR_LANGUAGE_DETECTION_THRESHOLD"],
            config.language.detection_threshold.to_string(),
            false,
        ),
        field(
            "interpreter.upscale_min_reference",
            &["BAZAAR_INTERPRETER_UPSCALE_MIN_REFERENCE"],
            config.interpreter.upscale_min_reference.to_string(),
            false,
        ),
        field(
            "interpreter.upscale_max_bare_number",
            &["BAZAAR_INTERPRETER_UPSCALE_MAX_BARE_NUMBER"],
            config.interpreter.upscale_max_bare_number.to_string(),
            false,
        ),
        field(
            "interpreter.upscale_min_share",
            &["BAZAAR_INTERPRETER_UPSCALE_MIN_SHARE"],
            config.interpreter.upscale_min_share.to_string(),
            false,
        ),
        field(
            "logging.level",
            &["BAZAAR_LOGGING_LEVEL", "BAZAAR_LOG_LEVEL"],
            config.logging.level.clone(),
            overrides.log_level.is_some(),
        ),
        field(
            "logging.format",
            &["BAZAAR_LOGGING_FORMAT", "BAZAAR_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
            overrides.log_format.is_some(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("bazaar.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/bazaar.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
