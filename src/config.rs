use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub gemini_api_keys: Vec<String>,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub gemini_max_output_tokens: u32,
    pub gemini_timeout_secs: u64,
    pub generation: GenerationPolicy,
}

/// Retry and acceptance knobs for the generation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    /// Minimum fraction of the requested total that must be real (non-placeholder) questions.
    pub plausibility_threshold: f64,
    pub call_timeout: Duration,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
            plausibility_threshold: 0.5,
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl GenerationPolicy {
    /// Exponential backoff for the given zero-based attempt.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let gemini_api_keys = collect_api_keys(|name| env::var(name).ok());
        if gemini_api_keys.is_empty() {
            return Err(Error::Config(
                "No Gemini API key found. Set GEMINI_API_KEY or GEMINI_API_KEY_1, GEMINI_API_KEY_2, ..."
                    .to_string(),
            ));
        }

        let gemini_timeout_secs = get_env_parse_or("GEMINI_TIMEOUT_SECS", 60)?;

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:3000"),
            gemini_api_keys,
            gemini_api_url: get_env_or(
                "GEMINI_API_URL",
                "https://generativelanguage.googleapis.com/v1",
            ),
            gemini_model: get_env_or("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_max_output_tokens: get_env_parse_or("GEMINI_MAX_OUTPUT_TOKENS", 8000)?,
            gemini_timeout_secs,
            generation: GenerationPolicy {
                max_retries: get_env_parse_or("GENERATION_MAX_RETRIES", 3)?,
                backoff_base_ms: get_env_parse_or("GENERATION_BACKOFF_BASE_MS", 1000)?,
                plausibility_threshold: check_threshold(get_env_parse_or(
                    "GENERATION_PLAUSIBILITY_THRESHOLD",
                    0.5,
                )?)?,
                call_timeout: Duration::from_secs(gemini_timeout_secs),
            },
        })
    }
}

/// Numbered keys win; numbering stops at the first gap. The bare key is a fallback.
pub fn collect_api_keys<F>(lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut keys = Vec::new();
    let mut index = 1;
    while let Some(key) = lookup(&format!("GEMINI_API_KEY_{}", index)) {
        let key = key.trim().to_string();
        if key.is_empty() {
            break;
        }
        keys.push(key);
        index += 1;
    }

    if keys.is_empty() {
        if let Some(key) = lookup("GEMINI_API_KEY").map(|k| k.trim().to_string()) {
            if !key.is_empty() {
                keys.push(key);
            }
        }
    }

    keys
}

/// The plausibility threshold is a fraction of the requested total.
fn check_threshold(value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::Config(format!(
            "GENERATION_PLAUSIBILITY_THRESHOLD must be between 0.0 and 1.0, got {}",
            value
        )))
    }
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn numbered_keys_are_collected_in_order() {
        let keys = collect_api_keys(lookup_from(&[
            ("GEMINI_API_KEY_1", "first"),
            ("GEMINI_API_KEY_2", "second"),
            ("GEMINI_API_KEY", "bare"),
        ]));
        assert_eq!(keys, vec!["first", "second"]);
    }

    #[test]
    fn numbering_stops_at_first_gap() {
        let keys = collect_api_keys(lookup_from(&[
            ("GEMINI_API_KEY_1", "first"),
            ("GEMINI_API_KEY_3", "third"),
        ]));
        assert_eq!(keys, vec!["first"]);
    }

    #[test]
    fn bare_key_is_the_fallback() {
        let keys = collect_api_keys(lookup_from(&[("GEMINI_API_KEY", " only ")]));
        assert_eq!(keys, vec!["only"]);
        assert!(collect_api_keys(lookup_from(&[])).is_empty());
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = GenerationPolicy {
            backoff_base_ms: 1000,
            ..GenerationPolicy::default()
        };
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(8000));
    }

    #[test]
    fn plausibility_threshold_must_be_a_fraction() {
        assert_eq!(check_threshold(0.0).unwrap(), 0.0);
        assert_eq!(check_threshold(1.0).unwrap(), 1.0);
        assert!(matches!(check_threshold(1.5), Err(Error::Config(_))));
        assert!(matches!(check_threshold(-0.1), Err(Error::Config(_))));
        assert!(check_threshold(f64::NAN).is_err());
    }
}
