use std::{path::PathBuf, time::Duration};

use chatgpt::config::ChatGPTEngine;
use thiserror::Error;

use crate::quiz::bank::DatasetLocation;

pub const DEFAULT_DATASET_REPO: &str = "snegha24/Tamil_tnpscExam";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_QUIZ_SIZE: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Settings read from the environment (and `.env`, loaded by `main`).
pub struct Config {
    pub chatgpt_api_key: String,
    pub chatgpt_engine: ChatGPTEngine,
    pub chatgpt_timeout: Duration,
    pub dataset: DatasetLocation,
    pub practice_quiz_size: usize,
    pub generated_quiz_size: usize,
    /// Sqlite file keeping dialogues across restarts, in-memory when unset.
    pub dialogue_db: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let chatgpt_api_key = lookup("CHATGPT_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("CHATGPT_API_KEY"))?;

        let chatgpt_engine = match lookup("CHATGPT_ENGINE").as_deref() {
            None | Some("gpt-3.5-turbo") => ChatGPTEngine::Gpt35Turbo,
            Some("gpt-4") => ChatGPTEngine::Gpt4,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "CHATGPT_ENGINE",
                    value: other.to_string(),
                })
            }
        };

        let timeout_secs = positive(&lookup, "CHATGPT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        let dataset = match lookup("QUIZ_DATASET_FILE") {
            Some(path) => DatasetLocation::File(PathBuf::from(path)),
            None => DatasetLocation::Hub {
                repo: lookup("QUIZ_DATASET_REPO")
                    .unwrap_or_else(|| DEFAULT_DATASET_REPO.to_string()),
            },
        };

        Ok(Self {
            chatgpt_api_key,
            chatgpt_engine,
            chatgpt_timeout: Duration::from_secs(timeout_secs),
            dataset,
            practice_quiz_size: positive(&lookup, "PRACTICE_QUIZ_SIZE", DEFAULT_QUIZ_SIZE)?,
            generated_quiz_size: positive(&lookup, "GENERATED_QUIZ_SIZE", DEFAULT_QUIZ_SIZE)?,
            dialogue_db: lookup("DIALOGUE_DB"),
        })
    }
}

fn positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = lookup(name) else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_need_only_the_api_key() {
        let config = config(&[("CHATGPT_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.chatgpt_api_key, "sk-test");
        assert!(matches!(config.chatgpt_engine, ChatGPTEngine::Gpt35Turbo));
        assert_eq!(config.chatgpt_timeout, Duration::from_secs(30));
        assert_eq!(
            config.dataset,
            DatasetLocation::Hub {
                repo: DEFAULT_DATASET_REPO.to_string()
            }
        );
        assert_eq!(config.practice_quiz_size, 10);
        assert_eq!(config.generated_quiz_size, 10);
        assert_eq!(config.dialogue_db, None);
    }

    #[test]
    fn missing_api_key_is_reported() {
        assert!(matches!(
            config(&[]),
            Err(ConfigError::Missing("CHATGPT_API_KEY"))
        ));
        assert!(matches!(
            config(&[("CHATGPT_API_KEY", "  ")]),
            Err(ConfigError::Missing("CHATGPT_API_KEY"))
        ));
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("CHATGPT_API_KEY", "sk-test"),
            ("CHATGPT_ENGINE", "gpt-4"),
            ("CHATGPT_TIMEOUT_SECS", "15"),
            ("QUIZ_DATASET_FILE", "questions.json"),
            ("PRACTICE_QUIZ_SIZE", "5"),
            ("GENERATED_QUIZ_SIZE", " 15 "),
            ("DIALOGUE_DB", "db.sqlite"),
        ])
        .unwrap();
        assert!(matches!(config.chatgpt_engine, ChatGPTEngine::Gpt4));
        assert_eq!(config.chatgpt_timeout, Duration::from_secs(15));
        assert_eq!(
            config.dataset,
            DatasetLocation::File(PathBuf::from("questions.json"))
        );
        assert_eq!(config.practice_quiz_size, 5);
        assert_eq!(config.generated_quiz_size, 15);
        assert_eq!(config.dialogue_db.as_deref(), Some("db.sqlite"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (name, value) in [
            ("PRACTICE_QUIZ_SIZE", "0"),
            ("GENERATED_QUIZ_SIZE", "ten"),
            ("CHATGPT_TIMEOUT_SECS", "-1"),
            ("CHATGPT_ENGINE", "davinci"),
        ] {
            let result = config(&[("CHATGPT_API_KEY", "sk-test"), (name, value)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { name: n, .. }) if n == name),
                "{} = {} should be rejected",
                name,
                value
            );
        }
    }
}
