use crate::error::{ConfigError, Result as AppResult};
use crate::player::PlayerSettings;
use crate::quiz::{
    CORRECT_ANSWER_SCORE, DEFAULT_TIME_PER_QUESTION, FIXED_ROOM_CODE, INCORRECT_ANSWER_PENALTY,
    NUMBER_OF_QUESTIONS, ScoringRules,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(deserialize_with = "deserialize_string_or_list")]
    pub cors_origins: Vec<String>,
    /// Origin and path of the front-end that share links point at.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizConfig {
    pub room_code: String,
    pub default_time_per_question: u32,
    pub question_count: usize,
    pub correct_answer_score: f64,
    pub incorrect_answer_penalty: f64,
    pub answer_ack_delay_ms: u64,
    pub timeout_ack_delay_ms: u64,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            room_code: FIXED_ROOM_CODE.to_string(),
            default_time_per_question: DEFAULT_TIME_PER_QUESTION,
            question_count: NUMBER_OF_QUESTIONS,
            correct_answer_score: CORRECT_ANSWER_SCORE,
            incorrect_answer_penalty: INCORRECT_ANSWER_PENALTY,
            answer_ack_delay_ms: 1200,
            timeout_ack_delay_ms: 1500,
        }
    }
}

impl QuizConfig {
    pub fn scoring_rules(&self) -> ScoringRules {
        ScoringRules {
            correct_max: self.correct_answer_score,
            incorrect_penalty: self.incorrect_answer_penalty,
            default_time_per_question: self.default_time_per_question,
        }
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            rules: self.scoring_rules(),
            room_code: self.room_code.clone(),
            answer_ack_delay: Duration::from_millis(self.answer_ack_delay_ms),
            timeout_ack_delay: Duration::from_millis(self.timeout_ack_delay_ms),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct DraftingConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for DraftingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftingConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct AppSettings {
    pub server: ServerConfig,
    pub quiz: QuizConfig,
    pub drafting: DraftingConfig,
}

impl AppSettings {
    pub fn public_base_url(&self) -> AppResult<Url> {
        Url::parse(&self.server.public_base_url).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "server.public_base_url '{}': {}",
                self.server.public_base_url, e
            ))
            .into()
        })
    }

    fn validate(&self) -> AppResult<()> {
        if self.quiz.room_code.trim().is_empty() {
            return Err(ConfigError::InvalidValue("quiz.room_code must not be empty".to_string()).into());
        }
        if self.quiz.default_time_per_question == 0 {
            return Err(ConfigError::InvalidValue(
                "quiz.default_time_per_question must be positive".to_string(),
            )
            .into());
        }
        self.public_base_url()?;
        Ok(())
    }
}

pub fn load_settings() -> AppResult<AppSettings> {
    let quiz_defaults = QuizConfig::default();
    let drafting_defaults = DraftingConfig::default();

    let settings = Config::builder()
        .set_default("server.port", 8080_i64)?
        .set_default("server.cors_origins", "http://localhost:5173")?
        .set_default("server.public_base_url", "http://localhost:5173/")?
        .set_default("quiz.room_code", quiz_defaults.room_code)?
        .set_default(
            "quiz.default_time_per_question",
            i64::from(quiz_defaults.default_time_per_question),
        )?
        .set_default("quiz.question_count", quiz_defaults.question_count as i64)?
        .set_default("quiz.correct_answer_score", quiz_defaults.correct_answer_score)?
        .set_default(
            "quiz.incorrect_answer_penalty",
            quiz_defaults.incorrect_answer_penalty,
        )?
        .set_default("quiz.answer_ack_delay_ms", quiz_defaults.answer_ack_delay_ms as i64)?
        .set_default("quiz.timeout_ack_delay_ms", quiz_defaults.timeout_ack_delay_ms as i64)?
        .set_default("drafting.model", drafting_defaults.model)?
        .set_default("drafting.endpoint", drafting_defaults.endpoint)?
        .set_default("drafting.timeout_secs", drafting_defaults.timeout_secs as i64)?
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix("QUIZLINK")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let settings: AppSettings = settings
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    settings.validate()?;
    Ok(settings)
}

/// Accepts either a comma-separated string or a list of strings.
fn deserialize_string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    let items: Vec<String> = match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(arr) => arr
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                _ => Err(D::Error::custom("Array must contain only strings")),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(D::Error::custom("Expected string or array of strings")),
    };
    Ok(items)
}
