//! Drafting quiz questions from course material with a generative model.
//!
//! Model output is untrusted. Every generated item is checked on its own and
//! anything that does not fit a question shape becomes a placeholder MCQ, so
//! a draft always has exactly the requested number of questions for the
//! instructor to review.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use super::MAX_MATCH_PAIRS;
use super::authoring::QuestionDraft;
use super::error::DraftError;
use crate::config::DraftingConfig;

const FALLBACK_QUESTION_TEXT: &str = "Generated question (unrecognized format)";
const FALLBACK_OPTIONS: [&str; 2] = ["Option A", "Option B"];

#[async_trait]
pub trait QuestionDrafter: Send + Sync {
    /// Returns the raw model output for `count` questions about `material`.
    async fn generate(&self, material: &str, count: usize) -> Result<String, DraftError>;
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum GeneratedQuestion {
    #[serde(rename = "MCQ", rename_all = "camelCase")]
    MultipleChoice {
        text: String,
        options: Vec<String>,
        #[serde(default)]
        correct_answer_text: Option<String>,
    },
    #[serde(rename = "MATCH", rename_all = "camelCase")]
    Matching {
        text: String,
        match_pairs: Vec<GeneratedPair>,
    },
}

#[derive(Deserialize, Debug)]
struct GeneratedPair {
    item: String,
    #[serde(rename = "match")]
    match_text: String,
}

#[derive(Deserialize, Debug)]
struct DraftEnvelope {
    #[serde(default)]
    generated_questions: Option<Vec<Value>>,
}

/// Strips a surrounding markdown code fence (with optional language tag).
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    body.trim_start_matches(|c: char| c.is_ascii_alphanumeric())
        .trim()
}

/// Extracts the list of generated items without judging their shape.
pub fn parse_draft_response(raw: &str) -> Result<Vec<Value>, DraftError> {
    let body = strip_code_fence(raw);
    let envelope: DraftEnvelope = serde_json::from_str(body)
        .map_err(|e| DraftError::MalformedResponse(e.to_string()))?;
    match envelope.generated_questions {
        Some(items) if !items.is_empty() => Ok(items),
        _ => Err(DraftError::NoQuestions),
    }
}

/// Turns generated items into exactly `count` editable drafts.
pub fn normalize_generated(items: Vec<Value>, count: usize) -> Vec<QuestionDraft> {
    let mut drafts: Vec<QuestionDraft> = items
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(index, item)| convert_generated(index, item))
        .collect();
    drafts.resize_with(count, QuestionDraft::blank);
    drafts
}

fn convert_generated(index: usize, item: Value) -> QuestionDraft {
    let fallback_text = item
        .get("text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(FALLBACK_QUESTION_TEXT)
        .to_string();

    match serde_json::from_value::<GeneratedQuestion>(item) {
        Ok(GeneratedQuestion::MultipleChoice {
            text,
            options,
            correct_answer_text,
        }) if options.len() >= 2 => {
            let correct = correct_answer_text
                .and_then(|answer| options.iter().position(|option| *option == answer))
                .unwrap_or(0);
            let options: Vec<&str> = options.iter().map(String::as_str).collect();
            QuestionDraft::multiple_choice(text, &options, correct)
        }
        Ok(GeneratedQuestion::Matching { text, match_pairs }) if !match_pairs.is_empty() => {
            let pairs: Vec<(&str, &str)> = match_pairs
                .iter()
                .take(MAX_MATCH_PAIRS)
                .map(|pair| (pair.item.as_str(), pair.match_text.as_str()))
                .collect();
            QuestionDraft::matching(text, &pairs)
        }
        Ok(_) => {
            tracing::warn!(draft.index = index, "Generated question has too few choices");
            QuestionDraft::multiple_choice(fallback_text, &FALLBACK_OPTIONS, 0)
        }
        Err(e) => {
            tracing::warn!(draft.index = index, error = %e, "Generated question has an unknown shape");
            QuestionDraft::multiple_choice(fallback_text, &FALLBACK_OPTIONS, 0)
        }
    }
}

/// Asks the drafter for questions and normalizes whatever comes back.
#[tracing::instrument(skip(drafter, material), fields(material.length = material.len()))]
pub async fn draft_questions(
    drafter: &dyn QuestionDrafter,
    material: &str,
    count: usize,
) -> Result<Vec<QuestionDraft>, DraftError> {
    if material.trim().is_empty() {
        return Err(DraftError::MissingMaterial);
    }

    let raw = drafter.generate(material, count).await?;
    let items = parse_draft_response(&raw)?;
    tracing::info!(draft.generated = items.len(), draft.requested = count, "Drafted questions");
    Ok(normalize_generated(items, count))
}

fn build_prompt(material: &str, count: usize) -> String {
    format!(
        r#"Write {count} quiz questions for a timed classroom quiz, based only on the course material below.
Mix two kinds of questions:
- "MCQ": a question with 3 to 5 distinct answer options, exactly one of them correct.
- "MATCH": an instruction such as "Match each term with its definition." and 3 to 5 item/match pairs.

Answer with a JSON object whose only key is "generated_questions", an array of objects:
- every object has "type" ("MCQ" or "MATCH") and "text";
- an MCQ object has "options" (array of strings) and "correctAnswerText" (a string equal to one of the options);
- a MATCH object has "matchPairs" (array of {{"item": string, "match": string}}).

Example:
{{"generated_questions": [
  {{"type": "MCQ", "text": "Which planet is closest to the Sun?", "options": ["Venus", "Mercury", "Mars"], "correctAnswerText": "Mercury"}},
  {{"type": "MATCH", "text": "Match each element with its symbol.", "matchPairs": [{{"item": "Gold", "match": "Au"}}, {{"item": "Iron", "match": "Fe"}}]}}
]}}

Course material:
---
{material}
---"#
    )
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Deserialize, Debug)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiDrafter {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl std::fmt::Debug for GeminiDrafter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiDrafter")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GeminiDrafter {
    pub fn from_config(config: &DraftingConfig) -> Result<Self, DraftError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl QuestionDrafter for GeminiDrafter {
    async fn generate(&self, material: &str, count: usize) -> Result<String, DraftError> {
        let api_key = self.api_key.as_deref().ok_or(DraftError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(material, count) }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        tracing::debug!(drafting.model = %self.model, "Requesting question draft");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error body".to_string());
            tracing::error!(
                http.status = %status,
                drafting.model = %self.model,
                "Drafting request was rejected"
            );
            return Err(DraftError::Api {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let parsed = response.json::<GenerateContentResponse>().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(DraftError::MalformedResponse(
                "response contained no text".to_string(),
            ));
        }
        Ok(text)
    }
}
