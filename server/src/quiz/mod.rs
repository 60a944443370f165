use serde::{Deserialize, Serialize};

pub mod authoring;
pub mod countdown;
pub mod drafting;
pub mod error;
pub mod link;
pub mod payload;
pub mod scoring;
pub mod session;
pub mod text_codec;

pub use error::{DraftError, PayloadError, SessionError, ValidationErrors, ValidationIssue};
pub use payload::{decode_quiz, encode_quiz, load_playable_quiz};
pub use scoring::{ScoreOutcome, ScoringRules};
pub use session::{QuizSession, SessionPhase};
pub use text_codec::{decode_text, encode_text};

pub const FIXED_ROOM_CODE: &str = "123a";
pub const DEFAULT_TIME_PER_QUESTION: u32 = 30;
pub const MIN_TIME_PER_QUESTION: u32 = 5;
pub const NUMBER_OF_QUESTIONS: usize = 10;
pub const MAX_MATCH_PAIRS: usize = 6;

/// Max points for a correct answer given instantly.
pub const CORRECT_ANSWER_SCORE: f64 = 10.0;
pub const INCORRECT_ANSWER_PENALTY: f64 = -10.0;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    #[serde(rename = "MCQ")]
    MultipleChoice,
    #[serde(rename = "MATCH")]
    Matching,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct McqOption {
    pub id: String,
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MatchPair {
    pub id: String,
    pub item: String,
    #[serde(rename = "match")]
    pub match_text: String,
}

/// A question as carried inside a payload. Every free-text field holds a
/// text-codec token; ids are plain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_per_question: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<McqOption>>,
    #[serde(
        rename = "correctAnswerMCQ",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub correct_answer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_pairs: Option<Vec<MatchPair>>,
    /// Shuffled once when the link is generated; never reshuffled on decode.
    #[serde(
        rename = "matchOptions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub match_pool: Option<Vec<String>>,
}

impl Question {
    /// Seconds allowed for this question; a missing or zero value falls back.
    pub fn time_limit(&self, fallback: u32) -> u32 {
        self.time_per_question
            .filter(|seconds| *seconds > 0)
            .unwrap_or(fallback)
    }

    pub fn pair_count(&self) -> usize {
        self.match_pairs.as_ref().map_or(0, Vec::len)
    }

    /// Decoded, answer-free projection handed to a player.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            question_type: self.question_type,
            text: decode_text(&self.text),
            options: self
                .options
                .iter()
                .flatten()
                .map(|option| OptionView {
                    id: option.id.clone(),
                    text: decode_text(&option.text),
                })
                .collect(),
            items: self
                .match_pairs
                .iter()
                .flatten()
                .map(|pair| decode_text(&pair.item))
                .collect(),
            match_pool: self
                .match_pool
                .iter()
                .flatten()
                .map(|entry| decode_text(entry))
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub time_per_question: u32,
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Copies the quiz-level time limit onto every question that lacks one.
    pub fn fill_question_time_limits(&mut self) {
        let quiz_time = self.time_per_question;
        for question in &mut self.questions {
            if question.time_per_question.filter(|t| *t > 0).is_none() {
                question.time_per_question = Some(quiz_time);
            }
        }
    }
}

/// A student's response: a plain option id for MCQ, or the decoded match text
/// chosen for each item, in item order, for MATCH.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Answer {
    Choice(String),
    Matches(Vec<String>),
}

impl Answer {
    /// The answer recorded when the countdown runs out.
    pub fn unanswered(question: &Question) -> Self {
        match question.question_type {
            QuestionType::MultipleChoice => Answer::Choice(String::new()),
            QuestionType::Matching => Answer::Matches(vec![String::new(); question.pair_count()]),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswer {
    pub question_id: String,
    pub answer: Answer,
    pub time_taken: f64,
    pub score: f64,
    pub is_correct: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OptionView {
    pub id: String,
    pub text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<OptionView>,
    pub items: Vec<String>,
    pub match_pool: Vec<String>,
}
