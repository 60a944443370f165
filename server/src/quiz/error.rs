use std::fmt;
use thiserror::Error;

/// Route a player is sent back to when a link cannot be played.
pub const RECOVERY_ROUTE: &str = "/create";

#[derive(Debug, Error)]
pub enum TextCodecError {
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded bytes are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Invalid quiz link or data not found. Please go back and create a new quiz.")]
    MissingData,
    #[error("Invalid quiz link or data not found. Please go back and create a new quiz.")]
    Undecodable,
    #[error("Quiz contains no questions.")]
    NoQuestions,
}

impl PayloadError {
    pub fn recovery_route(&self) -> &'static str {
        RECOVERY_ROUTE
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("The quiz has no questions.")]
    NoQuestions,
    #[error("Question {0} text is empty.")]
    EmptyText(usize),
    #[error("Question {0} (MCQ) must have at least 2 options.")]
    TooFewOptions(usize),
    #[error("Question {0} (MCQ) has an empty option.")]
    EmptyOption(usize),
    #[error("Question {0} (MCQ) has duplicate options.")]
    DuplicateOptions(usize),
    #[error("Question {0} (MCQ) has options with missing or repeated ids.")]
    BadOptionIds(usize),
    #[error("Question {0} (MCQ) correct answer is not selected.")]
    MissingCorrectAnswer(usize),
    #[error("Question {0} (MCQ) correct answer does not match any option.")]
    UnknownCorrectAnswer(usize),
    #[error("Question {0} (Match) must have at least 1 pair.")]
    NoPairs(usize),
    #[error("Question {0} (Match) can have at most {1} pairs.")]
    TooManyPairs(usize, usize),
    #[error("Question {0} (Match) has an empty item or match in a pair.")]
    EmptyPair(usize),
}

impl ValidationIssue {
    /// 1-based number of the offending question, if the issue is per question.
    pub fn question_number(&self) -> Option<usize> {
        match self {
            ValidationIssue::NoQuestions => None,
            ValidationIssue::EmptyText(n)
            | ValidationIssue::TooFewOptions(n)
            | ValidationIssue::EmptyOption(n)
            | ValidationIssue::DuplicateOptions(n)
            | ValidationIssue::BadOptionIds(n)
            | ValidationIssue::MissingCorrectAnswer(n)
            | ValidationIssue::UnknownCorrectAnswer(n)
            | ValidationIssue::NoPairs(n)
            | ValidationIssue::TooManyPairs(n, _)
            | ValidationIssue::EmptyPair(n) => Some(*n),
        }
    }
}

/// Every problem found in a quiz draft. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl ValidationErrors {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.split_first() {
            Some((first, [])) => write!(f, "{first}"),
            Some((first, rest)) => write!(f, "{first} ({} more issues)", rest.len()),
            None => write!(f, "Quiz draft is invalid."),
        }
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Please provide some course material to draft questions from.")]
    MissingMaterial,
    #[error("Question drafting is not configured: no API key is set.")]
    MissingApiKey,
    #[error("Drafting request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Drafting service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Drafting service returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("The drafting service did not return any questions. Try refining the course material.")]
    NoQuestions,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid Room Code. Please check and try again.")]
    InvalidRoomCode,
    #[error("The room has already been entered.")]
    AlreadyEntered,
    #[error("No question is currently being played.")]
    NotInProgress,
    #[error("An answer has already been recorded for this question.")]
    AlreadyAnswered,
    #[error("The current question has not been answered yet.")]
    NotAnswered,
}
