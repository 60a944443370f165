use super::error::PayloadError;
use super::text_codec::{encode_text, try_decode_text};
use super::Quiz;

/// Serializes a quiz whose text fields are already encoded into the single
/// token carried by the `data` query parameter.
pub fn encode_quiz(quiz: &Quiz) -> String {
    match serde_json::to_string(quiz) {
        Ok(json) => encode_text(&json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize quiz payload");
            String::new()
        }
    }
}

/// Reverses [`encode_quiz`]. Questions without their own time limit inherit
/// the quiz-level one. Returns `None` for anything that is not a quiz token.
#[tracing::instrument(skip(payload), fields(payload.length = payload.len()))]
pub fn decode_quiz(payload: &str) -> Option<Quiz> {
    if payload.trim().is_empty() {
        return None;
    }

    let json = match try_decode_text(payload) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Quiz payload is not a valid token");
            return None;
        }
    };

    let mut quiz: Quiz = match serde_json::from_str(&json) {
        Ok(quiz) => quiz,
        Err(e) => {
            tracing::warn!(error = %e, "Quiz payload does not contain a quiz");
            return None;
        }
    };

    quiz.fill_question_time_limits();
    tracing::debug!(
        quiz.question_count = quiz.questions.len(),
        quiz.time_per_question = quiz.time_per_question,
        "Decoded quiz payload"
    );
    Some(quiz)
}

/// Decodes the `data` parameter and rejects quizzes that cannot be played.
pub fn load_playable_quiz(data: Option<&str>) -> Result<Quiz, PayloadError> {
    let data = data
        .filter(|value| !value.trim().is_empty())
        .ok_or(PayloadError::MissingData)?;
    let quiz = decode_quiz(data).ok_or(PayloadError::Undecodable)?;
    if quiz.questions.is_empty() {
        tracing::warn!("Rejecting quiz payload without questions");
        return Err(PayloadError::NoQuestions);
    }
    Ok(quiz)
}
