use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::error::{Result as WebResult, WebError};
use crate::quiz::authoring::{PublishedQuiz, QuestionDraft, QuizDraft, publish};
use crate::quiz::drafting::draft_questions;
use crate::quiz::load_playable_quiz;
use crate::state::AppState;

/// Query carrying a quiz payload, as found after `#/play?` in a share link.
#[derive(Deserialize, Debug, Default)]
pub struct PlayQuery {
    pub data: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub question_count: usize,
    pub time_per_question: u32,
}

#[derive(Deserialize, Debug)]
pub struct DraftRequest {
    pub material: String,
    pub count: Option<usize>,
}

#[derive(Serialize, Debug)]
pub struct DraftResponse {
    pub questions: Vec<QuestionDraft>,
}

pub async fn publish_quiz_handler(
    State(app_state): State<AppState>,
    Json(draft): Json<QuizDraft>,
) -> WebResult<Json<PublishedQuiz>> {
    tracing::info!(
        quiz.question_count = draft.questions.len(),
        "HTTP: Received publish request"
    );
    let published = publish(&draft, &app_state.public_base_url).map_err(|errors| {
        tracing::info!(validation.issue_count = errors.issues().len(), "Quiz draft rejected");
        WebError::from(errors)
    })?;
    Ok(Json(published))
}

pub async fn quiz_template_handler(State(app_state): State<AppState>) -> Json<QuizDraft> {
    let mut draft = QuizDraft::blank(app_state.question_count);
    draft.time_per_question = app_state.default_time_per_question;
    Json(draft)
}

pub async fn check_quiz_handler(Query(query): Query<PlayQuery>) -> WebResult<Json<QuizSummary>> {
    let quiz = load_playable_quiz(query.data.as_deref())?;
    Ok(Json(QuizSummary {
        question_count: quiz.questions.len(),
        time_per_question: quiz.time_per_question,
    }))
}

pub async fn draft_questions_handler(
    State(app_state): State<AppState>,
    Json(request): Json<DraftRequest>,
) -> WebResult<Json<DraftResponse>> {
    let count = request.count.unwrap_or(app_state.question_count);
    if count == 0 || count > app_state.question_count.max(1) * 5 {
        return Err(WebError::BadRequest(format!(
            "Question count must be between 1 and {}",
            app_state.question_count.max(1) * 5
        )));
    }

    let questions = draft_questions(app_state.drafter.as_ref(), &request.material, count)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Question drafting failed");
            WebError::from(e)
        })?;
    Ok(Json(DraftResponse { questions }))
}
