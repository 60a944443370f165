use std::sync::Arc;
use url::Url;

use crate::config::AppSettings;
use crate::error::Result as AppResult;
use crate::player::PlayerSettings;
use crate::quiz::drafting::QuestionDrafter;

#[derive(Clone)]
pub struct AppState {
    pub public_base_url: Url,
    pub player_settings: PlayerSettings,
    pub question_count: usize,
    pub default_time_per_question: u32,
    pub drafter: Arc<dyn QuestionDrafter>,
}

impl AppState {
    pub fn new(settings: &AppSettings, drafter: Arc<dyn QuestionDrafter>) -> AppResult<Self> {
        Ok(Self {
            public_base_url: settings.public_base_url()?,
            player_settings: settings.quiz.player_settings(),
            question_count: settings.quiz.question_count,
            default_time_per_question: settings.quiz.default_time_per_question,
            drafter,
        })
    }
}
