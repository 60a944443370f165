//! Per-connection play session actor.
//!
//! Each WebSocket play session gets one actor owning a [`QuizSession`] and its
//! [`Countdown`]. The actor is the only writer of the session; the socket side
//! talks to it through a [`PlayerActorHandle`] and receives [`PlayerEvent`]s.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use uuid::Uuid;

use crate::quiz::countdown::{Countdown, CountdownTick};
use crate::quiz::session::TickOutcome;
use crate::quiz::{
    Answer, FIXED_ROOM_CODE, PayloadError, QuestionView, Quiz, QuizSession, ScoringRules,
    SessionError, SessionPhase, StudentAnswer,
};

pub const ANSWER_ACK_DELAY: Duration = Duration::from_millis(1200);
pub const TIMEOUT_ACK_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug)]
pub enum PlayerMessage {
    EnterRoom { code: String },
    SubmitAnswer { answer: Answer },
    Leave,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "eventType", content = "data", rename_all_fields = "camelCase")]
pub enum PlayerEvent {
    QuizLoaded {
        question_count: usize,
        time_per_question: u32,
    },
    RoomCodeRejected {
        message: String,
    },
    QuestionStarted {
        index: usize,
        total: usize,
        duration: u32,
        question: QuestionView,
    },
    TimerTick {
        time_left: u32,
        duration: u32,
    },
    TimeUp {
        index: usize,
    },
    AnswerRecorded {
        index: usize,
        answer: StudentAnswer,
    },
    QuizFinished {
        total_score: f64,
        answers: Vec<StudentAnswer>,
    },
    InputRejected {
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub rules: ScoringRules,
    pub room_code: String,
    /// Pause after a submitted answer before the next question.
    pub answer_ack_delay: Duration,
    /// Pause after a timed-out question before the next one.
    pub timeout_ack_delay: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            rules: ScoringRules::default(),
            room_code: FIXED_ROOM_CODE.to_string(),
            answer_ack_delay: ANSWER_ACK_DELAY,
            timeout_ack_delay: TIMEOUT_ACK_DELAY,
        }
    }
}

struct PlayerActor {
    session_id: Uuid,
    receiver: mpsc::Receiver<PlayerMessage>,
    events_tx: mpsc::Sender<PlayerEvent>,
    session: QuizSession,
    countdown: Countdown,
    tick_rx: mpsc::Receiver<CountdownTick>,
    settings: PlayerSettings,
    advance_at: Option<Instant>,
}

impl PlayerActor {
    async fn emit(&self, event: PlayerEvent) {
        if self.events_tx.send(event).await.is_err() {
            tracing::debug!("Player event receiver dropped");
        }
    }

    #[tracing::instrument(skip(self, msg), fields(
        msg_type = %std::any::type_name_of_val(&msg)
    ))]
    async fn handle_message(&mut self, msg: PlayerMessage) {
        match msg {
            PlayerMessage::EnterRoom { code } => match self.session.enter_room(&code) {
                Ok(duration) => {
                    tracing::info!("Room code accepted, starting quiz");
                    self.start_question(duration).await;
                }
                Err(e @ SessionError::InvalidRoomCode) => {
                    tracing::info!("Room code rejected");
                    self.emit(PlayerEvent::RoomCodeRejected {
                        message: e.to_string(),
                    })
                    .await;
                }
                Err(e) => self.reject(e).await,
            },
            PlayerMessage::SubmitAnswer { answer } => {
                let Some(index) = self.session.current_index() else {
                    self.reject(SessionError::NotInProgress).await;
                    return;
                };
                match self.session.submit_answer(answer) {
                    Ok(recorded) => {
                        self.countdown.stop();
                        self.emit(PlayerEvent::AnswerRecorded {
                            index,
                            answer: recorded,
                        })
                        .await;
                        self.schedule_advance(self.settings.answer_ack_delay);
                    }
                    Err(e) => self.reject(e).await,
                }
            }
            // Handled by the run loop.
            PlayerMessage::Leave => {}
        }
    }

    async fn handle_tick(&mut self, tick: CountdownTick) {
        if !self.countdown.is_current(&tick) {
            tracing::trace!(countdown.generation = tick.generation, "Dropping stale tick");
            return;
        }

        match self.session.tick(tick.time_left) {
            TickOutcome::Running => {
                self.emit(PlayerEvent::TimerTick {
                    time_left: tick.time_left,
                    duration: tick.duration,
                })
                .await;
            }
            TickOutcome::Expired => {
                self.countdown.stop();
                self.emit(PlayerEvent::TimerTick {
                    time_left: 0,
                    duration: tick.duration,
                })
                .await;

                let Some(index) = self.session.current_index() else {
                    return;
                };
                match self.session.time_up() {
                    Ok(recorded) => {
                        tracing::debug!(session.index = index, "Question timed out");
                        self.emit(PlayerEvent::TimeUp { index }).await;
                        self.emit(PlayerEvent::AnswerRecorded {
                            index,
                            answer: recorded,
                        })
                        .await;
                        self.schedule_advance(self.settings.timeout_ack_delay);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Countdown expired without a question to time out");
                    }
                }
            }
            TickOutcome::Ignored => {}
        }
    }

    /// Moves to the next question. Returns `true` once the quiz is finished.
    async fn advance(&mut self) -> bool {
        match self.session.advance() {
            Ok(SessionPhase::InProgress { .. }) => {
                if let Some(duration) = self.session.current_time_limit() {
                    self.start_question(duration).await;
                }
                false
            }
            Ok(SessionPhase::Finished { total_score }) => {
                self.countdown.stop();
                tracing::info!(session.total_score = total_score, "Quiz finished");
                self.emit(PlayerEvent::QuizFinished {
                    total_score,
                    answers: self.session.answers().to_vec(),
                })
                .await;
                true
            }
            Ok(SessionPhase::AwaitingEntry) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Could not advance session");
                false
            }
        }
    }

    async fn start_question(&mut self, duration: u32) {
        let (Some(index), Some(question)) =
            (self.session.current_index(), self.session.current_question())
        else {
            return;
        };
        let event = PlayerEvent::QuestionStarted {
            index,
            total: self.session.question_count(),
            duration,
            question: question.view(),
        };
        tracing::debug!(session.index = index, countdown.duration = duration, "Starting question");
        self.countdown.start(duration);
        self.emit(event).await;
    }

    fn schedule_advance(&mut self, delay: Duration) {
        self.advance_at = Some(Instant::now() + delay);
    }

    async fn reject(&self, error: SessionError) {
        tracing::debug!(error = %error, "Rejecting player input");
        self.emit(PlayerEvent::InputRejected {
            reason: error.to_string(),
        })
        .await;
    }
}

#[tracing::instrument(skip(actor), fields(
    session.id = %actor.session_id,
    quiz.question_count = actor.session.question_count()
))]
async fn run_player_actor(mut actor: PlayerActor) {
    tracing::info!("Player session started");
    actor
        .emit(PlayerEvent::QuizLoaded {
            question_count: actor.session.question_count(),
            time_per_question: actor.session.quiz().time_per_question,
        })
        .await;

    loop {
        tokio::select! {
            maybe_msg = actor.receiver.recv() => {
                match maybe_msg {
                    Some(PlayerMessage::Leave) => {
                        tracing::info!("Player left the quiz");
                        break;
                    }
                    Some(msg) => actor.handle_message(msg).await,
                    None => {
                        tracing::info!("Player handle dropped. Shutting down");
                        break;
                    }
                }
            }
            Some(tick) = actor.tick_rx.recv() => {
                actor.handle_tick(tick).await;
            }
            _ = sleep_until(actor.advance_at.unwrap_or_else(Instant::now)), if actor.advance_at.is_some() => {
                actor.advance_at = None;
                if actor.advance().await {
                    break;
                }
            }
        }

        if actor.events_tx.is_closed() {
            tracing::info!("Player event receiver closed. Shutting down");
            break;
        }
    }

    actor.countdown.stop();
    tracing::info!(
        session.answer_count = actor.session.answers().len(),
        "Player session stopping"
    );
}

#[derive(Clone, Debug)]
pub struct PlayerActorHandle {
    pub sender: mpsc::Sender<PlayerMessage>,
    pub session_id: Uuid,
}

impl PlayerActorHandle {
    pub fn spawn(
        quiz: Quiz,
        settings: PlayerSettings,
        events_tx: mpsc::Sender<PlayerEvent>,
        buffer_size: usize,
    ) -> Result<Self, PayloadError> {
        let session = QuizSession::new(quiz, settings.rules, settings.room_code.clone())?;
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (countdown, tick_rx) = Countdown::channel(buffer_size);
        let session_id = Uuid::new_v4();
        let actor = PlayerActor {
            session_id,
            receiver,
            events_tx,
            session,
            countdown,
            tick_rx,
            settings,
            advance_at: None,
        };
        tokio::spawn(run_player_actor(actor));
        Ok(Self { sender, session_id })
    }

    pub async fn enter_room(&self, code: String) -> Result<(), String> {
        self.sender
            .send(PlayerMessage::EnterRoom { code })
            .await
            .map_err(|e| format!("Failed to send room code: {}", e))
    }

    pub async fn submit_answer(&self, answer: Answer) -> Result<(), String> {
        self.sender
            .send(PlayerMessage::SubmitAnswer { answer })
            .await
            .map_err(|e| format!("Failed to send answer: {}", e))
    }

    pub async fn leave(&self) {
        if self.sender.send(PlayerMessage::Leave).await.is_err() {
            tracing::debug!(session.id = %self.session_id, "Player session already stopped");
        }
    }
}
