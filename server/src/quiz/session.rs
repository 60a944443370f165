use serde::Serialize;

use super::error::{PayloadError, SessionError};
use super::scoring::ScoringRules;
use super::{Answer, Question, Quiz, StudentAnswer};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SessionPhase {
    AwaitingEntry,
    InProgress { index: usize },
    Finished { total_score: f64 },
}

/// What a countdown tick meant for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    Expired,
    /// No question is waiting for an answer.
    Ignored,
}

/// Single-student play-through of one decoded quiz.
///
/// The session owns no timer: the caller feeds it countdown ticks and decides
/// when to advance after an answer has been recorded. A rejected event leaves
/// the state untouched.
#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Quiz,
    rules: ScoringRules,
    room_code: String,
    phase: SessionPhase,
    answers: Vec<StudentAnswer>,
    answer_submitted: bool,
    time_left: u32,
}

impl QuizSession {
    pub fn new(
        quiz: Quiz,
        rules: ScoringRules,
        room_code: impl Into<String>,
    ) -> Result<Self, PayloadError> {
        if quiz.questions.is_empty() {
            return Err(PayloadError::NoQuestions);
        }
        Ok(Self {
            answers: Vec::with_capacity(quiz.questions.len()),
            quiz,
            rules,
            room_code: room_code.into(),
            phase: SessionPhase::AwaitingEntry,
            answer_submitted: false,
            time_left: 0,
        })
    }

    /// Checks the room code and starts the first question. Returns the
    /// countdown duration for that question.
    pub fn enter_room(&mut self, code: &str) -> Result<u32, SessionError> {
        if self.phase != SessionPhase::AwaitingEntry {
            return Err(SessionError::AlreadyEntered);
        }
        if code.trim().to_lowercase() != self.room_code.trim().to_lowercase() {
            return Err(SessionError::InvalidRoomCode);
        }
        Ok(self.begin_question(0))
    }

    pub fn tick(&mut self, time_left: u32) -> TickOutcome {
        let Some(question) = self.awaiting_answer() else {
            return TickOutcome::Ignored;
        };
        self.time_left = time_left.min(self.rules.time_limit_for(question));
        if self.time_left == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Running
        }
    }

    /// Records the student's answer for the current question, timed from the
    /// last tick seen.
    pub fn submit_answer(&mut self, answer: Answer) -> Result<StudentAnswer, SessionError> {
        let question = self.question_awaiting_answer()?;
        let limit = self.rules.time_limit_for(question);
        let time_taken = f64::from(limit.saturating_sub(self.time_left));
        self.record(answer, time_taken)
    }

    /// Records the synthesized empty answer for a question whose countdown ran
    /// out.
    pub fn time_up(&mut self) -> Result<StudentAnswer, SessionError> {
        let question = self.question_awaiting_answer()?;
        let answer = Answer::unanswered(question);
        let time_taken = f64::from(self.rules.time_limit_for(question));
        self.time_left = 0;
        self.record(answer, time_taken)
    }

    /// Moves past an answered question, finishing after the last one.
    pub fn advance(&mut self) -> Result<SessionPhase, SessionError> {
        let SessionPhase::InProgress { index } = self.phase else {
            return Err(SessionError::NotInProgress);
        };
        if !self.answer_submitted {
            return Err(SessionError::NotAnswered);
        }

        let next = index + 1;
        if next < self.quiz.questions.len() {
            self.begin_question(next);
        } else {
            self.phase = SessionPhase::Finished {
                total_score: self.total_score(),
            };
            tracing::debug!(
                session.answer_count = self.answers.len(),
                "Quiz session finished"
            );
        }
        Ok(self.phase)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn question_count(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            SessionPhase::InProgress { index } => Some(index),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index()
            .and_then(|index| self.quiz.questions.get(index))
    }

    /// Countdown duration of the current question.
    pub fn current_time_limit(&self) -> Option<u32> {
        self.current_question()
            .map(|question| self.rules.time_limit_for(question))
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn answers(&self) -> &[StudentAnswer] {
        &self.answers
    }

    pub fn total_score(&self) -> f64 {
        let sum: f64 = self.answers.iter().map(|answer| answer.score).sum();
        (sum * 10.0).round() / 10.0
    }

    fn begin_question(&mut self, index: usize) -> u32 {
        self.phase = SessionPhase::InProgress { index };
        self.answer_submitted = false;
        self.time_left = self
            .quiz
            .questions
            .get(index)
            .map_or(0, |question| self.rules.time_limit_for(question));
        self.time_left
    }

    fn awaiting_answer(&self) -> Option<&Question> {
        if self.answer_submitted {
            return None;
        }
        self.current_question()
    }

    fn question_awaiting_answer(&self) -> Result<&Question, SessionError> {
        let question = self.current_question().ok_or(SessionError::NotInProgress)?;
        if self.answer_submitted {
            return Err(SessionError::AlreadyAnswered);
        }
        Ok(question)
    }

    fn record(&mut self, answer: Answer, time_taken: f64) -> Result<StudentAnswer, SessionError> {
        let question = self.question_awaiting_answer()?;
        let outcome = self.rules.score(question, &answer, time_taken);
        let student_answer = StudentAnswer {
            question_id: question.id.clone(),
            answer,
            time_taken,
            score: outcome.score,
            is_correct: outcome.is_correct,
        };
        tracing::debug!(
            question.id = %student_answer.question_id,
            answer.time_taken = time_taken,
            answer.score = outcome.score,
            answer.is_correct = outcome.is_correct,
            "Recorded answer"
        );
        self.answers.push(student_answer.clone());
        self.answer_submitted = true;
        Ok(student_answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{
        FIXED_ROOM_CODE, INCORRECT_ANSWER_PENALTY, MatchPair, McqOption, QuestionType, encode_text,
    };

    fn mcq(id: &str, time: Option<u32>) -> Question {
        Question {
            id: id.to_string(),
            question_type: QuestionType::MultipleChoice,
            text: encode_text("Pick one"),
            time_per_question: time,
            options: Some(vec![
                McqOption {
                    id: "a".to_string(),
                    text: encode_text("A"),
                },
                McqOption {
                    id: "b".to_string(),
                    text: encode_text("B"),
                },
            ]),
            correct_answer_id: Some("a".to_string()),
            match_pairs: None,
            match_pool: None,
        }
    }

    fn matching(id: &str) -> Question {
        Question {
            id: id.to_string(),
            question_type: QuestionType::Matching,
            text: encode_text("Match"),
            time_per_question: Some(20),
            options: None,
            correct_answer_id: None,
            match_pairs: Some(vec![
                MatchPair {
                    id: "p1".to_string(),
                    item: encode_text("one"),
                    match_text: encode_text("1"),
                },
                MatchPair {
                    id: "p2".to_string(),
                    item: encode_text("two"),
                    match_text: encode_text("2"),
                },
            ]),
            match_pool: Some(vec![encode_text("2"), encode_text("1")]),
        }
    }

    fn session(questions: Vec<Question>) -> QuizSession {
        let mut quiz = Quiz {
            time_per_question: 30,
            questions,
        };
        quiz.fill_question_time_limits();
        QuizSession::new(quiz, ScoringRules::default(), FIXED_ROOM_CODE).unwrap()
    }

    #[test]
    fn test_rejects_empty_quiz() {
        let quiz = Quiz {
            time_per_question: 30,
            questions: vec![],
        };
        let result = QuizSession::new(quiz, ScoringRules::default(), FIXED_ROOM_CODE);
        assert_eq!(result.err(), Some(PayloadError::NoQuestions));
    }

    #[test]
    fn test_room_code_check() {
        let mut session = session(vec![mcq("q1", None)]);

        assert_eq!(session.enter_room("123b"), Err(SessionError::InvalidRoomCode));
        assert_eq!(session.enter_room(""), Err(SessionError::InvalidRoomCode));
        assert_eq!(session.phase(), SessionPhase::AwaitingEntry);
        assert!(session.answers().is_empty());

        assert_eq!(session.enter_room("  123A "), Ok(30));
        assert_eq!(session.phase(), SessionPhase::InProgress { index: 0 });
        assert_eq!(session.time_left(), 30);

        assert_eq!(session.enter_room("123a"), Err(SessionError::AlreadyEntered));
    }

    #[test]
    fn test_events_before_entry_are_rejected() {
        let mut session = session(vec![mcq("q1", None)]);
        assert_eq!(session.tick(10), TickOutcome::Ignored);
        assert_eq!(
            session.submit_answer(Answer::Choice("a".into())),
            Err(SessionError::NotInProgress)
        );
        assert_eq!(session.time_up(), Err(SessionError::NotInProgress));
        assert_eq!(session.advance(), Err(SessionError::NotInProgress));
        assert_eq!(session.phase(), SessionPhase::AwaitingEntry);
    }

    #[test]
    fn test_answer_is_timed_from_countdown() {
        let mut session = session(vec![mcq("q1", None), mcq("q2", Some(10))]);
        session.enter_room(FIXED_ROOM_CODE).unwrap();

        for time_left in (15..30).rev() {
            assert_eq!(session.tick(time_left), TickOutcome::Running);
        }
        let recorded = session.submit_answer(Answer::Choice("a".into())).unwrap();
        assert_eq!(recorded.time_taken, 15.0);
        assert_eq!(recorded.score, 5.0);
        assert!(recorded.is_correct);

        // Each question restarts at its own limit.
        assert_eq!(session.advance(), Ok(SessionPhase::InProgress { index: 1 }));
        assert_eq!(session.current_time_limit(), Some(10));
        assert_eq!(session.time_left(), 10);
    }

    #[test]
    fn test_exactly_one_answer_per_question() {
        let mut session = session(vec![mcq("q1", None), mcq("q2", None)]);
        session.enter_room(FIXED_ROOM_CODE).unwrap();

        assert_eq!(session.advance(), Err(SessionError::NotAnswered));

        session.submit_answer(Answer::Choice("b".into())).unwrap();
        assert_eq!(
            session.submit_answer(Answer::Choice("a".into())),
            Err(SessionError::AlreadyAnswered)
        );
        assert_eq!(session.time_up(), Err(SessionError::AlreadyAnswered));
        // A tick that races the submission does nothing.
        assert_eq!(session.tick(0), TickOutcome::Ignored);
        assert_eq!(session.answers().len(), 1);
        assert_eq!(session.answers()[0].score, INCORRECT_ANSWER_PENALTY);
    }

    #[test]
    fn test_timeout_records_empty_answer() {
        let mut session = session(vec![matching("q1")]);
        session.enter_room(FIXED_ROOM_CODE).unwrap();

        assert_eq!(session.tick(0), TickOutcome::Expired);
        let recorded = session.time_up().unwrap();
        assert_eq!(recorded.question_id, "q1");
        assert_eq!(recorded.answer, Answer::Matches(vec![String::new(), String::new()]));
        assert_eq!(recorded.time_taken, 20.0);
        assert_eq!(recorded.score, INCORRECT_ANSWER_PENALTY);
        assert!(!recorded.is_correct);
    }

    #[test]
    fn test_full_play_through_totals_scores() {
        let mut session = session(vec![mcq("q1", None), matching("q2"), mcq("q3", None)]);
        session.enter_room(FIXED_ROOM_CODE).unwrap();

        session.submit_answer(Answer::Choice("a".into())).unwrap();
        session.advance().unwrap();

        session.tick(18);
        session
            .submit_answer(Answer::Matches(vec!["1".into(), "2".into()]))
            .unwrap();
        session.advance().unwrap();

        session.time_up().unwrap();
        let phase = session.advance().unwrap();

        // 10.0 + 9.0 - 10.0
        assert_eq!(phase, SessionPhase::Finished { total_score: 9.0 });
        assert_eq!(session.current_question(), None);
        let ids: Vec<&str> = session.answers().iter().map(|a| a.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);

        assert_eq!(session.advance(), Err(SessionError::NotInProgress));
        assert_eq!(session.tick(3), TickOutcome::Ignored);
        assert_eq!(session.answers().len(), 3);
    }

    #[test]
    fn test_phase_wire_shape() {
        let json = serde_json::to_value(SessionPhase::Finished { total_score: 4.5 }).unwrap();
        assert_eq!(json["phase"], "finished");
        assert_eq!(json["totalScore"], 4.5);
        let json = serde_json::to_value(SessionPhase::InProgress { index: 2 }).unwrap();
        assert_eq!(json["phase"], "inProgress");
        assert_eq!(json["index"], 2);
    }
}
