use serde::{Deserialize, Serialize};

use super::text_codec::decode_text;
use super::{
    Answer, CORRECT_ANSWER_SCORE, DEFAULT_TIME_PER_QUESTION, INCORRECT_ANSWER_PENALTY, Question,
    QuestionType,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreOutcome {
    pub score: f64,
    pub is_correct: bool,
}

/// Constants of the speed-weighted scoring formula.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScoringRules {
    pub correct_max: f64,
    pub incorrect_penalty: f64,
    /// Denominator used when a question carries no time limit of its own.
    pub default_time_per_question: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            correct_max: CORRECT_ANSWER_SCORE,
            incorrect_penalty: INCORRECT_ANSWER_PENALTY,
            default_time_per_question: DEFAULT_TIME_PER_QUESTION,
        }
    }
}

impl ScoringRules {
    pub fn time_limit_for(&self, question: &Question) -> u32 {
        question.time_limit(self.default_time_per_question.max(1))
    }

    /// Scores one answer. A wrong or malformed answer costs the fixed penalty;
    /// a correct one earns `correct_max` scaled by the fraction of the
    /// question's time left, rounded to one decimal.
    pub fn score(&self, question: &Question, answer: &Answer, time_taken: f64) -> ScoreOutcome {
        if !is_correct(question, answer) {
            return ScoreOutcome {
                score: self.incorrect_penalty,
                is_correct: false,
            };
        }

        let time_limit = f64::from(self.time_limit_for(question));
        let time_factor = ((time_limit - clamp_elapsed(time_taken)) / time_limit).max(0.0);
        ScoreOutcome {
            score: round_to_tenth(self.correct_max * time_factor),
            is_correct: true,
        }
    }
}

/// Exact comparison, no normalization. An empty selection never counts.
pub fn is_correct(question: &Question, answer: &Answer) -> bool {
    match (question.question_type, answer) {
        (QuestionType::MultipleChoice, Answer::Choice(option_id)) => {
            !option_id.is_empty() && question.correct_answer_id.as_deref() == Some(option_id.as_str())
        }
        (QuestionType::Matching, Answer::Matches(selected)) => match &question.match_pairs {
            Some(pairs) if !pairs.is_empty() && pairs.len() == selected.len() => {
                pairs.iter().zip(selected).all(|(pair, choice)| {
                    !choice.is_empty() && decode_text(&pair.match_text) == *choice
                })
            }
            _ => false,
        },
        _ => false,
    }
}

pub fn clamp_elapsed(seconds: f64) -> f64 {
    if seconds.is_finite() { seconds.max(0.0) } else { 0.0 }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{MatchPair, McqOption, encode_text};

    fn mcq(time: Option<u32>) -> Question {
        Question {
            id: "q1".to_string(),
            question_type: QuestionType::MultipleChoice,
            text: encode_text("Capital of France?"),
            time_per_question: time,
            options: Some(vec![
                McqOption {
                    id: "berlin".to_string(),
                    text: encode_text("Berlin"),
                },
                McqOption {
                    id: "paris".to_string(),
                    text: encode_text("Paris"),
                },
            ]),
            correct_answer_id: Some("paris".to_string()),
            match_pairs: None,
            match_pool: None,
        }
    }

    fn matching() -> Question {
        let pairs = [("Germany", "Berlin"), ("Spain", "Madrid"), ("Japan", "東京")]
            .iter()
            .enumerate()
            .map(|(i, (item, matched))| MatchPair {
                id: format!("p{i}"),
                item: encode_text(item),
                match_text: encode_text(matched),
            })
            .collect::<Vec<_>>();
        Question {
            id: "q2".to_string(),
            question_type: QuestionType::Matching,
            text: encode_text("Match capitals"),
            time_per_question: Some(30),
            options: None,
            correct_answer_id: None,
            match_pool: Some(pairs.iter().rev().map(|p| p.match_text.clone()).collect()),
            match_pairs: Some(pairs),
        }
    }

    fn matches(values: &[&str]) -> Answer {
        Answer::Matches(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_mcq_correctness() {
        let rules = ScoringRules::default();
        let question = mcq(Some(30));

        let right = rules.score(&question, &Answer::Choice("paris".into()), 0.0);
        assert!(right.is_correct);

        for wrong in ["berlin", "", "Paris", "paris "] {
            let outcome = rules.score(&question, &Answer::Choice(wrong.into()), 0.0);
            assert!(!outcome.is_correct, "{wrong:?} should be wrong");
            assert_eq!(outcome.score, INCORRECT_ANSWER_PENALTY);
        }
    }

    #[test]
    fn test_time_weighted_score() {
        let rules = ScoringRules::default();
        let question = mcq(Some(30));
        let answer = Answer::Choice("paris".into());

        assert_eq!(rules.score(&question, &answer, 0.0).score, 10.0);
        assert_eq!(rules.score(&question, &answer, 15.0).score, 5.0);
        assert_eq!(rules.score(&question, &answer, 30.0).score, 0.0);
        assert_eq!(rules.score(&question, &answer, 7.0).score, 7.7);
        assert_eq!(rules.score(&question, &answer, 29.0).score, 0.3);

        let late = rules.score(&question, &answer, 45.0);
        assert!(late.is_correct);
        assert_eq!(late.score, 0.0);

        assert_eq!(rules.score(&question, &answer, -3.0).score, 10.0);
        assert_eq!(rules.score(&question, &answer, f64::NAN).score, 10.0);
    }

    #[test]
    fn test_question_time_limit_is_the_denominator() {
        let rules = ScoringRules::default();
        let answer = Answer::Choice("paris".into());

        assert_eq!(rules.score(&mcq(Some(10)), &answer, 5.0).score, 5.0);
        // Falls back to the default 30 seconds.
        assert_eq!(rules.score(&mcq(None), &answer, 15.0).score, 5.0);
        assert_eq!(rules.score(&mcq(Some(0)), &answer, 15.0).score, 5.0);
    }

    #[test]
    fn test_custom_rules() {
        let rules = ScoringRules {
            correct_max: 100.0,
            incorrect_penalty: -25.0,
            default_time_per_question: 20,
        };
        assert_eq!(rules.score(&mcq(None), &Answer::Choice("paris".into()), 5.0).score, 75.0);
        assert_eq!(rules.score(&mcq(None), &Answer::Choice("berlin".into()), 5.0).score, -25.0);
    }

    #[test]
    fn test_matching_correctness() {
        let rules = ScoringRules::default();
        let question = matching();

        let right = rules.score(&question, &matches(&["Berlin", "Madrid", "東京"]), 3.0);
        assert!(right.is_correct);
        assert_eq!(right.score, 9.0);

        let swapped = rules.score(&question, &matches(&["Madrid", "Berlin", "東京"]), 3.0);
        assert!(!swapped.is_correct);
        assert_eq!(swapped.score, INCORRECT_ANSWER_PENALTY);

        assert!(!is_correct(&question, &matches(&["Berlin", "Madrid"])));
        assert!(!is_correct(&question, &matches(&["Berlin", "Madrid", "東京", "Rome"])));
        assert!(!is_correct(&question, &matches(&[])));
    }

    #[test]
    fn test_malformed_answer_shapes_are_incorrect() {
        assert!(!is_correct(&mcq(None), &matches(&["paris"])));
        assert!(!is_correct(&matching(), &Answer::Choice("Berlin".into())));

        let mut no_pairs = matching();
        no_pairs.match_pairs = None;
        assert!(!is_correct(&no_pairs, &matches(&["Berlin", "Madrid", "東京"])));

        let mut no_correct = mcq(None);
        no_correct.correct_answer_id = None;
        assert!(!is_correct(&no_correct, &Answer::Choice("paris".into())));
    }

    #[test]
    fn test_timed_out_answers_never_score() {
        let rules = ScoringRules::default();

        let question = mcq(Some(30));
        let outcome = rules.score(&question, &Answer::unanswered(&question), 30.0);
        assert!(!outcome.is_correct);
        assert_eq!(outcome.score, INCORRECT_ANSWER_PENALTY);

        // Even a pair whose stored match decodes to nothing is not matched by
        // an empty selection.
        let mut question = matching();
        if let Some(pairs) = question.match_pairs.as_mut() {
            pairs[0].match_text = "%%%".to_string();
        }
        let outcome = rules.score(&question, &Answer::unanswered(&question), 30.0);
        assert!(!outcome.is_correct);
    }
}
