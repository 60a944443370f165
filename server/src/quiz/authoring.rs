use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::{Rng, thread_rng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

use super::error::{ValidationErrors, ValidationIssue};
use super::link::share_link;
use super::payload::encode_quiz;
use super::text_codec::encode_text;
use super::{
    DEFAULT_TIME_PER_QUESTION, MAX_MATCH_PAIRS, MIN_TIME_PER_QUESTION, MatchPair, McqOption,
    NUMBER_OF_QUESTIONS, Question, QuestionType, Quiz,
};

const ID_LENGTH: usize = 8;

/// A question as typed by the instructor. All text is plain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(default = "generate_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<McqOption>,
    #[serde(rename = "correctAnswerMCQ", default)]
    pub correct_answer_id: Option<String>,
    #[serde(default)]
    pub match_pairs: Vec<MatchPair>,
}

impl QuestionDraft {
    /// An MCQ with two empty options, plus one empty pair kept around for
    /// when the instructor switches the question to matching.
    pub fn blank() -> Self {
        Self {
            id: generate_id(),
            question_type: QuestionType::MultipleChoice,
            text: String::new(),
            options: vec![blank_option(), blank_option()],
            correct_answer_id: None,
            match_pairs: vec![MatchPair {
                id: generate_id(),
                item: String::new(),
                match_text: String::new(),
            }],
        }
    }

    pub fn multiple_choice(text: impl Into<String>, options: &[&str], correct: usize) -> Self {
        let options: Vec<McqOption> = options
            .iter()
            .map(|option| McqOption {
                id: generate_id(),
                text: option.to_string(),
            })
            .collect();
        Self {
            id: generate_id(),
            question_type: QuestionType::MultipleChoice,
            text: text.into(),
            correct_answer_id: options.get(correct).map(|option| option.id.clone()),
            options,
            match_pairs: Vec::new(),
        }
    }

    pub fn matching(text: impl Into<String>, pairs: &[(&str, &str)]) -> Self {
        Self {
            id: generate_id(),
            question_type: QuestionType::Matching,
            text: text.into(),
            options: Vec::new(),
            correct_answer_id: None,
            match_pairs: pairs
                .iter()
                .map(|(item, matched)| MatchPair {
                    id: generate_id(),
                    item: item.to_string(),
                    match_text: matched.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
    #[serde(default = "default_time_per_question")]
    pub time_per_question: u32,
    pub questions: Vec<QuestionDraft>,
}

impl QuizDraft {
    pub fn blank(question_count: usize) -> Self {
        Self {
            time_per_question: DEFAULT_TIME_PER_QUESTION,
            questions: (0..question_count).map(|_| QuestionDraft::blank()).collect(),
        }
    }
}

impl Default for QuizDraft {
    fn default() -> Self {
        Self::blank(NUMBER_OF_QUESTIONS)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PublishedQuiz {
    pub link: String,
    pub payload: String,
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

fn blank_option() -> McqOption {
    McqOption {
        id: generate_id(),
        text: String::new(),
    }
}

fn default_time_per_question() -> u32 {
    DEFAULT_TIME_PER_QUESTION
}

/// Time limits under the minimum are treated as unset.
pub fn normalize_time_per_question(seconds: u32) -> u32 {
    if seconds < MIN_TIME_PER_QUESTION {
        DEFAULT_TIME_PER_QUESTION
    } else {
        seconds
    }
}

/// Collects every problem in the draft, in question order.
pub fn validate(draft: &QuizDraft) -> Result<(), ValidationErrors> {
    if draft.questions.is_empty() {
        return Err(ValidationErrors(vec![ValidationIssue::NoQuestions]));
    }

    let issues: Vec<ValidationIssue> = draft
        .questions
        .iter()
        .enumerate()
        .flat_map(|(index, question)| question_issues(index + 1, question))
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(issues))
    }
}

fn question_issues(number: usize, question: &QuestionDraft) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if question.text.trim().is_empty() {
        issues.push(ValidationIssue::EmptyText(number));
    }

    match question.question_type {
        QuestionType::MultipleChoice => {
            let options = &question.options;
            if options.len() < 2 {
                issues.push(ValidationIssue::TooFewOptions(number));
            }
            if options.iter().any(|option| option.text.trim().is_empty()) {
                issues.push(ValidationIssue::EmptyOption(number));
            } else {
                let mut seen = HashSet::new();
                if !options.iter().all(|option| seen.insert(option.text.trim())) {
                    issues.push(ValidationIssue::DuplicateOptions(number));
                }
            }

            let mut ids = HashSet::new();
            if !options
                .iter()
                .all(|option| !option.id.is_empty() && ids.insert(option.id.as_str()))
            {
                issues.push(ValidationIssue::BadOptionIds(number));
            }

            match question.correct_answer_id.as_deref() {
                None | Some("") => issues.push(ValidationIssue::MissingCorrectAnswer(number)),
                Some(correct) if !options.iter().any(|option| option.id == correct) => {
                    issues.push(ValidationIssue::UnknownCorrectAnswer(number));
                }
                Some(_) => {}
            }
        }
        QuestionType::Matching => {
            let pairs = &question.match_pairs;
            if pairs.is_empty() {
                issues.push(ValidationIssue::NoPairs(number));
            }
            if pairs.len() > MAX_MATCH_PAIRS {
                issues.push(ValidationIssue::TooManyPairs(number, MAX_MATCH_PAIRS));
            }
            if pairs
                .iter()
                .any(|pair| pair.item.trim().is_empty() || pair.match_text.trim().is_empty())
            {
                issues.push(ValidationIssue::EmptyPair(number));
            }
        }
    }
    issues
}

/// Validates the draft and produces the payload form of the quiz: free text
/// encoded, ids plain, and each matching question's pool shuffled once.
pub fn build_quiz(draft: &QuizDraft) -> Result<Quiz, ValidationErrors> {
    validate(draft)?;

    let mut rng = thread_rng();
    let questions = draft
        .questions
        .iter()
        .map(|question| {
            let mut encoded = Question {
                id: question.id.clone(),
                question_type: question.question_type,
                text: encode_text(&question.text),
                time_per_question: None,
                options: None,
                correct_answer_id: None,
                match_pairs: None,
                match_pool: None,
            };
            match question.question_type {
                QuestionType::MultipleChoice => {
                    encoded.options = Some(
                        question
                            .options
                            .iter()
                            .map(|option| McqOption {
                                id: option.id.clone(),
                                text: encode_text(&option.text),
                            })
                            .collect(),
                    );
                    encoded.correct_answer_id = question.correct_answer_id.clone();
                }
                QuestionType::Matching => {
                    let pairs: Vec<MatchPair> = question
                        .match_pairs
                        .iter()
                        .map(|pair| MatchPair {
                            id: pair.id.clone(),
                            item: encode_text(&pair.item),
                            match_text: encode_text(&pair.match_text),
                        })
                        .collect();
                    let mut pool: Vec<String> =
                        pairs.iter().map(|pair| pair.match_text.clone()).collect();
                    pool.shuffle(&mut rng);
                    encoded.match_pairs = Some(pairs);
                    encoded.match_pool = Some(pool);
                }
            }
            encoded
        })
        .collect();

    Ok(Quiz {
        time_per_question: normalize_time_per_question(draft.time_per_question),
        questions,
    })
}

/// Builds the quiz, encodes it and wraps the payload into a share link.
#[tracing::instrument(skip(draft, base_url), fields(quiz.question_count = draft.questions.len()))]
pub fn publish(draft: &QuizDraft, base_url: &Url) -> Result<PublishedQuiz, ValidationErrors> {
    let quiz = build_quiz(draft)?;
    let payload = encode_quiz(&quiz);
    let link = share_link(base_url, &payload);
    tracing::info!(payload.length = payload.len(), "Published quiz link");
    Ok(PublishedQuiz { link, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::link::payload_from_link;
    use crate::quiz::{decode_quiz, decode_text};

    fn valid_draft() -> QuizDraft {
        QuizDraft {
            time_per_question: 20,
            questions: vec![
                QuestionDraft::multiple_choice("2 + 2 = ?", &["3", "4", "5"], 1),
                QuestionDraft::matching(
                    "Match the elements",
                    &[("Gold", "Au"), ("Iron", "Fe"), ("Sodium", "Na"), ("Lead", "Pb")],
                ),
            ],
        }
    }

    #[test]
    fn test_generate_id() {
        let id = generate_id();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn test_blank_drafts() {
        let draft = QuizDraft::default();
        assert_eq!(draft.questions.len(), NUMBER_OF_QUESTIONS);
        assert_eq!(draft.time_per_question, DEFAULT_TIME_PER_QUESTION);

        let question = &draft.questions[0];
        assert_eq!(question.question_type, QuestionType::MultipleChoice);
        assert_eq!(question.options.len(), 2);
        assert_eq!(question.match_pairs.len(), 1);
        assert_eq!(question.correct_answer_id, None);
    }

    #[test]
    fn test_normalize_time_per_question() {
        assert_eq!(normalize_time_per_question(0), 30);
        assert_eq!(normalize_time_per_question(4), 30);
        assert_eq!(normalize_time_per_question(5), 5);
        assert_eq!(normalize_time_per_question(90), 90);
    }

    #[test]
    fn test_valid_draft_passes() {
        assert_eq!(validate(&valid_draft()), Ok(()));
    }

    #[test]
    fn test_blank_draft_reports_every_question() {
        let errors = validate(&QuizDraft::blank(2)).unwrap_err();
        assert_eq!(
            errors.issues(),
            &[
                ValidationIssue::EmptyText(1),
                ValidationIssue::EmptyOption(1),
                ValidationIssue::MissingCorrectAnswer(1),
                ValidationIssue::EmptyText(2),
                ValidationIssue::EmptyOption(2),
                ValidationIssue::MissingCorrectAnswer(2),
            ]
        );
        assert_eq!(
            validate(&QuizDraft::blank(0)).unwrap_err().issues(),
            &[ValidationIssue::NoQuestions]
        );
    }

    #[test]
    fn test_mcq_issues() {
        let mut draft = valid_draft();
        draft.questions[0].options.truncate(1);
        draft.questions[0].correct_answer_id = Some("missing".to_string());
        let errors = validate(&draft).unwrap_err();
        assert_eq!(
            errors.issues(),
            &[
                ValidationIssue::TooFewOptions(1),
                ValidationIssue::UnknownCorrectAnswer(1),
            ]
        );

        let mut draft = valid_draft();
        draft.questions[0].options[2].text = " 4 ".to_string();
        draft.questions[0].options[2].id = draft.questions[0].options[0].id.clone();
        let errors = validate(&draft).unwrap_err();
        assert_eq!(
            errors.issues(),
            &[
                ValidationIssue::DuplicateOptions(1),
                ValidationIssue::BadOptionIds(1),
            ]
        );
    }

    #[test]
    fn test_matching_issues() {
        let mut draft = valid_draft();
        draft.questions[1].match_pairs.clear();
        assert_eq!(
            validate(&draft).unwrap_err().issues(),
            &[ValidationIssue::NoPairs(2)]
        );

        let pairs: Vec<(String, String)> = (0..7).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
        let pairs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let mut draft = valid_draft();
        draft.questions[1] = QuestionDraft::matching("Too many", &pairs);
        draft.questions[1].match_pairs[3].match_text = "   ".to_string();
        assert_eq!(
            validate(&draft).unwrap_err().issues(),
            &[
                ValidationIssue::TooManyPairs(2, MAX_MATCH_PAIRS),
                ValidationIssue::EmptyPair(2),
            ]
        );
    }

    #[test]
    fn test_build_quiz_encodes_text_and_shuffles_pool() {
        let draft = valid_draft();
        let quiz = build_quiz(&draft).unwrap();
        assert_eq!(quiz.time_per_question, 20);

        let mcq = &quiz.questions[0];
        assert_eq!(mcq.id, draft.questions[0].id);
        assert_eq!(decode_text(&mcq.text), "2 + 2 = ?");
        assert_eq!(mcq.correct_answer_id, draft.questions[0].correct_answer_id);
        assert_eq!(mcq.match_pairs, None);
        assert_eq!(mcq.match_pool, None);
        let options = mcq.options.as_ref().unwrap();
        assert_eq!(options[1].id, draft.questions[0].options[1].id);
        assert_eq!(decode_text(&options[1].text), "4");

        let matching = &quiz.questions[1];
        assert_eq!(matching.options, None);
        let pairs = matching.match_pairs.as_ref().unwrap();
        assert_eq!(decode_text(&pairs[0].item), "Gold");
        let mut pool: Vec<String> = matching
            .match_pool
            .iter()
            .flatten()
            .map(|entry| decode_text(entry))
            .collect();
        pool.sort();
        assert_eq!(pool, vec!["Au", "Fe", "Na", "Pb"]);
    }

    #[test]
    fn test_build_quiz_refuses_invalid_draft() {
        let mut draft = valid_draft();
        draft.questions[0].text.clear();
        let errors = build_quiz(&draft).unwrap_err();
        assert_eq!(errors.to_string(), "Question 1 text is empty.");
    }

    #[test]
    fn test_short_time_limit_falls_back() {
        let mut draft = valid_draft();
        draft.time_per_question = 3;
        assert_eq!(build_quiz(&draft).unwrap().time_per_question, 30);
    }

    #[test]
    fn test_publish_produces_playable_link() {
        let base = Url::parse("https://quiz.example.org/").unwrap();
        let published = publish(&valid_draft(), &base).unwrap();
        assert!(published.link.starts_with("https://quiz.example.org/#/play?data="));

        let payload = payload_from_link(&published.link).unwrap();
        assert_eq!(payload, published.payload);
        let quiz = decode_quiz(&payload).unwrap();
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.questions[1].time_per_question, Some(20));
    }

    #[test]
    fn test_draft_wire_format() {
        let json = r#"{
            "timePerQuestion": 15,
            "questions": [
                {"type": "MCQ", "text": "Q", "options": [{"id": "a", "text": "x"}, {"id": "b", "text": "y"}], "correctAnswerMCQ": "b"},
                {"type": "MATCH", "text": "M", "matchPairs": [{"id": "p", "item": "i", "match": "m"}]}
            ]
        }"#;
        let draft: QuizDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.questions[0].correct_answer_id.as_deref(), Some("b"));
        assert_eq!(draft.questions[1].match_pairs[0].match_text, "m");
        assert_eq!(draft.questions[1].id.len(), ID_LENGTH);
        assert_eq!(validate(&draft), Ok(()));
    }
}
