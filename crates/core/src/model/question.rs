use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId, ThemeId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("a question needs at least 2 options, got {count}")]
    TooFewOptions { count: usize },

    #[error("option {id} has no text")]
    EmptyOption { id: OptionId },

    #[error("option id {id} is used more than once")]
    DuplicateOptionId { id: OptionId },

    #[error("no option is marked as correct")]
    NoCorrectOption,

    #[error("{count} options are marked as correct, expected exactly one")]
    MultipleCorrectOptions { count: usize },
}

/// Data-quality report for a stored question whose correct-option flag is not
/// set on exactly one option. The quiz engine still plays such a question,
/// treating the first flagged option as the answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("question {question_id} has {correct_count} correct options")]
pub struct MalformedQuestion {
    pub question_id: QuestionId,
    pub correct_count: usize,
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
    pub is_correct: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id,
            text: text.into(),
            is_correct,
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Question as submitted by the authoring form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub theme_id: ThemeId,
    pub text: String,
    pub options: Vec<AnswerOption>,
}

impl QuestionDraft {
    /// Builds a draft whose options get ids `1..=n` in order; `correct` is the
    /// zero-based position of the right answer.
    #[must_use]
    pub fn with_answers<S: Into<String>>(
        theme_id: ThemeId,
        text: impl Into<String>,
        answers: impl IntoIterator<Item = S>,
        correct: usize,
    ) -> Self {
        let options = answers
            .into_iter()
            .enumerate()
            .map(|(i, answer)| {
                AnswerOption::new(OptionId::new(i as u64 + 1), answer, i == correct)
            })
            .collect();
        Self {
            theme_id,
            text: text.into(),
            options,
        }
    }

    /// Validate the draft. Authoring enforces the single-correct-option rule.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first violated rule.
    pub fn validate(self) -> Result<ValidatedQuestion, QuestionError> {
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let options = normalize_options(self.options)?;
        match options.iter().filter(|o| o.is_correct).count() {
            0 => return Err(QuestionError::NoCorrectOption),
            1 => {}
            count => return Err(QuestionError::MultipleCorrectOptions { count }),
        }

        Ok(ValidatedQuestion {
            theme_id: self.theme_id,
            text,
            options,
        })
    }
}

fn normalize_options(options: Vec<AnswerOption>) -> Result<Vec<AnswerOption>, QuestionError> {
    if options.len() < 2 {
        return Err(QuestionError::TooFewOptions {
            count: options.len(),
        });
    }
    let mut seen = HashSet::with_capacity(options.len());
    let mut out = Vec::with_capacity(options.len());
    for option in options {
        if !seen.insert(option.id) {
            return Err(QuestionError::DuplicateOptionId { id: option.id });
        }
        let text = option.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyOption { id: option.id });
        }
        out.push(AnswerOption { text, ..option });
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub theme_id: ThemeId,
    pub text: String,
    pub options: Vec<AnswerOption>,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    theme_id: ThemeId,
    text: String,
    options: Vec<AnswerOption>,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        fields: ValidatedQuestion,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            theme_id: fields.theme_id,
            text: fields.text,
            options: fields.options,
            created_by,
            created_at,
        }
    }

    /// Rehydrate a question from storage.
    ///
    /// Stored rows may break the single-correct-option rule; that is reported
    /// by [`Question::check_integrity`] rather than rejected here.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for empty text, fewer than two options, blank
    /// option text or duplicate option ids.
    pub fn from_persisted(
        id: QuestionId,
        theme_id: ThemeId,
        text: String,
        options: Vec<AnswerOption>,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let text = text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let options = normalize_options(options)?;
        Ok(Self {
            id,
            theme_id,
            text,
            options,
            created_by,
            created_at,
        })
    }

    /// Replace text and options with an edited, validated version.
    pub fn apply_edit(&mut self, fields: ValidatedQuestion) {
        self.text = fields.text;
        self.options = fields.options;
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn theme_id(&self) -> ThemeId {
        self.theme_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// The authoritative answer: the first option flagged correct.
    #[must_use]
    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.is_correct)
    }

    /// Whether `id` is the authoritative answer.
    #[must_use]
    pub fn is_correct_answer(&self, id: OptionId) -> bool {
        self.correct_option().is_some_and(|o| o.id == id)
    }

    /// Checks the single-correct-option rule.
    ///
    /// # Errors
    ///
    /// Returns `MalformedQuestion` when zero or several options are flagged.
    pub fn check_integrity(&self) -> Result<(), MalformedQuestion> {
        let correct_count = self.options.iter().filter(|o| o.is_correct).count();
        if correct_count == 1 {
            Ok(())
        } else {
            Err(MalformedQuestion {
                question_id: self.id,
                correct_count,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn options(flags: &[bool]) -> Vec<AnswerOption> {
        flags
            .iter()
            .enumerate()
            .map(|(i, &c)| AnswerOption::new(OptionId::new(i as u64 + 1), format!("opt {i}"), c))
            .collect()
    }

    #[test]
    fn with_answers_assigns_sequential_ids() {
        let draft = QuestionDraft::with_answers(
            ThemeId::new(1),
            "¿Capital del Perú?",
            ["Cusco", "Lima", "Arequipa"],
            1,
        );
        let ids: Vec<u64> = draft.options.iter().map(|o| o.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(draft.options[1].is_correct);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_text() {
        let draft = QuestionDraft {
            theme_id: ThemeId::new(1),
            text: "  ".into(),
            options: options(&[true, false]),
        };
        assert_eq!(draft.validate().unwrap_err(), QuestionError::EmptyText);
    }

    #[test]
    fn validate_requires_two_options() {
        let draft = QuestionDraft {
            theme_id: ThemeId::new(1),
            text: "Q".into(),
            options: options(&[true]),
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            QuestionError::TooFewOptions { count: 1 }
        );
    }

    #[test]
    fn validate_rejects_blank_option() {
        let mut opts = options(&[true, false, false]);
        opts[2].text = " ".into();
        let draft = QuestionDraft {
            theme_id: ThemeId::new(1),
            text: "Q".into(),
            options: opts,
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            QuestionError::EmptyOption { id: OptionId::new(3) }
        );
    }

    #[test]
    fn validate_rejects_duplicate_option_ids() {
        let mut opts = options(&[true, false]);
        opts[1].id = OptionId::new(1);
        let draft = QuestionDraft {
            theme_id: ThemeId::new(1),
            text: "Q".into(),
            options: opts,
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            QuestionError::DuplicateOptionId { id: OptionId::new(1) }
        );
    }

    #[test]
    fn validate_enforces_exactly_one_correct() {
        let none = QuestionDraft {
            theme_id: ThemeId::new(1),
            text: "Q".into(),
            options: options(&[false, false]),
        };
        assert_eq!(none.validate().unwrap_err(), QuestionError::NoCorrectOption);

        let many = QuestionDraft {
            theme_id: ThemeId::new(1),
            text: "Q".into(),
            options: options(&[true, false, true]),
        };
        assert_eq!(
            many.validate().unwrap_err(),
            QuestionError::MultipleCorrectOptions { count: 2 }
        );
    }

    #[test]
    fn persisted_question_with_two_correct_uses_first() {
        let q = Question::from_persisted(
            QuestionId::new(5),
            ThemeId::new(1),
            "Q".into(),
            options(&[false, true, true]),
            UserId::generate(),
            fixed_now(),
        )
        .unwrap();

        assert_eq!(q.correct_option().map(|o| o.id), Some(OptionId::new(2)));
        assert!(q.is_correct_answer(OptionId::new(2)));
        assert!(!q.is_correct_answer(OptionId::new(3)));
        assert_eq!(
            q.check_integrity().unwrap_err(),
            MalformedQuestion {
                question_id: QuestionId::new(5),
                correct_count: 2
            }
        );
    }

    #[test]
    fn persisted_question_without_correct_has_no_answer() {
        let q = Question::from_persisted(
            QuestionId::new(6),
            ThemeId::new(1),
            "Q".into(),
            options(&[false, false]),
            UserId::generate(),
            fixed_now(),
        )
        .unwrap();
        assert!(q.correct_option().is_none());
        assert!(q.check_integrity().is_err());
    }
}
