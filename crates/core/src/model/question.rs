use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a question is rejected when it is added or rehydrated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("subject cannot be empty")]
    EmptySubject,

    #[error("category cannot be empty")]
    EmptyCategory,

    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least two choices, got {count}")]
    TooFewChoices { count: usize },

    #[error("choice {index} is blank")]
    BlankChoice { index: usize },

    #[error("correct answer {answer:?} is not one of the choices")]
    CorrectChoiceMissing { answer: String },

    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    /// Accepts the display names case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(QuestionError::InvalidDifficulty(s.to_string())),
        }
    }
}

//
// ─── QUESTION DRAFT ────────────────────────────────────────────────────────────
//

/// Unvalidated question as entered by an admin or a seed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub subject: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer: String,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        category: impl Into<String>,
        difficulty: Difficulty,
        prompt: impl Into<String>,
        choices: impl IntoIterator<Item = impl Into<String>>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            category: category.into(),
            difficulty,
            prompt: prompt.into(),
            choices: choices.into_iter().map(Into::into).collect(),
            answer: answer.into(),
        }
    }

    /// Validate the draft, trimming every text field.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if a required field is blank, fewer than two
    /// choices are given, or the answer is not one of the choices.
    pub fn validate(self) -> Result<ValidatedQuestion, QuestionError> {
        let subject = non_blank(&self.subject).ok_or(QuestionError::EmptySubject)?;
        let category = non_blank(&self.category).ok_or(QuestionError::EmptyCategory)?;
        let prompt = non_blank(&self.prompt).ok_or(QuestionError::EmptyPrompt)?;

        if self.choices.len() < 2 {
            return Err(QuestionError::TooFewChoices {
                count: self.choices.len(),
            });
        }
        let mut choices = Vec::with_capacity(self.choices.len());
        for (index, raw) in self.choices.iter().enumerate() {
            let choice = non_blank(raw).ok_or(QuestionError::BlankChoice { index })?;
            choices.push(choice);
        }

        let answer = self.answer.trim();
        if !choices.iter().any(|c| c == answer) {
            return Err(QuestionError::CorrectChoiceMissing {
                answer: answer.to_string(),
            });
        }

        Ok(ValidatedQuestion {
            subject,
            category,
            difficulty: self.difficulty,
            prompt,
            choices,
            answer: answer.to_string(),
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A question that passed validation but has no catalog id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    subject: String,
    category: String,
    difficulty: Difficulty,
    prompt: String,
    choices: Vec<String>,
    answer: String,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            subject: self.subject,
            category: self.category,
            difficulty: self.difficulty,
            prompt: self.prompt,
            choices: self.choices,
            answer: self.answer,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Immutable catalog question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    subject: String,
    category: String,
    difficulty: Difficulty,
    prompt: String,
    choices: Vec<String>,
    answer: String,
}

impl Question {
    /// Rehydrate a question from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the stored row would not pass validation.
    pub fn from_persisted(
        id: QuestionId,
        subject: String,
        category: String,
        difficulty: Difficulty,
        prompt: String,
        choices: Vec<String>,
        answer: String,
    ) -> Result<Self, QuestionError> {
        let draft = QuestionDraft {
            subject,
            category,
            difficulty,
            prompt,
            choices,
            answer,
        };
        Ok(draft.validate()?.assign_id(id))
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn has_choice(&self, choice: &str) -> bool {
        self.choices.iter().any(|c| c == choice)
    }

    /// Exact comparison against the correct choice; no case folding.
    #[must_use]
    pub fn is_correct(&self, choice: &str) -> bool {
        self.answer == choice
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
