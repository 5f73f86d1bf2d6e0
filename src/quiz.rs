//! Booth quiz shown when the avatar walks up to the mentor NPC.
//!
//! The session only tracks progress and scoring; presenting questions and
//! claiming the reward for a passed quiz are left to the host page.

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub text: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<QuizOption>,
}

impl Question {
    pub fn new(prompt: impl Into<String>, options: &[(&str, bool)]) -> Self {
        Self {
            prompt: prompt.into(),
            options: options
                .iter()
                .map(|(text, correct)| QuizOption {
                    text: (*text).to_string(),
                    correct: *correct,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// The three questions asked by the mentor at the booth.
    pub fn default_booth() -> Self {
        Self::new(vec![
            Question::new(
                "What is Flow?",
                &[
                    ("A Layer 2 on Ethereum", false),
                    ("A scalable blockchain for consumer apps", true),
                    ("An exchange", false),
                ],
            ),
            Question::new(
                "Which language does Flow use for smart contracts?",
                &[("Solidity", false), ("Cadence", true), ("Rust", false)],
            ),
            Question::new(
                "Which company helped build Flow?",
                &[
                    ("OpenSea", false),
                    ("Dapper Labs", true),
                    ("Coinbase", false),
                ],
            ),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizOutcome {
    Passed,
    Failed { correct: usize, total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizProgress {
    Next(usize),
    Finished(QuizOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("question {question} has no option {option}")]
    InvalidOption { question: usize, option: usize },
    #[error("quiz has no questions")]
    Empty,
}

/// Progress through one round of a [`Quiz`].
#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Quiz,
    current: usize,
    correct: usize,
}

impl QuizSession {
    pub fn new(quiz: Quiz) -> Result<Self, QuizError> {
        if quiz.questions.is_empty() {
            return Err(QuizError::Empty);
        }
        Ok(Self {
            quiz,
            current: 0,
            correct: 0,
        })
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.quiz.questions[self.current]
    }

    pub fn correct_answers(&self) -> usize {
        self.correct
    }

    /// Records an answer; finishing a round resets the session.
    pub fn answer(&mut self, option: usize) -> Result<QuizProgress, QuizError> {
        let correct = self
            .current_question()
            .options
            .get(option)
            .map(|chosen| chosen.correct)
            .ok_or(QuizError::InvalidOption {
                question: self.current,
                option,
            })?;
        if correct {
            self.correct += 1;
        }
        self.current += 1;
        if self.current < self.quiz.questions.len() {
            return Ok(QuizProgress::Next(self.current));
        }

        let total = self.quiz.questions.len();
        let outcome = if self.correct == total {
            QuizOutcome::Passed
        } else {
            QuizOutcome::Failed {
                correct: self.correct,
                total,
            }
        };
        info!("quiz finished: {outcome:?}");
        self.reset();
        Ok(QuizProgress::Finished(outcome))
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.correct = 0;
    }
}
