//! The question flow: a state machine walking the ordered question list.

use log::debug;

use crate::condition;
use crate::error::{Error, Result};
use crate::manifest::Question;
use crate::validation::{validate_answer, ValidatorRegistry};
use crate::value::Value;
use crate::variables::Answers;

/// Per-question state.
///
/// `Answered` is terminal until [`QuestionFlow::reset`]. A question `Skipped` because its
/// condition failed is re-checked on every scan; one declined through
/// [`QuestionFlow::skip_optional`] stays `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionState {
    NotReached,
    Active,
    Answered,
    Skipped,
}

/// A rejected answer, kept for display but excluded from [`QuestionFlow::answers`].
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidAnswer {
    pub value: Value,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub skipped: usize,
    pub total: usize,
}

impl Progress {
    /// Number of questions currently answered or skipped.
    pub fn resolved(&self) -> usize {
        self.answered + self.skipped
    }
}

#[derive(Debug)]
pub struct QuestionFlow {
    questions: Vec<Question>,
    states: Vec<QuestionState>,
    answers: Answers,
    invalid: Answers,
    messages: Vec<Option<String>>,
    declined: Vec<bool>,
    validators: ValidatorRegistry,
}

impl QuestionFlow {
    pub fn new(questions: Vec<Question>) -> Self {
        let count = questions.len();
        Self {
            questions,
            states: vec![QuestionState::NotReached; count],
            answers: Answers::new(),
            invalid: Answers::new(),
            messages: vec![None; count],
            declined: vec![false; count],
            validators: ValidatorRegistry::new(),
        }
    }

    /// Registers a custom validator referenced by `validation.custom`.
    pub fn register_validator<S, F>(&mut self, name: S, validator: F)
    where
        S: Into<String>,
        F: Fn(&Value) -> std::result::Result<(), String> + 'static,
    {
        self.validators.register(name, validator);
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Returns the next question to ask, or `None` once every question is resolved.
    ///
    /// Every question not yet answered or declined has its condition re-checked against
    /// the current answers: failing ones are marked `Skipped` on the way, so a question
    /// whose condition depends on a later answer comes back once that answer arrives.
    pub fn get_next_question(&mut self) -> Result<Option<&Question>> {
        for index in 0..self.questions.len() {
            if self.states[index] == QuestionState::Answered || self.declined[index] {
                continue;
            }

            let question = &self.questions[index];
            if !condition::evaluate(question.condition.as_ref(), &self.answers)? {
                debug!("Skipping question '{}': condition not met", question.name);
                self.states[index] = QuestionState::Skipped;
                continue;
            }

            self.states[index] = QuestionState::Active;
            return Ok(Some(&self.questions[index]));
        }
        Ok(None)
    }

    /// Validates and stores an answer.
    ///
    /// On a validation failure the value is kept as an invalid answer, any earlier valid
    /// answer for the question is withdrawn, the question state is left untouched and the
    /// validation error is returned.
    ///
    /// # Errors
    /// * `Error::QuestionNotFound` for an unknown name
    /// * `Error::ConfigError` if the question was declined or its condition does not hold
    /// * `Error::ValidationError` if the value is rejected
    pub fn submit_answer(&mut self, name: &str, value: Value) -> Result<()> {
        let index = self.index_of(name)?;
        let question = &self.questions[index];
        if self.states[index] == QuestionState::Skipped
            && (self.declined[index]
                || !condition::evaluate(question.condition.as_ref(), &self.answers)?)
        {
            return Err(Error::ConfigError(format!(
                "question '{name}' was skipped and cannot be answered"
            )));
        }

        if let Err(err) = validate_answer(question, &value, &self.validators) {
            if let Error::ValidationError { message, .. } = &err {
                self.messages[index] = Some(message.clone());
                self.invalid.insert(name.to_string(), value);
                self.answers.shift_remove(name);
            }
            return Err(err);
        }

        debug!("Answered '{name}'");
        self.invalid.shift_remove(name);
        self.messages[index] = None;
        self.answers.insert(name.to_string(), value);
        self.states[index] = QuestionState::Answered;
        self.declined[index] = false;
        Ok(())
    }

    /// Resolves an optional question without an answer.
    ///
    /// # Errors
    /// * `Error::ValidationError` if the question is required
    pub fn skip_optional(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        let question = &self.questions[index];
        if question.required {
            return Err(Error::ValidationError {
                question: name.to_string(),
                message: "a value is required".to_string(),
            });
        }
        if self.states[index] != QuestionState::Answered {
            self.states[index] = QuestionState::Skipped;
            self.declined[index] = true;
        }
        Ok(())
    }

    /// True when every question whose condition holds is answered or optional.
    pub fn is_complete(&self) -> Result<bool> {
        for (question, state) in self.questions.iter().zip(&self.states) {
            if !question.required || *state == QuestionState::Answered {
                continue;
            }
            if condition::evaluate(question.condition.as_ref(), &self.answers)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Clears every state, answer and invalid answer. Registered validators are kept.
    pub fn reset(&mut self) {
        self.states.fill(QuestionState::NotReached);
        self.messages.fill(None);
        self.declined.fill(false);
        self.answers.clear();
        self.invalid.clear();
    }

    pub fn state(&self, name: &str) -> Option<QuestionState> {
        self.index_of(name).ok().map(|index| self.states[index])
    }

    /// Valid answers, in submission order.
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn invalid_answer(&self, name: &str) -> Option<InvalidAnswer> {
        let index = self.index_of(name).ok()?;
        let value = self.invalid.get(name)?.clone();
        let message = self.messages[index].clone().unwrap_or_default();
        Some(InvalidAnswer { value, message })
    }

    pub fn progress(&self) -> Progress {
        let count = |wanted: QuestionState| self.states.iter().filter(|s| **s == wanted).count();
        Progress {
            answered: count(QuestionState::Answered),
            skipped: count(QuestionState::Skipped),
            total: self.questions.len(),
        }
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.questions
            .iter()
            .position(|q| q.name == name)
            .ok_or_else(|| Error::QuestionNotFound(name.to_string()))
    }
}
