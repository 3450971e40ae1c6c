//! User input and interaction handling.
//! Maps question types onto dialoguer widgets.

use dialoguer::{Confirm, Input, MultiSelect, Password, Select};

use crate::error::Result;
use crate::manifest::{Question, QuestionType};
use crate::value::Value;

/// Source of interactive answers.
pub trait Prompter {
    /// Asks one question. `Ok(None)` means the user supplied nothing.
    fn ask(&self, question: &Question, default: Option<&Value>) -> Result<Option<Value>>;

    /// Tells the user why the previous answer was rejected before asking again.
    fn report_invalid(&self, question: &Question, message: &str);
}

/// Terminal prompter backed by dialoguer.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

fn prompt_text(question: &Question) -> &str {
    if question.prompt.is_empty() {
        &question.name
    } else {
        &question.prompt
    }
}

fn parse_number(input: &str) -> Value {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(input.to_string()))
}

impl Prompter for DialoguerPrompter {
    fn ask(&self, question: &Question, default: Option<&Value>) -> Result<Option<Value>> {
        let prompt = prompt_text(question);

        let value = match question.question_type {
            QuestionType::Text
            | QuestionType::Path
            | QuestionType::Url
            | QuestionType::Email
            | QuestionType::Number => {
                let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
                if let Some(default) = default {
                    input = input.default(default.to_string());
                }
                let answer = input.interact_text()?;
                if answer.is_empty() {
                    None
                } else if question.question_type == QuestionType::Number {
                    Some(parse_number(&answer))
                } else {
                    Some(Value::String(answer))
                }
            }
            QuestionType::Password => {
                let answer =
                    Password::new().with_prompt(prompt).allow_empty_password(true).interact()?;
                match (answer.is_empty(), default) {
                    (true, Some(default)) => Some(default.clone()),
                    (true, None) => None,
                    (false, _) => Some(Value::String(answer)),
                }
            }
            QuestionType::Choice => {
                let position = default
                    .and_then(|d| question.choices.iter().position(|c| *c == d.to_string()))
                    .unwrap_or(0);
                let selection = Select::new()
                    .with_prompt(prompt)
                    .default(position)
                    .items(&question.choices)
                    .interact()?;
                question.choices.get(selection).cloned().map(Value::String)
            }
            QuestionType::MultiChoice => {
                let selected: Vec<String> = match default {
                    Some(Value::List(items)) => items.iter().map(Value::to_string).collect(),
                    Some(other) => vec![other.to_string()],
                    None => Vec::new(),
                };
                let defaults: Vec<bool> =
                    question.choices.iter().map(|c| selected.contains(c)).collect();
                let selections = MultiSelect::new()
                    .with_prompt(prompt)
                    .items(&question.choices)
                    .defaults(&defaults)
                    .interact()?;
                Some(Value::List(
                    selections
                        .into_iter()
                        .filter_map(|i| question.choices.get(i).cloned().map(Value::String))
                        .collect(),
                ))
            }
            QuestionType::Boolean => {
                let default = default.map(Value::is_truthy).unwrap_or(false);
                Some(Value::Bool(
                    Confirm::new().with_prompt(prompt).default(default).interact()?,
                ))
            }
        };

        Ok(value)
    }

    fn report_invalid(&self, _question: &Question, message: &str) {
        eprintln!("{message}");
    }
}
