//! Answer sources and the questionnaire driver.
//! Answers may be preloaded from a JSON/YAML file or stdin, prompted interactively, or
//! taken from question defaults.

use log::debug;
use std::io::Read;
use std::path::Path;

use crate::condition::evaluate_default;
use crate::error::{Error, Result};
use crate::flow::QuestionFlow;
use crate::prompt::Prompter;
use crate::variables::Answers;

/// Parses a key/value answer document. JSON is tried first, then YAML.
/// Blank input yields no answers.
pub fn parse_answers(content: &str) -> Result<Answers> {
    if content.trim().is_empty() {
        return Ok(Answers::new());
    }
    match serde_json::from_str(content) {
        Ok(answers) => Ok(answers),
        Err(_) => Ok(serde_yaml::from_str(content)?),
    }
}

pub fn load_answers_file<P: AsRef<Path>>(path: P) -> Result<Answers> {
    let path = path.as_ref();
    debug!("Loading answers from {}", path.display());
    parse_answers(&std::fs::read_to_string(path)?)
}

pub fn load_from_stdin() -> Result<Answers> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    parse_answers(&buffer)
}

/// Loads preloaded answers from the answers file, stdin, or nothing.
/// Stdin wins when both are requested.
pub fn get_answers_from(answers_file: Option<&Path>, take_from_stdin: bool) -> Result<Answers> {
    match (take_from_stdin, answers_file) {
        (true, _) => load_from_stdin(),
        (false, Some(path)) => load_answers_file(path),
        (false, None) => Ok(Answers::new()),
    }
}

/// Drives the question flow to completion.
///
/// For each active question the answer comes from `preloaded`, else from `prompter`
/// (re-asking after validation errors), else from the question's resolved default.
/// Optional questions left without a value are skipped.
///
/// # Errors
/// * `Error::ValidationError` for an invalid preloaded answer, or a required question
///   without a value when no prompter is available
pub fn collect_answers(
    flow: &mut QuestionFlow,
    prompter: Option<&dyn Prompter>,
    preloaded: &Answers,
) -> Result<Answers> {
    while let Some(question) = flow.get_next_question()? {
        let question = question.clone();
        let default = question.default.as_ref().map(|d| evaluate_default(d, flow.answers()));

        let (value, interactive) = match (preloaded.get(&question.name), prompter) {
            (Some(value), _) => (Some(value.clone()), false),
            (None, Some(prompter)) => (prompter.ask(&question, default.as_ref())?, true),
            (None, None) => (default, false),
        };

        let outcome = match value {
            Some(value) => flow.submit_answer(&question.name, value),
            None => flow.skip_optional(&question.name),
        };

        match (outcome, prompter) {
            (Ok(()), _) => {}
            (Err(err), Some(prompter)) if interactive && err.is_validation() => {
                prompter.report_invalid(&question, &err.to_string());
            }
            (Err(err), _) => return Err(err),
        }
    }

    if !flow.is_complete()? {
        return Err(Error::ConfigError("questionnaire ended incomplete".to_string()));
    }
    Ok(flow.answers().clone())
}
