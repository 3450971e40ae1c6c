//! Answer validation by question type and declared rules.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use url::Url;

use crate::error::{Error, Result};
use crate::manifest::{Question, QuestionType, ValidationRule};
use crate::value::Value;

/// A named validator callable from a question's `validation.custom` rule.
pub type CustomValidator = Box<dyn Fn(&Value) -> std::result::Result<(), String>>;

const ATEXT: &str = r"[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+";

static ADDRESS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let dot_atom = format!("{ATEXT}(?:\\.{ATEXT})*");
    Regex::new(&format!("^{dot_atom}@{dot_atom}$")).ok()
});

/// A display name: whitespace-separated atext words (dots allowed) or one quoted string.
static PHRASE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let word = r"[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+";
    Regex::new(&format!(r#"^(?:{word}(?:\s+{word})*|"(?:[^"\\]|\\.)*")$"#)).ok()
});

/// Registry of custom validators, looked up by name.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: IndexMap<String, CustomValidator>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator, replacing any previous one with the same name.
    pub fn register<S, F>(&mut self, name: S, validator: F)
    where
        S: Into<String>,
        F: Fn(&Value) -> std::result::Result<(), String> + 'static,
    {
        self.validators.insert(name.into(), Box::new(validator));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    fn run(&self, question: &str, name: &str, value: &Value) -> Result<Option<String>> {
        let validator = self.validators.get(name).ok_or_else(|| {
            Error::ConfigError(format!(
                "question '{question}' references unknown validator '{name}'"
            ))
        })?;
        Ok(validator(value).err())
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.validators.keys()).finish()
    }
}

fn invalid(question: &Question, message: impl Into<String>) -> Error {
    Error::ValidationError { question: question.name.clone(), message: message.into() }
}

/// Validates an answer against its question.
///
/// Empty answers (empty string or list) fail only when the question is required.
///
/// # Errors
/// * `Error::ValidationError` when the value is rejected
/// * `Error::ConfigError` for an invalid `pattern` or an unknown custom validator
pub fn validate_answer(
    question: &Question,
    value: &Value,
    registry: &ValidatorRegistry,
) -> Result<()> {
    if value.is_empty() {
        if question.required {
            return Err(invalid(question, "a value is required"));
        }
        return Ok(());
    }

    if let Err(message) = check_type(question, value) {
        return Err(invalid(question, message));
    }

    match &question.validation {
        Some(rule) => check_rule(question, rule, value, registry),
        None => Ok(()),
    }
}

fn check_type(question: &Question, value: &Value) -> std::result::Result<(), String> {
    let expected = |what: &str| format!("expected {what}, got {}", value.type_name());

    match question.question_type {
        QuestionType::Text | QuestionType::Password => {
            value.as_str().map(|_| ()).ok_or_else(|| expected("a string"))
        }
        QuestionType::Choice => {
            if value.as_list().is_some() {
                return Err(expected("a single choice"));
            }
            let answer = value.to_string();
            if question.choices.contains(&answer) {
                Ok(())
            } else {
                Err(format!("'{answer}' is not one of: {}", question.choices.join(", ")))
            }
        }
        QuestionType::MultiChoice => {
            let items = value.as_list().ok_or_else(|| expected("a list of choices"))?;
            for item in items {
                let answer = item.to_string();
                if !question.choices.contains(&answer) {
                    return Err(format!(
                        "'{answer}' is not one of: {}",
                        question.choices.join(", ")
                    ));
                }
            }
            Ok(())
        }
        QuestionType::Boolean => value.as_bool().map(|_| ()).ok_or_else(|| expected("a boolean")),
        QuestionType::Number => match value {
            Value::Number(_) => Ok(()),
            Value::String(s) if s.trim().parse::<f64>().is_ok_and(f64::is_finite) => Ok(()),
            _ => Err(expected("a number")),
        },
        QuestionType::Path => {
            let path = value.as_str().ok_or_else(|| expected("a path"))?;
            if path.contains('\0') {
                Err("path contains a NUL byte".to_string())
            } else {
                Ok(())
            }
        }
        QuestionType::Url => {
            let raw = value.as_str().ok_or_else(|| expected("a URL"))?;
            match Url::parse(raw) {
                Ok(url) if !url.scheme().is_empty() => Ok(()),
                Ok(_) => Err(format!("'{raw}' has no scheme")),
                Err(e) => Err(format!("'{raw}' is not a valid URL: {e}")),
            }
        }
        QuestionType::Email => {
            let raw = value.as_str().ok_or_else(|| expected("an email address"))?;
            if is_email(raw) {
                Ok(())
            } else {
                Err(format!("'{raw}' is not a valid email address"))
            }
        }
    }
}

/// Accepts `local@domain` and `Display Name <local@domain>`, where both parts of the
/// address are dot-atoms and the display name is a phrase or may be left out.
pub fn is_email(raw: &str) -> bool {
    let raw = raw.trim();
    let address = match raw.strip_suffix('>') {
        Some(inner) => {
            let Some((name, address)) = inner.split_once('<') else {
                return false;
            };
            let name = name.trim();
            let name_ok = name.is_empty() || full_match(&PHRASE, name);
            if !name_ok || address.contains(['<', '>']) {
                return false;
            }
            address
        }
        None if raw.contains(['<', '>']) => return false,
        None => raw,
    };
    full_match(&ADDRESS, address)
}

fn full_match(re: &Option<Regex>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

fn check_rule(
    question: &Question,
    rule: &ValidationRule,
    value: &Value,
    registry: &ValidatorRegistry,
) -> Result<()> {
    let fail = |message: String| invalid(question, rule.message.clone().unwrap_or(message));

    if let (Some(pattern), Value::String(s)) = (&rule.pattern, value) {
        let re = Regex::new(pattern).map_err(|e| {
            Error::ConfigError(format!(
                "question '{}' has an invalid pattern: {e}",
                question.name
            ))
        })?;
        if !re.is_match(s) {
            return Err(fail(format!("'{s}' does not match pattern '{pattern}'")));
        }
    }

    let numeric = matches!(value, Value::Number(_)) || question.question_type == QuestionType::Number;
    if let (true, Some(n)) = (numeric, value.as_f64()) {
        if let Some(min) = rule.min {
            if n < min {
                return Err(fail(format!("{n} is less than the minimum {min}")));
            }
        }
        if let Some(max) = rule.max {
            if n > max {
                return Err(fail(format!("{n} is greater than the maximum {max}")));
            }
        }
    }

    let length = match value {
        Value::String(s) => Some(s.chars().count()),
        Value::List(items) => Some(items.len()),
        _ => None,
    };
    if let Some(len) = length {
        if let Some(min_len) = rule.min_len {
            if len < min_len {
                return Err(fail(format!("length {len} is shorter than {min_len}")));
            }
        }
        if let Some(max_len) = rule.max_len {
            if len > max_len {
                return Err(fail(format!("length {len} is longer than {max_len}")));
            }
        }
    }

    if let Some(name) = &rule.custom {
        if let Some(message) = registry.run(&question.name, name, value)? {
            return Err(fail(message));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_email() {
        assert!(is_email("dev@example.com"));
        assert!(is_email("first.last+tag@sub.example.org"));
        assert!(is_email("Jane Doe <jane@example.com>"));
        assert!(is_email("root@localhost"));
        assert!(!is_email("no-at-sign"));
        assert!(!is_email("two@@example.com"));
        assert!(!is_email(".lead@example.com"));
        assert!(!is_email("a@b..c"));
        assert!(!is_email("Jane <jane@example.com"));
    }

    #[test]
    fn test_is_email_display_name() {
        assert!(is_email("<jane@example.com>"));
        assert!(is_email("J. R. Doe <jane@example.com>"));
        assert!(is_email("\"Doe, Jane\" <jane@example.com>"));
        assert!(!is_email("@@@ <a@b.c>"));
        assert!(!is_email("x<y <a@b.c>"));
        assert!(!is_email("<<a@b.c>"));
        assert!(!is_email("Jane <a@b.c>>"));
        assert!(!is_email("Jane> <a@b.c>"));
        assert!(!is_email("Doe, Jane <jane@example.com>"));
        assert!(!is_email("a@b.c>"));
    }
}
