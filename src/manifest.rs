//! Recipe manifest handling.
//! This module provides the data model of a recipe ("ritual") and loads it from
//! `ritual.json`, `ritual.yml` or `ritual.yaml` in the recipe directory.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::condition::{validate_expression, Condition};
use crate::constants::{delimiters, MANIFEST_FILES};
use crate::error::{Error, Result};
use crate::migration::validate_migration;
use crate::value::Value;

/// The parsed recipe. Read-only once loaded.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Manifest {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub questions: Vec<Question>,
    pub files: Files,
    pub migrations: Vec<Migration>,
    pub delimiters: Delimiters,
}

/// Kinds of answers a question accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[default]
    Text,
    Password,
    Choice,
    MultiChoice,
    Boolean,
    Number,
    Path,
    Url,
    Email,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Question {
    /// Unique key under which the answer is stored
    pub name: String,
    /// Text shown to the user
    #[serde(default, alias = "help")]
    pub prompt: String,
    #[serde(default, rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
    #[serde(default, alias = "when")]
    pub condition: Option<Condition>,
}

/// Extra constraints applied after the type check.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationRule {
    pub pattern: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(alias = "min_len")]
    pub min_len: Option<usize>,
    #[serde(alias = "max_len")]
    pub max_len: Option<usize>,
    /// Name of a validator registered on the question flow
    pub custom: Option<String>,
    /// Message replacing the generated one when the rule fails
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Files {
    pub templates: Vec<FileMapping>,
    #[serde(rename = "static")]
    pub static_files: Vec<FileMapping>,
    /// Destination globs never overwritten once they exist
    pub protected: Vec<String>,
    pub directories: Vec<DirectoryMapping>,
    /// Globs skipped while walking directory sources
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FileMapping {
    /// Path under the recipe's `templates/` or `static/` root, or `_shared:<path>`
    pub source: String,
    /// Destination relative to the output root; rendered before use
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default, alias = "when")]
    pub condition: Option<String>,
}

impl FileMapping {
    pub fn new<S: Into<String>>(source: S) -> Self {
        Self { source: source.into(), ..Self::default() }
    }

    pub fn to<S: Into<String>>(mut self, destination: S) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// A directory created in the output tree even when nothing is generated into it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DirectoryMapping {
    pub path: String,
    #[serde(default, alias = "when")]
    pub condition: Option<String>,
}

/// A declared transition between two versions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    #[serde(alias = "from", alias = "from_version")]
    pub from_version: String,
    #[serde(alias = "to", alias = "to_version")]
    pub to_version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub up: MigrationHandler,
    #[serde(default)]
    pub down: MigrationHandler,
    #[serde(default)]
    pub idempotent: bool,
}

/// One direction of a migration: SQL statements, an external script, or inline code.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationHandler {
    pub sql: Vec<String>,
    pub script: Option<PathBuf>,
    pub code: Option<String>,
}

impl MigrationHandler {
    pub fn sql<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { sql: statements.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    pub fn script<P: Into<PathBuf>>(path: P) -> Self {
        Self { script: Some(path.into()), ..Self::default() }
    }

    pub fn code<S: Into<String>>(code: S) -> Self {
        Self { code: Some(code.into()), ..Self::default() }
    }

    /// True when no SQL statement, script or inline code is declared.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty() && self.script.is_none() && self.code.is_none()
    }
}

/// Delimiters of the template syntax.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Delimiters {
    pub variable_start: String,
    pub variable_end: String,
    pub block_start: String,
    pub block_end: String,
    pub comment_start: String,
    pub comment_end: String,
}

impl Delimiters {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            &self.variable_start,
            &self.variable_end,
            &self.block_start,
            &self.block_end,
            &self.comment_start,
            &self.comment_end,
        ]
        .into_iter()
        .map(String::as_str)
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            variable_start: delimiters::VARIABLE_START.to_string(),
            variable_end: delimiters::VARIABLE_END.to_string(),
            block_start: delimiters::BLOCK_START.to_string(),
            block_end: delimiters::BLOCK_END.to_string(),
            comment_start: delimiters::COMMENT_START.to_string(),
            comment_end: delimiters::COMMENT_END.to_string(),
        }
    }
}

impl Manifest {
    /// Parses manifest content. JSON is tried first, then YAML.
    pub fn parse(content: &str) -> Result<Self> {
        match serde_json::from_str(content) {
            Ok(manifest) => Ok(manifest),
            Err(_) => Ok(serde_yaml::from_str(content)?),
        }
    }

    /// Checks structural invariants that do not depend on answers.
    ///
    /// # Errors
    /// * `Error::ConfigError` for duplicate or empty question names and choice questions
    ///   without choices
    /// * `Error::ConditionError` for conditions outside the expression grammar
    /// * `Error::MigrationConfigError` for migrations missing a required handler
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for question in &self.questions {
            if question.name.is_empty() {
                return Err(Error::ConfigError("question without a name".to_string()));
            }
            if !names.insert(question.name.as_str()) {
                return Err(Error::ConfigError(format!(
                    "duplicate question name '{}'",
                    question.name
                )));
            }
            if matches!(question.question_type, QuestionType::Choice | QuestionType::MultiChoice)
                && question.choices.is_empty()
            {
                return Err(Error::ConfigError(format!(
                    "question '{}' declares no choices",
                    question.name
                )));
            }
            if let Some(condition) = &question.condition {
                condition.validate()?;
            }
        }

        let mappings = self.files.templates.iter().chain(&self.files.static_files);
        for condition in mappings.filter_map(|m| m.condition.as_deref()) {
            validate_expression(condition)?;
        }
        for condition in self.files.directories.iter().filter_map(|d| d.condition.as_deref()) {
            validate_expression(condition)?;
        }

        self.migrations.iter().try_for_each(validate_migration)
    }
}

/// Loads the manifest of a recipe directory, trying every supported file name.
///
/// # Errors
/// * `Error::RecipeDoesNotExistError` if the directory is missing
/// * `Error::ConfigError` if no manifest file exists
pub fn load_manifest<P: AsRef<Path>>(recipe_dir: P) -> Result<Manifest> {
    let recipe_dir = recipe_dir.as_ref();
    if !recipe_dir.is_dir() {
        return Err(Error::RecipeDoesNotExistError {
            recipe_dir: recipe_dir.display().to_string(),
        });
    }

    for file in MANIFEST_FILES {
        let manifest_path = recipe_dir.join(file);
        if manifest_path.exists() {
            debug!("Loading manifest from {}", manifest_path.display());
            let content = std::fs::read_to_string(&manifest_path)?;
            return Manifest::parse(&content);
        }
    }

    Err(Error::ConfigError(format!(
        "No manifest file found (tried: {})",
        MANIFEST_FILES.join(", ")
    )))
}
