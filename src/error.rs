//! Error handling for the Ritual engine.
//! Defines the crate-wide error type and the result alias used throughout the application.

use std::io;
use thiserror::Error;

/// Custom error types for Ritual operations.
///
/// Variants fall into four groups: configuration problems detected before any I/O,
/// validation failures the caller may retry, I/O and resolution failures that name the
/// offending path, and execution failures raised by migration steps.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    #[error("Failed to parse JSON: {0}.")]
    JSONParseError(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}.")]
    YAMLParseError(#[from] serde_yaml::Error),

    #[error("Failed to traverse source directory: {0}.")]
    WalkDirError(#[from] walkdir::Error),

    #[error("Invalid glob pattern: {0}.")]
    GlobError(#[from] globset::Error),

    #[error("Prompt failed: {0}.")]
    PromptError(#[from] dialoguer::Error),

    /// Represents errors that occur during configuration parsing or processing
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// A condition expression outside the supported grammar
    #[error("Invalid condition '{expression}': {reason}.")]
    ConditionError { expression: String, reason: String },

    #[error("Migration configuration error: {0}.")]
    MigrationConfigError(String),

    /// Represents validation failures in user input
    #[error("Invalid answer for '{question}': {message}.")]
    ValidationError { question: String, message: String },

    #[error("Unknown question: '{0}'.")]
    QuestionNotFound(String),

    #[error("Template '{template}' failed to render: {source}.")]
    RenderError {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Source not found: '{path}'.")]
    SourceNotFound { path: String },

    #[error("Invalid destination path: '{path}'.")]
    InvalidDestination { path: String },

    #[error("Recipe directory '{recipe_dir}' does not exist.")]
    RecipeDoesNotExistError { recipe_dir: String },

    #[error("Output directory '{output_dir}' already exists. Use --force to overwrite it.")]
    OutputDirectoryExistsError { output_dir: String },

    /// A migration step that ran and failed
    #[error("Migration {from} -> {to} failed: {message}.")]
    MigrationFailed { from: String, to: String, message: String },
}

impl Error {
    /// Returns true for errors the caller can recover from by supplying a different answer.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::ValidationError { .. })
    }
}

/// Convenience type alias for Results with Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The Error to handle
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
