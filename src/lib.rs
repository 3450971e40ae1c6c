//! Ritual is a manifest-driven project generator.
//! A recipe declares questions, conditional file mappings and schema migrations; the
//! engine collects answers, renders templates into a new project tree and optionally
//! runs the migrations.

/// Answer files, stdin answers and the questionnaire driver
pub mod answers;

/// Stateless case-conversion helpers
pub mod case;

/// Command-line interface module for the Ritual application
pub mod cli;

/// Boolean conditions over answers
pub mod condition;

/// Common constants
pub mod constants;

/// Error types and handling for the Ritual application
pub mod error;

/// The question flow state machine
pub mod flow;

/// Output tree generation from file mappings
pub mod generator;

/// Logger setup for the binary
pub mod logger;

/// Recipe manifest data model and loading
/// Supports JSON and YAML formats (ritual.json, ritual.yml, ritual.yaml)
pub mod manifest;

/// Glob matching for protected and ignored paths
pub mod matcher;

/// Up/down version migrations
pub mod migration;

/// User input and interaction handling
pub mod prompt;

/// Template rendering
pub mod renderer;

/// Answer validation
pub mod validation;

/// Dynamically-typed answer values
pub mod value;

/// The variable store fed to every renderer
pub mod variables;
